//! The tablature document: the JSON-serializable result of arranging a
//! piece, plus an ASCII renderer for terminal/text-file output.

use crate::note::Note;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteOut {
	pub degree: String,
	pub octave: i8,
	pub string: u8,
	pub fret: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventOut {
	pub time: f64,
	pub time_ticks: u32,
	pub measure_timing: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub time_signature_change: Option<(u8, u8)>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<Vec<NoteOut>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasureOut {
	pub events: Vec<EventOut>,
}

/// The complete arranged tab: the tuning it was arranged for, and every
/// measure of the piece with its note events and fingerings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
	pub tuning: Vec<u8>,
	pub measures: Vec<MeasureOut>,
}

impl Tab {
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}

/// Render a [`Tab`] as one ASCII line per string, dash-filled between note
/// events at a rate proportional to how much of the measure separates them.
pub mod ascii {
	use super::*;

	pub fn render(tab: &Tab) -> Vec<String> {
		let mut lines: Vec<String> = tab
			.tuning
			.iter()
			.map(|&pitch| {
				let degree = Note::from_pitch(pitch).pitch.sharp_name().to_string();
				if degree.len() > 1 { format!("{degree}||") } else { format!("{degree} ||") }
			})
			.collect();

		for measure in &tab.measures {
			for (ievent, event) in measure.events.iter().enumerate() {
				let Some(notes) = &event.notes else { continue };

				for note in notes {
					lines[note.string as usize] += &note.fret.to_string();
				}

				let next_timing =
					measure.events.get(ievent + 1).map(|e| e.measure_timing).unwrap_or(1.0);
				let dashes_to_add = ((next_timing - event.measure_timing) * 16.0).floor().max(1.0) as usize;

				fill_to_equal_length(&mut lines);
				for line in &mut lines {
					line.push_str(&"-".repeat(dashes_to_add));
				}
			}

			for line in &mut lines {
				line.push('|');
			}
		}

		lines
	}

	fn fill_to_equal_length(lines: &mut [String]) {
		let max_len = lines.iter().map(String::len).max().unwrap_or(0);
		for line in lines.iter_mut() {
			while line.len() < max_len {
				line.push('-');
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_tab() -> Tab {
		Tab {
			tuning: vec![64, 59, 55, 50, 45, 40],
			measures: vec![MeasureOut {
				events: vec![
					EventOut {
						time: 0.0,
						time_ticks: 0,
						measure_timing: 0.0,
						time_signature_change: Some((4, 4)),
						notes: Some(vec![NoteOut { degree: "E".into(), octave: 2, string: 5, fret: 0 }]),
					},
					EventOut {
						time: 0.5,
						time_ticks: 480,
						measure_timing: 0.5,
						time_signature_change: None,
						notes: Some(vec![NoteOut { degree: "A".into(), octave: 2, string: 4, fret: 0 }]),
					},
				],
			}],
		}
	}

	#[test]
	fn json_round_trips_through_serde() {
		let tab = sample_tab();
		let json = tab.to_json().unwrap();
		let parsed: Tab = serde_json::from_str(&json).unwrap();
		assert_eq!(tab, parsed);
	}

	#[test]
	fn ascii_header_pads_single_letter_degrees() {
		let tab = sample_tab();
		let lines = ascii::render(&tab);
		assert!(lines[5].starts_with("E ||"));
	}

	#[test]
	fn ascii_lines_stay_equal_length_after_each_event() {
		let tab = sample_tab();
		let lines = ascii::render(&tab);
		let lengths: Vec<usize> = lines.iter().map(String::len).collect();
		assert!(lengths.windows(2).all(|w| w[0] == w[1]));
	}

	#[test]
	fn every_measure_ends_with_a_bar_line() {
		let tab = sample_tab();
		let lines = ascii::render(&tab);
		for line in &lines {
			assert!(line.ends_with('|'));
		}
	}
}
