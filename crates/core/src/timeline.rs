//! Turning raw note/time-signature events into a sequence of measures.

use crate::chord::Chord;
use crate::input::{ArrangerInput, TimeSignatureChange};
use std::collections::BTreeMap;

/// Everything that happens at a single tick: a chord onset, a time
/// signature change, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	pub tick: u32,
	pub notes: Option<Chord>,
	pub time_signature: Option<TimeSignatureChange>,
}

/// A contiguous span of the piece under one time signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
	pub start: u32,
	pub end: u32,
	pub time_signature: TimeSignatureChange,
	pub events: Vec<Event>,
}

impl Measure {
	pub fn duration_ticks(&self) -> u32 {
		self.end - self.start
	}
}

/// Number of ticks in one measure under `time_signature`, for a file with
/// `ticks_per_quarter` ticks per quarter note.
pub fn measure_length_ticks(time_signature: &TimeSignatureChange, ticks_per_quarter: u32) -> u32 {
	let n_quarter_notes = time_signature.numerator as f64 * (4.0 / time_signature.denominator as f64);
	(n_quarter_notes * ticks_per_quarter as f64).round() as u32
}

/// Build the tick-keyed event map: note onsets from every non-drum track,
/// merged with time-signature changes.
pub fn build_event_map(input: &ArrangerInput) -> BTreeMap<u32, Event> {
	let mut by_tick: BTreeMap<u32, (Vec<u8>, Option<TimeSignatureChange>)> = BTreeMap::new();

	for track in input.instruments.iter().filter(|t| !t.is_drum) {
		for note in &track.notes {
			by_tick.entry(note.onset_tick).or_default().0.push(note.pitch);
		}
	}

	for &ts in &input.time_signatures {
		by_tick.entry(ts.tick).or_default().1 = Some(ts);
	}

	by_tick
		.into_iter()
		.map(|(tick, (pitches, time_signature))| {
			let notes = if pitches.is_empty() { None } else { Some(Chord::new(pitches)) };
			(tick, Event { tick, notes, time_signature })
		})
		.collect()
}

/// Walk the time-signature regions of the piece and slice them into
/// measures; the final measure of each region is truncated to the region's
/// end rather than overrunning into the next signature.
pub fn build_measures(input: &ArrangerInput, events: &BTreeMap<u32, Event>, end_tick: u32) -> Vec<Measure> {
	let mut measures = Vec::new();

	for (i, &time_signature) in input.time_signatures.iter().enumerate() {
		let region_start = time_signature.tick;
		let region_end = input.time_signatures.get(i + 1).map(|next| next.tick).unwrap_or(end_tick);
		if region_end <= region_start {
			continue;
		}

		let measure_length = measure_length_ticks(&time_signature, input.ticks_per_quarter).max(1);

		let mut measure_start = region_start;
		while measure_start < region_end {
			let measure_end = (measure_start + measure_length).min(region_end);
			let measure_events: Vec<Event> = events
				.range(measure_start..measure_end)
				.map(|(_, event)| event.clone())
				.collect();
			measures.push(Measure { start: measure_start, end: measure_end, time_signature, events: measure_events });
			measure_start += measure_length;
		}
	}

	measures
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::input::{InstrumentTrack, RawNote};

	fn input_with(notes: Vec<RawNote>, ticks_per_quarter: u32) -> ArrangerInput {
		ArrangerInput {
			ticks_per_quarter,
			time_signatures: vec![TimeSignatureChange { tick: 0, numerator: 4, denominator: 4 }],
			instruments: vec![InstrumentTrack { is_drum: false, notes }],
		}
		.with_defaults()
	}

	#[test]
	fn measure_length_four_four_is_four_quarters() {
		let ts = TimeSignatureChange { tick: 0, numerator: 4, denominator: 4 };
		assert_eq!(measure_length_ticks(&ts, 480), 1920);
	}

	#[test]
	fn measure_length_three_four_is_three_quarters() {
		let ts = TimeSignatureChange { tick: 0, numerator: 3, denominator: 4 };
		assert_eq!(measure_length_ticks(&ts, 480), 1440);
	}

	#[test]
	fn measure_length_six_eight_is_three_quarters() {
		let ts = TimeSignatureChange { tick: 0, numerator: 6, denominator: 8 };
		assert_eq!(measure_length_ticks(&ts, 480), 1440);
	}

	#[test]
	fn drum_tracks_are_excluded_from_the_event_map() {
		let mut input = input_with(vec![], 480);
		input.instruments.push(InstrumentTrack {
			is_drum: true,
			notes: vec![RawNote { pitch: 40, onset_tick: 0, offset_tick: 100, velocity: 100 }],
		});
		let events = build_event_map(&input);
		assert!(events.get(&0).and_then(|e| e.notes.as_ref()).is_none());
	}

	#[test]
	fn simultaneous_notes_merge_into_one_chord_event() {
		let input = input_with(
			vec![
				RawNote { pitch: 40, onset_tick: 0, offset_tick: 100, velocity: 100 },
				RawNote { pitch: 47, onset_tick: 0, offset_tick: 100, velocity: 100 },
			],
			480,
		);
		let events = build_event_map(&input);
		let chord = events.get(&0).unwrap().notes.as_ref().unwrap();
		assert_eq!(chord.pitches(), &[40, 47]);
	}

	#[test]
	fn last_measure_in_a_region_is_truncated_to_region_end() {
		let input = input_with(vec![], 480);
		let events = build_event_map(&input);
		let measures = build_measures(&input, &events, 3000);
		let last = measures.last().unwrap();
		assert_eq!(last.end, 3000);
		assert!(last.duration_ticks() <= 1920);
	}

	#[test]
	fn measures_are_contiguous() {
		let input = input_with(vec![], 480);
		let events = build_event_map(&input);
		let measures = build_measures(&input, &events, 5000);
		for pair in measures.windows(2) {
			assert_eq!(pair[0].end, pair[1].start);
		}
	}
}
