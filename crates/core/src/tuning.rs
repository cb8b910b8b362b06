//! Instrument tuning: the open pitch of every string, plus fret count and
//! scale length.

use crate::error::{FretwiseError, Result};
use crate::note::Note;

/// The open-string pitches of a fretted instrument, ordered from the
/// highest-pitched string (index 0) to the lowest.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
	strings: Vec<Note>,
	nfrets: u8,
	scale_length_mm: f64,
}

impl Tuning {
	pub fn new(mut strings: Vec<Note>, nfrets: u8) -> Result<Self> {
		if strings.is_empty() {
			return Err(FretwiseError::InvalidTuning("a tuning needs at least one string".into()));
		}
		if nfrets == 0 {
			return Err(FretwiseError::InvalidTuning("a fretboard needs at least one fret".into()));
		}
		strings.sort_by(|a, b| b.midi().cmp(&a.midi()));
		Ok(Tuning { strings, nfrets, scale_length_mm: 650.0 })
	}

	pub fn with_scale_length(mut self, scale_length_mm: f64) -> Result<Self> {
		if !scale_length_mm.is_finite() || scale_length_mm <= 0.0 {
			return Err(FretwiseError::InvalidTuning("scale length must be a positive, finite number of millimeters".into()));
		}
		self.scale_length_mm = scale_length_mm;
		Ok(self)
	}

	/// Standard six-string guitar tuning: E4 B3 G3 D3 A2 E2, 20 frets.
	pub fn standard() -> Self {
		let strings = ["E4", "B3", "G3", "D3", "A2", "E2"]
			.iter()
			.map(|s| Note::parse(s).expect("standard tuning strings parse"))
			.collect();
		Tuning::new(strings, 20).expect("standard tuning is always valid")
	}

	/// Parse a comma-separated tuning string such as "E4,B3,G3,D3,A2,E2".
	pub fn parse_str(s: &str, nfrets: u8) -> Result<Self> {
		let mut strings = Vec::new();
		for part in s.split(',') {
			let note = Note::parse(part.trim())
				.ok_or_else(|| FretwiseError::InvalidTuning(format!("invalid string pitch: {part}")))?;
			strings.push(note);
		}
		Tuning::new(strings, nfrets)
	}

	pub fn strings(&self) -> &[Note] {
		&self.strings
	}

	pub fn nstrings(&self) -> usize {
		self.strings.len()
	}

	pub fn nfrets(&self) -> u8 {
		self.nfrets
	}

	pub fn scale_length_mm(&self) -> f64 {
		self.scale_length_mm
	}

	/// Lowest and highest pitch reachable anywhere on the fretboard.
	pub fn pitch_bounds(&self) -> (u8, u8) {
		let open_low = self.strings.iter().map(Note::midi).min().unwrap();
		let open_high = self.strings.iter().map(Note::midi).max().unwrap();
		(open_low, (open_high as u16 + self.nfrets as u16).min(127) as u8)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn standard_tuning_has_six_strings() {
		let tuning = Tuning::standard();
		assert_eq!(tuning.nstrings(), 6);
		assert_eq!(tuning.strings()[0].midi(), Note::parse("E4").unwrap().midi());
		assert_eq!(tuning.strings()[5].midi(), Note::parse("E2").unwrap().midi());
	}

	#[test]
	fn zero_strings_is_invalid() {
		assert!(Tuning::new(vec![], 20).is_err());
	}

	#[test]
	fn zero_frets_is_invalid() {
		assert!(Tuning::new(vec![Note::parse("E2").unwrap()], 0).is_err());
	}

	#[test]
	fn parse_str_round_trips_standard_tuning() {
		let tuning = Tuning::parse_str("E4,B3,G3,D3,A2,E2", 20).unwrap();
		assert_eq!(tuning, Tuning::standard());
	}

	#[test]
	fn pitch_bounds_spans_from_lowest_open_to_highest_fretted() {
		let tuning = Tuning::standard();
		let (low, high) = tuning.pitch_bounds();
		assert_eq!(low, Note::parse("E2").unwrap().midi());
		assert_eq!(high, Note::parse("E4").unwrap().midi() + 20);
	}
}
