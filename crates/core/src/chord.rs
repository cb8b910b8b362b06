//! A chord is simply the set of pitches sounding at a single onset — one
//! note is a chord of size one.

use crate::note::Note;

/// A sorted, duplicate-free set of MIDI pitches sounding together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
	pitches: Vec<u8>,
}

impl Chord {
	pub fn new(mut pitches: Vec<u8>) -> Self {
		pitches.sort_unstable();
		pitches.dedup();
		Chord { pitches }
	}

	pub fn from_notes(notes: &[Note]) -> Self {
		Chord::new(notes.iter().map(Note::midi).collect())
	}

	pub fn pitches(&self) -> &[u8] {
		&self.pitches
	}

	pub fn len(&self) -> usize {
		self.pitches.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pitches.is_empty()
	}
}
