//! Repairing chords that fall outside the instrument's playable pitch range
//! by shifting offending notes by whole octaves.

use crate::note::Note;
use crate::tuning::Tuning;

/// How out-of-range notes get folded back into the playable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairMode {
	/// Each out-of-range note is shifted independently by whole octaves.
	Default,
	/// The highest note is shifted first; every other note is then capped
	/// at that shifted pitch rather than at the instrument's true ceiling,
	/// keeping the melody line from being pushed above the part it leads.
	PreserveHighest,
}

/// Shift every note in `notes` by whole octaves until it falls inside
/// `[min_pitch, max_pitch]`, dropping notes that still don't fit and
/// deduplicating by resulting pitch.
pub fn repair_chord(notes: &[Note], tuning: &Tuning, mode: RepairMode) -> Vec<Note> {
	let (min_pitch, mut max_pitch) = tuning.pitch_bounds();

	if mode == RepairMode::PreserveHighest {
		if let Some(highest) = notes.iter().map(Note::midi).max() {
			max_pitch = if highest > max_pitch {
				let semitones_above = (highest - max_pitch) as i32;
				highest as i32 - (semitones_above as f64 / 12.0).ceil() as i32 * 12
			} else {
				let semitones_below = (min_pitch as i32 - highest as i32).max(0);
				highest as i32 + (semitones_below as f64 / 12.0).ceil() as i32 * 12
			} as u8;
		}
	}

	let mut result = Vec::new();
	let mut seen_pitches = Vec::new();

	for note in notes {
		let mut octaves_to_adjust = 0i32;
		let pitch = note.midi();

		if pitch as i32 > max_pitch as i32 {
			let semitones_above = (pitch as i32 - max_pitch as i32).max(0);
			octaves_to_adjust = -((semitones_above as f64 / 12.0).ceil() as i32);
		}
		if (pitch as i32) < min_pitch as i32 {
			let semitones_below = (min_pitch as i32 - pitch as i32).max(0);
			octaves_to_adjust = (semitones_below as f64 / 12.0).ceil() as i32;
		}

		let shifted = note.shifted_by_octaves(octaves_to_adjust);
		let shifted_pitch = shifted.midi();

		if shifted_pitch >= min_pitch && shifted_pitch <= max_pitch && !seen_pitches.contains(&shifted_pitch) {
			seen_pitches.push(shifted_pitch);
			result.push(shifted);
		}
	}

	result
}
