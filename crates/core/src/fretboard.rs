//! The fretboard: the geometry of every (string, fret) position an
//! instrument offers, and the combinatorics of mapping a chord onto them.

use crate::chord::Chord;
use crate::error::Result;
use crate::tuning::Tuning;
use itertools::Itertools;
use std::collections::HashSet;

/// The maximum fretboard distance two simultaneously-played notes may sit
/// apart for the hand to reach both.
const MAX_EDGE_DISTANCE: f64 = 6.0;
/// The widest fret span (excluding open strings) a single fingering may use.
const MAX_FRET_SPAN: u8 = 5;
/// Millimeters per fret computed from the remaining scale length at each step.
const FRET_CONSTANT: f64 = 17.817;

/// A specific spot on the fretboard. Two positions that happen to sound the
/// same pitch (e.g. the open B string and fret 5 of the G string) are
/// distinct identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
	pub string: u8,
	pub fret: u8,
}

impl Position {
	pub fn is_open(&self) -> bool {
		self.fret == 0
	}
}

/// A candidate placement of every pitch of a chord: one [`Position`] per
/// pitch, in no particular order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingering {
	positions: Vec<Position>,
}

impl Fingering {
	fn from_positions(positions: Vec<Position>) -> Self {
		Fingering { positions }
	}

	pub fn positions(&self) -> &[Position] {
		&self.positions
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}

	pub fn strings_used(&self) -> HashSet<u8> {
		self.positions.iter().map(|p| p.string).collect()
	}

	pub fn fretted_strings(&self) -> HashSet<u8> {
		self.positions.iter().filter(|p| !p.is_open()).map(|p| p.string).collect()
	}

	fn as_set(&self) -> HashSet<Position> {
		self.positions.iter().copied().collect()
	}

	fn same_shape_as(&self, other: &Fingering) -> bool {
		self.as_set() == other.as_set()
	}
}

/// The fretboard for a given [`Tuning`]: every reachable position, and the
/// operations needed to enumerate and score fingerings on it.
pub struct Fretboard {
	tuning: Tuning,
}

impl Fretboard {
	pub fn new(tuning: Tuning) -> Result<Self> {
		Ok(Fretboard { tuning })
	}

	pub fn tuning(&self) -> &Tuning {
		&self.tuning
	}

	pub fn nstrings(&self) -> usize {
		self.tuning.nstrings()
	}

	pub fn pitch_at(&self, pos: Position) -> u8 {
		(self.tuning.strings()[pos.string as usize].midi() as u16 + pos.fret as u16).min(127) as u8
	}

	/// Every position on the fretboard that sounds the given pitch.
	pub fn positions_for_pitch(&self, pitch: u8) -> Vec<Position> {
		let mut positions = Vec::new();
		for (string, open) in self.tuning.strings().iter().enumerate() {
			if pitch < open.midi() {
				continue;
			}
			let fret = pitch - open.midi();
			if fret <= self.tuning.nfrets() {
				positions.push(Position { string: string as u8, fret });
			}
		}
		positions
	}

	/// Normalized distance between two positions. String spacing is
	/// `1/nstrings`; a position that is an open string is always distance
	/// zero from everything, since an open string costs no hand placement.
	pub fn distance(&self, a: Position, b: Position) -> f64 {
		if a.is_open() || b.is_open() {
			return 0.0;
		}
		let string_term = (a.string as f64 - b.string as f64) / self.nstrings() as f64;
		let fret_term = a.fret as f64 - b.fret as f64;
		(string_term * string_term + fret_term * fret_term).sqrt()
	}

	/// Physical distance in millimeters from the nut to the given fret,
	/// computed by successively shrinking the remaining scale length.
	pub fn fret_distance_mm(&self, fret: u8) -> f64 {
		let mut remaining = self.tuning.scale_length_mm();
		let mut total = 0.0;
		for _ in 0..fret {
			let height = remaining / FRET_CONSTANT;
			total += height;
			remaining -= height;
		}
		total
	}

	fn is_edge_possible(&self, a: Position, b: Position) -> bool {
		a.string != b.string && self.distance(a, b) < MAX_EDGE_DISTANCE
	}

	fn is_fingering_possible(&self, positions: &[Position], n_notes: usize) -> bool {
		let strings: Vec<u8> = positions.iter().map(|p| p.string).collect();
		let unique_strings: HashSet<u8> = strings.iter().copied().collect();
		let one_per_string = strings.len() == unique_strings.len();

		let fretted: Vec<u8> = positions.iter().filter(|p| !p.is_open()).map(|p| p.fret).collect();
		let span_ok = match (fretted.iter().min(), fretted.iter().max()) {
			(Some(&min), Some(&max)) => max - min < MAX_FRET_SPAN,
			_ => true,
		};

		let right_length = positions.len() <= n_notes;

		one_per_string && span_ok && right_length
	}

	/// Enumerate every playable fingering for a chord: for each permutation
	/// of the chord's pitches, walk the layered candidate lists and keep
	/// every chain whose consecutive positions form valid edges, then
	/// deduplicate by position set.
	pub fn fingerings_for_chord(&self, chord: &Chord) -> Vec<Fingering> {
		let candidate_lists: Vec<Vec<Position>> = chord
			.pitches()
			.iter()
			.map(|&pitch| self.positions_for_pitch(pitch))
			.filter(|candidates| !candidates.is_empty())
			.collect();

		if candidate_lists.is_empty() {
			return Vec::new();
		}

		if candidate_lists.len() == 1 {
			return candidate_lists[0]
				.iter()
				.map(|&p| Fingering::from_positions(vec![p]))
				.collect();
		}

		let n_notes = candidate_lists.len();
		let mut found: Vec<Fingering> = Vec::new();

		for permutation in (0..candidate_lists.len()).permutations(candidate_lists.len()) {
			let layers: Vec<&Vec<Position>> = permutation.iter().map(|&i| &candidate_lists[i]).collect();
			let mut chain = Vec::with_capacity(layers.len());
			self.extend_chains(&layers, 0, &mut chain, n_notes, &mut found);
		}

		found
	}

	fn extend_chains(
		&self,
		layers: &[&Vec<Position>],
		depth: usize,
		chain: &mut Vec<Position>,
		n_notes: usize,
		found: &mut Vec<Fingering>,
	) {
		if depth == layers.len() {
			if self.is_fingering_possible(chain, n_notes) {
				let candidate = Fingering::from_positions(chain.clone());
				if !found.iter().any(|f| f.same_shape_as(&candidate)) {
					found.push(candidate);
				}
			}
			return;
		}

		for &position in layers[depth] {
			if let Some(&previous) = chain.last() {
				if !self.is_edge_possible(previous, position) {
					continue;
				}
			}
			chain.push(position);
			self.extend_chains(layers, depth + 1, chain, n_notes, found);
			chain.pop();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::note::Note;

	fn standard() -> Fretboard {
		Fretboard::new(Tuning::standard()).unwrap()
	}

	#[test]
	fn open_string_has_distance_zero_to_anything() {
		let board = standard();
		let open = Position { string: 0, fret: 0 };
		let fretted = Position { string: 3, fret: 12 };
		assert_eq!(board.distance(open, fretted), 0.0);
	}

	#[test]
	fn distance_is_symmetric() {
		let board = standard();
		let a = Position { string: 1, fret: 3 };
		let b = Position { string: 4, fret: 5 };
		assert_eq!(board.distance(a, b), board.distance(b, a));
	}

	#[test]
	fn fret_distance_is_monotonically_increasing() {
		let board = standard();
		let mut previous = 0.0;
		for fret in 1..=20u8 {
			let d = board.fret_distance_mm(fret);
			assert!(d > previous);
			previous = d;
		}
	}

	#[test]
	fn positions_for_pitch_covers_every_string_within_range() {
		let board = standard();
		let open_e2 = Note::parse("E2").unwrap().midi();
		let positions = board.positions_for_pitch(open_e2);
		assert!(positions.contains(&Position { string: 5, fret: 0 }));
	}

	#[test]
	fn positions_for_pitch_is_empty_below_lowest_open_string() {
		let board = standard();
		let positions = board.positions_for_pitch(0);
		assert!(positions.is_empty());
	}

	#[test]
	fn single_note_fingerings_are_one_position_each() {
		let board = standard();
		let chord = Chord::new(vec![Note::parse("E2").unwrap().midi()]);
		let fingerings = board.fingerings_for_chord(&chord);
		assert!(!fingerings.is_empty());
		assert!(fingerings.iter().all(|f| f.len() == 1));
	}

	#[test]
	fn chord_fingerings_never_double_up_a_string() {
		let board = standard();
		let chord = Chord::new(vec![
			Note::parse("E2").unwrap().midi(),
			Note::parse("B3").unwrap().midi(),
			Note::parse("E4").unwrap().midi(),
		]);
		let fingerings = board.fingerings_for_chord(&chord);
		assert!(!fingerings.is_empty());
		for fingering in &fingerings {
			let strings = fingering.strings_used();
			assert_eq!(strings.len(), fingering.len());
		}
	}

	#[test]
	fn fingerings_respect_the_five_fret_span_cap() {
		let board = standard();
		let chord = Chord::new(vec![
			Note::parse("E2").unwrap().midi(),
			Note::parse("A2").unwrap().midi(),
		]);
		let fingerings = board.fingerings_for_chord(&chord);
		for fingering in &fingerings {
			let fretted: Vec<u8> = fingering.positions().iter().filter(|p| !p.is_open()).map(|p| p.fret).collect();
			if let (Some(&min), Some(&max)) = (fretted.iter().min(), fretted.iter().max()) {
				assert!(max - min < MAX_FRET_SPAN);
			}
		}
	}

	#[test]
	fn fingerings_are_deduplicated_by_position_set() {
		let board = standard();
		let chord = Chord::new(vec![Note::parse("E2").unwrap().midi(), Note::parse("E4").unwrap().midi()]);
		let fingerings = board.fingerings_for_chord(&chord);
		let mut seen = HashSet::new();
		for fingering in &fingerings {
			let set: Vec<Position> = {
				let mut v: Vec<Position> = fingering.positions().to_vec();
				v.sort_by_key(|p| (p.string, p.fret));
				v
			};
			assert!(seen.insert(set), "duplicate fingering shape found");
		}
	}
}
