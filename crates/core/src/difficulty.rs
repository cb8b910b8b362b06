//! The comfort metric: how hard a fingering is to play in isolation, and how
//! hard it is to play right after some other fingering.

use crate::fretboard::{Fingering, Fretboard};
use std::collections::HashSet;

const SPAN_NORMALIZATION: f64 = 5.0;

/// Weights for the four components of [`transition_difficulty`], all
/// defaulting to `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
	pub b: f64,
	pub height: f64,
	pub length: f64,
	pub n_changed_strings: f64,
}

impl Default for Weights {
	fn default() -> Self {
		Weights { b: 1.0, height: 1.0, length: 1.0, n_changed_strings: 1.0 }
	}
}

/// Precomputed per-fingering invariants, so scoring a transition matrix row
/// costs O(1) per candidate instead of recomputing them from scratch.
#[derive(Debug, Clone)]
pub struct FingeringStats {
	pub raw_height: f64,
	pub height_score: f64,
	pub span_score: f64,
	pub all_strings: HashSet<u8>,
	pub non_open_strings: HashSet<u8>,
	pub n_notes: usize,
}

/// Precompute the stats needed to score any transition into or out of
/// `fingering`, without needing the fingering itself again.
pub fn fingering_stats(fretboard: &Fretboard, fingering: &Fingering) -> FingeringStats {
	let rh = raw_height(fretboard, fingering, None);
	FingeringStats {
		raw_height: rh,
		height_score: height_score(fretboard, rh),
		span_score: span_score(fingering),
		all_strings: fingering.strings_used(),
		non_open_strings: fingering.fretted_strings(),
		n_notes: fingering.len(),
	}
}

/// Same formula as [`transition_difficulty`], but from precomputed stats so
/// filling an `n x n` transition matrix costs O(n) work per row instead of
/// re-deriving every fingering's shape on each of the n^2 pair lookups.
pub fn transition_difficulty_from_stats(
	current: &FingeringStats,
	previous: &FingeringStats,
	nstrings: usize,
	nfrets: u8,
	weights: &Weights,
) -> f64 {
	let rh = if !current.non_open_strings.is_empty() { current.raw_height } else { previous.raw_height };

	let height = rh / nfrets as f64;
	let dheight = (rh - previous.raw_height).abs() / nfrets as f64;
	let span = current.span_score;

	let kept = current.all_strings.intersection(&previous.non_open_strings).count();
	let n_changed = (current.n_notes - kept) as f64 / nstrings as f64;

	let easiness = laplace(dheight, weights.b)
		* (1.0 / (1.0 + height * weights.height))
		* (1.0 / (1.0 + span * weights.length))
		* (1.0 / (1.0 + n_changed * weights.n_changed_strings));

	1.0 / easiness
}

pub fn raw_height(fretboard: &Fretboard, fingering: &Fingering, previous: Option<&Fingering>) -> f64 {
	let fretted: Vec<u8> = fingering.positions().iter().filter(|p| !p.is_open()).map(|p| p.fret).collect();
	if !fretted.is_empty() {
		let min = *fretted.iter().min().unwrap() as f64;
		let max = *fretted.iter().max().unwrap() as f64;
		return (min + max) / 2.0;
	}
	match previous {
		Some(prev) => raw_height(fretboard, prev, None),
		None => 0.0,
	}
}

pub fn height_score(fretboard: &Fretboard, raw_height: f64) -> f64 {
	raw_height / fretboard.tuning().nfrets() as f64
}

pub fn dheight_score(fretboard: &Fretboard, raw_height: f64, previous_raw_height: f64) -> f64 {
	(raw_height - previous_raw_height).abs() / fretboard.tuning().nfrets() as f64
}

pub fn span_score(fingering: &Fingering) -> f64 {
	let fretted: Vec<u8> = fingering.positions().iter().filter(|p| !p.is_open()).map(|p| p.fret).collect();
	match (fretted.iter().min(), fretted.iter().max()) {
		(Some(&min), Some(&max)) => (max - min) as f64 / SPAN_NORMALIZATION,
		_ => 0.0,
	}
}

/// Fraction of the current fingering's notes that land on a string the
/// previous fingering was not already fretting. Open strings in the
/// *previous* shape don't count as "already used" — only fretted strings do.
pub fn changed_strings_score(fretboard: &Fretboard, fingering: &Fingering, previous: &Fingering) -> f64 {
	let used_strings = fingering.strings_used();
	let previous_fretted_strings = previous.fretted_strings();
	let kept = used_strings.intersection(&previous_fretted_strings).count();
	let n_changed = fingering.len() - kept;
	n_changed as f64 / fretboard.nstrings() as f64
}

pub fn laplace(x: f64, b: f64) -> f64 {
	(1.0 / (2.0 * b)) * (-x.abs() / b).exp()
}

/// Difficulty of playing `fingering` immediately after `previous`; the
/// reciprocal of the comfort ("easiness") of the transition.
pub fn transition_difficulty(
	fretboard: &Fretboard,
	fingering: &Fingering,
	previous: &Fingering,
	weights: &Weights,
) -> f64 {
	let rh = raw_height(fretboard, fingering, Some(previous));
	let previous_rh = raw_height(fretboard, previous, None);

	let height = height_score(fretboard, rh);
	let dheight = dheight_score(fretboard, rh, previous_rh);
	let span = span_score(fingering);
	let n_changed = changed_strings_score(fretboard, fingering, previous);

	let easiness = laplace(dheight, weights.b)
		* (1.0 / (1.0 + height * weights.height))
		* (1.0 / (1.0 + span * weights.length))
		* (1.0 / (1.0 + n_changed * weights.n_changed_strings));

	1.0 / easiness
}

/// Difficulty of a fingering with no predecessor, used only to seed the
/// HMM's initial state distribution from the first chord of a piece.
pub fn isolated_difficulty(fretboard: &Fretboard, fingering: &Fingering) -> f64 {
	let rh = raw_height(fretboard, fingering, None);
	let height = height_score(fretboard, rh);
	let span = span_score(fingering);
	let easiness = (1.0 / (1.0 + height)) * (1.0 / (1.0 + span));
	1.0 / easiness
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chord::Chord;
	use crate::note::Note;
	use crate::tuning::Tuning;

	fn standard() -> Fretboard {
		Fretboard::new(Tuning::standard()).unwrap()
	}

	#[test]
	fn all_open_fingering_has_zero_raw_height_with_no_predecessor() {
		let board = standard();
		let chord = Chord::new(vec![Note::parse("E2").unwrap().midi()]);
		let fingering = &board.fingerings_for_chord(&chord)[0];
		assert_eq!(raw_height(&board, fingering, None), 0.0);
	}

	#[test]
	fn open_fingering_falls_back_to_previous_raw_height() {
		let board = standard();
		let open_chord = Chord::new(vec![Note::parse("E2").unwrap().midi()]);
		let fretted_chord = Chord::new(vec![Note::parse("A2").unwrap().midi() + 5]);
		let open = &board.fingerings_for_chord(&open_chord)[0];
		let fretted_candidates = board.fingerings_for_chord(&fretted_chord);
		let fretted = fretted_candidates.iter().find(|f| !f.positions()[0].is_open()).unwrap();

		let prev_rh = raw_height(&board, fretted, None);
		assert!(prev_rh > 0.0);
		assert_eq!(raw_height(&board, open, Some(fretted)), prev_rh);
	}

	#[test]
	fn laplace_peaks_at_zero() {
		assert!(laplace(0.0, 1.0) > laplace(0.5, 1.0));
		assert!(laplace(0.5, 1.0) > laplace(1.0, 1.0));
	}

	#[test]
	fn transition_difficulty_is_positive_and_finite() {
		let board = standard();
		let chord_a = Chord::new(vec![Note::parse("E2").unwrap().midi()]);
		let chord_b = Chord::new(vec![Note::parse("A2").unwrap().midi() + 2]);
		let a = &board.fingerings_for_chord(&chord_a)[0];
		let b = &board.fingerings_for_chord(&chord_b)[0];
		let weights = Weights::default();
		let d = transition_difficulty(&board, b, a, &weights);
		assert!(d.is_finite());
		assert!(d > 0.0);
	}

	#[test]
	fn changed_strings_score_ignores_previously_open_strings() {
		let board = standard();
		// previous all-open E chord (low E + high E strings), current plays the
		// low E string fretted: since the previous low-E was open, it doesn't
		// count as "kept", so this should read as a changed string.
		let previous = board.fingerings_for_chord(&Chord::new(vec![Note::parse("E2").unwrap().midi()]))[0].clone();
		let current_candidates = board.fingerings_for_chord(&Chord::new(vec![Note::parse("E2").unwrap().midi() + 3]));
		let current = current_candidates.iter().find(|f| f.positions()[0].string == 5).unwrap();
		let score = changed_strings_score(&board, current, &previous);
		assert_eq!(score, 1.0 / board.nstrings() as f64);
	}

	#[test]
	fn stats_based_difficulty_matches_direct_computation() {
		let board = standard();
		let chord_a = Chord::new(vec![Note::parse("E2").unwrap().midi()]);
		let chord_b = Chord::new(vec![Note::parse("A2").unwrap().midi() + 2]);
		let a = &board.fingerings_for_chord(&chord_a)[0];
		let b = &board.fingerings_for_chord(&chord_b)[0];
		let weights = Weights::default();

		let direct = transition_difficulty(&board, b, a, &weights);

		let stats_a = fingering_stats(&board, a);
		let stats_b = fingering_stats(&board, b);
		let from_stats =
			transition_difficulty_from_stats(&stats_b, &stats_a, board.nstrings(), board.tuning().nfrets(), &weights);

		assert!((direct - from_stats).abs() < 1e-9);
	}
}
