//! The arranger proper: treats chord-to-fingering decoding as a hidden
//! Markov model (hidden states are fingerings, observations are chords) and
//! decodes the most likely fingering sequence with the Viterbi algorithm.

use crate::chord::Chord;
use crate::difficulty::{self, FingeringStats, Weights};
use crate::error::{FretwiseError, Result};
use crate::fretboard::{Fingering, Fretboard};
use crate::input::ArrangerInput;
use crate::note::Note;
use crate::repair::{self, RepairMode};
use crate::tab::{EventOut, MeasureOut, NoteOut, Tab};
use crate::timeline;
use crate::tuning::Tuning;

const PROBABILITY_FLOOR: f64 = 2.220_446_049_250_313e-16; // 2^-52

/// A non-fatal condition encountered while arranging.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
	/// No playable fingering could be found for this chord, even after
	/// out-of-range repair; the event is kept in the tab with no notes.
	UnreachableChord { tick: u32, pitches: Vec<u8> },
}

/// The result of arranging a piece: the tab itself, plus anything that had
/// to be skipped along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangeOutcome {
	pub tab: Tab,
	pub warnings: Vec<Warning>,
}

/// Arrange `input` for `tuning`, producing a tab.
///
/// `tick_to_time` converts a tick offset into seconds for the tab's `time`
/// field; callers typically derive this from the source file's tempo map.
pub fn arrange(
	input: &ArrangerInput,
	tuning: Tuning,
	repair_mode: RepairMode,
	weights: Weights,
	tick_to_time: impl Fn(u32) -> f64,
) -> Result<ArrangeOutcome> {
	let input = input.clone().with_defaults();
	let fretboard = Fretboard::new(tuning)?;

	let events = timeline::build_event_map(&input);
	if events.values().all(|event| event.notes.is_none()) {
		return Err(FretwiseError::EmptyInput);
	}

	let end_tick = input
		.instruments
		.iter()
		.filter(|track| !track.is_drum)
		.flat_map(|track| track.notes.iter())
		.map(|note| note.offset_tick)
		.max()
		.unwrap_or(0)
		.max(events.keys().next_back().copied().unwrap_or(0) + 1);

	let measures = timeline::build_measures(&input, &events, end_tick);

	let mut warnings = Vec::new();
	let mut notes_vocabulary: Vec<Chord> = Vec::new();
	let mut fingerings_vocabulary: Vec<Fingering> = Vec::new();
	let mut emission: Vec<Vec<f64>> = Vec::new();
	let mut initial_distribution: Option<Vec<f64>> = None;

	// (measure index, event index within measure) for every event that
	// carries a chord, paired with the vocabulary index to decode, or
	// `None` when the chord could not be placed anywhere on the fretboard.
	let mut decode_plan: Vec<((usize, usize), Option<usize>)> = Vec::new();

	let mut out_measures: Vec<MeasureOut> = Vec::with_capacity(measures.len());

	for (imeasure, measure) in measures.iter().enumerate() {
		let mut out_events = Vec::with_capacity(measure.events.len());

		for (ievent, event) in measure.events.iter().enumerate() {
			let time_signature_change =
				event.time_signature.map(|ts| (ts.numerator, ts.denominator));
			let measure_timing =
				(event.tick - measure.start) as f64 / measure.duration_ticks() as f64;

			let mut out_event = EventOut {
				time: tick_to_time(event.tick),
				time_ticks: event.tick,
				measure_timing,
				time_signature_change,
				notes: None,
			};

			if let Some(chord) = &event.notes {
				out_event.notes = Some(Vec::new()); // signals this event carries notes

				let raw_notes: Vec<Note> = chord.pitches().iter().map(|&p| Note::from_pitch(p)).collect();
				let repaired = repair::repair_chord(&raw_notes, fretboard.tuning(), repair_mode);
				let repaired_chord = Chord::from_notes(&repaired);

				let vocab_index = if repaired_chord.is_empty() {
					None
				} else if let Some(existing) = notes_vocabulary.iter().position(|c| c == &repaired_chord) {
					Some(existing)
				} else {
					let fingering_options = fretboard.fingerings_for_chord(&repaired_chord);
					if fingering_options.is_empty() {
						None
					} else {
						let new_index = notes_vocabulary.len();
						notes_vocabulary.push(repaired_chord.clone());

						if initial_distribution.is_none() {
							let isolated: Vec<f64> = fingering_options
								.iter()
								.map(|f| 1.0 / difficulty::isolated_difficulty(&fretboard, f))
								.collect();
							initial_distribution = Some(normalize_row(isolated));
						}

						expand_emission(&mut emission, fingering_options.len());
						for row in fingerings_vocabulary.len()..fingerings_vocabulary.len() + fingering_options.len() {
							emission[row][new_index] = 1.0;
						}

						fingerings_vocabulary.extend(fingering_options);

						Some(new_index)
					}
				};

				if vocab_index.is_none() {
					warnings.push(Warning::UnreachableChord { tick: event.tick, pitches: chord.pitches().to_vec() });
					out_event.notes = None;
				}

				decode_plan.push(((imeasure, ievent), vocab_index));
			}

			out_events.push(out_event);
		}

		out_measures.push(MeasureOut { events: out_events });
	}

	let observation_sequence: Vec<usize> = decode_plan.iter().filter_map(|(_, v)| *v).collect();

	if !observation_sequence.is_empty() {
		let stats: Vec<FingeringStats> =
			fingerings_vocabulary.iter().map(|f| difficulty::fingering_stats(&fretboard, f)).collect();

		let transition = build_transition_matrix(&fretboard, &stats, &weights);

		let mut initial = initial_distribution.unwrap_or_default();
		initial.resize(fingerings_vocabulary.len(), 0.0);

		let decoded = viterbi(&observation_sequence, &transition, &emission, &initial);

		let mut decoded_iter = decoded.into_iter();
		for ((imeasure, ievent), vocab_index) in &decode_plan {
			if vocab_index.is_none() {
				continue;
			}
			let fingering_index = decoded_iter.next().expect("one decoded state per observation");
			let fingering = &fingerings_vocabulary[fingering_index];

			let notes_out: Vec<NoteOut> = fingering
				.positions()
				.iter()
				.map(|&position| {
					let note = Note::from_pitch(fretboard.pitch_at(position));
					NoteOut {
						degree: note.pitch.sharp_name().to_string(),
						octave: note.octave,
						string: position.string,
						fret: position.fret,
					}
				})
				.collect();

			out_measures[*imeasure].events[*ievent].notes = Some(notes_out);
		}
	}

	let tuning_pitches = fretboard.tuning().strings().iter().map(Note::midi).collect();

	Ok(ArrangeOutcome { tab: Tab { tuning: tuning_pitches, measures: out_measures }, warnings })
}

fn expand_emission(emission: &mut Vec<Vec<f64>>, n_new_fingerings: usize) {
	let n_chords = emission.first().map(|row| row.len()).unwrap_or(0);
	for old_row in emission.iter_mut() {
		old_row.push(0.0);
	}
	for _ in 0..n_new_fingerings {
		emission.push(vec![0.0; n_chords + 1]);
	}
}

fn build_transition_matrix(fretboard: &Fretboard, stats: &[FingeringStats], weights: &Weights) -> Vec<Vec<f64>> {
	let n = stats.len();
	let nstrings = fretboard.nstrings();
	let nfrets = fretboard.tuning().nfrets();

	(0..n)
		.map(|i| {
			let raw: Vec<f64> = (0..n)
				.map(|j| {
					1.0 / difficulty::transition_difficulty_from_stats(&stats[j], &stats[i], nstrings, nfrets, weights)
				})
				.collect();
			normalize_row(raw)
		})
		.collect()
}

fn normalize_row(mut raw: Vec<f64>) -> Vec<f64> {
	for value in raw.iter_mut() {
		if !value.is_finite() || *value <= 0.0 {
			*value = PROBABILITY_FLOOR;
		}
	}
	let sum: f64 = raw.iter().sum();
	if sum <= 0.0 || !sum.is_finite() {
		let n = raw.len().max(1) as f64;
		return vec![1.0 / n; raw.len()];
	}
	raw.into_iter().map(|v| v / sum).collect()
}

fn safe_log(x: f64) -> f64 {
	if x <= 0.0 { f64::NEG_INFINITY } else { x.ln() }
}

/// Log-space Viterbi decoding. Ties in the argmax are broken toward the
/// lowest state index, making the decoding deterministic.
fn viterbi(observations: &[usize], transition: &[Vec<f64>], emission: &[Vec<f64>], initial: &[f64]) -> Vec<usize> {
	let t_len = observations.len();
	let n_states = transition.len();
	if t_len == 0 || n_states == 0 {
		return Vec::new();
	}

	let mut omega = vec![vec![f64::NEG_INFINITY; n_states]; t_len];
	for state in 0..n_states {
		omega[0][state] = safe_log(initial[state]) + safe_log(emission[state][observations[0]]);
	}

	let mut backpointer = vec![vec![0usize; n_states]; t_len];

	for t in 1..t_len {
		for j in 0..n_states {
			let mut best_value = f64::NEG_INFINITY;
			let mut best_index = 0usize;
			for i in 0..n_states {
				let candidate = omega[t - 1][i] + safe_log(transition[i][j]);
				if candidate > best_value {
					best_value = candidate;
					best_index = i;
				}
			}
			backpointer[t][j] = best_index;
			omega[t][j] = best_value + safe_log(emission[j][observations[t]]);
		}
	}

	let mut best_last = 0usize;
	let mut best_value = f64::NEG_INFINITY;
	for state in 0..n_states {
		if omega[t_len - 1][state] > best_value {
			best_value = omega[t_len - 1][state];
			best_last = state;
		}
	}

	let mut path = vec![0usize; t_len];
	path[t_len - 1] = best_last;
	for t in (0..t_len - 1).rev() {
		path[t] = backpointer[t + 1][path[t + 1]];
	}
	path
}
