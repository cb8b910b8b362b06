//! Fretwise Core - fretted-instrument tablature arranger
//!
//! This crate turns a timed sequence of pitched note events into playable
//! tablature by modeling the problem as a hidden Markov model: hidden states
//! are concrete left-hand fingerings, observations are chord identities, and
//! decoding the most likely state sequence yields a fingering for every
//! event that is both physically possible and comfortable in continuity.
//!
//! # Examples
//!
//! ```
//! use fretwise_core::tuning::Tuning;
//! use fretwise_core::fretboard::Fretboard;
//!
//! let tuning = Tuning::standard();
//! let fretboard = Fretboard::new(tuning).unwrap();
//! assert!(fretboard.nstrings() >= 1);
//! ```

pub mod chord;
pub mod difficulty;
pub mod fretboard;
pub mod hmm;
pub mod input;
pub mod note;
pub mod repair;
pub mod tab;
pub mod timeline;
pub mod tuning;

pub use chord::Chord;
pub use fretboard::{Fingering, Fretboard, Position};
pub use hmm::{ArrangeOutcome, Warning, arrange};
pub use input::{ArrangerInput, InstrumentTrack, RawNote, TimeSignatureChange};
pub use note::{Note, PitchClass};
pub use tab::Tab;
pub use tuning::Tuning;

/// Error types for the fretwise-core library
pub mod error {
	use thiserror::Error;

	#[derive(Error, Debug)]
	pub enum FretwiseError {
		#[error("no playable notes found in input")]
		EmptyInput,

		#[error("invalid tuning: {0}")]
		InvalidTuning(String),
	}

	pub type Result<T> = std::result::Result<T, FretwiseError>;
}

pub use error::{FretwiseError, Result};
