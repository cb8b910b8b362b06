//! The external shape callers hand to the arranger: a parsed symbolic music
//! file, stripped down to timing, pitches, and time-signature changes.

/// A time-signature change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignatureChange {
	pub tick: u32,
	pub numerator: u8,
	pub denominator: u8,
}

/// A single note-on/note-off span, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNote {
	pub pitch: u8,
	pub onset_tick: u32,
	pub offset_tick: u32,
	pub velocity: u8,
}

/// One instrument track's worth of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentTrack {
	pub is_drum: bool,
	pub notes: Vec<RawNote>,
}

/// Everything the arranger needs from a symbolic music source.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangerInput {
	pub ticks_per_quarter: u32,
	pub time_signatures: Vec<TimeSignatureChange>,
	pub instruments: Vec<InstrumentTrack>,
}

impl ArrangerInput {
	/// If no time signature was declared, the piece is treated as 4/4 from
	/// the first tick.
	pub fn with_defaults(mut self) -> Self {
		if self.time_signatures.is_empty() {
			self.time_signatures.push(TimeSignatureChange { tick: 0, numerator: 4, denominator: 4 });
		}
		self
	}
}
