use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use fretwise_core::difficulty::Weights;
use fretwise_core::input::{ArrangerInput, InstrumentTrack, RawNote, TimeSignatureChange};
use fretwise_core::repair::RepairMode;
use fretwise_core::tuning::Tuning;
use fretwise_core::{Warning, arrange};

/// Conventionally, MIDI channel 10 (index 9) carries drum/percussion notes,
/// which don't correspond to fretboard pitches.
const DRUM_CHANNEL: u8 = 9;

#[derive(Parser)]
#[command(name = "fretwise")]
#[command(about = "Arrange a MIDI file into tablature for a fretted instrument", long_about = None)]
#[command(version)]
struct Cli {
	/// Path to the input MIDI file
	midi_file: PathBuf,

	/// Comma-separated string tuning, highest pitch first (e.g. "E4,B3,G3,D3,A2,E2")
	#[arg(short, long, default_value = "E4,B3,G3,D3,A2,E2")]
	tuning: String,

	/// Number of frets on the instrument
	#[arg(long, default_value = "20")]
	frets: u8,

	/// Cap out-of-range notes at the highest note's shifted pitch instead of
	/// repairing each note independently
	#[arg(long)]
	preserve_highest: bool,

	/// Laplace scale for the height-change comfort term
	#[arg(long, default_value = "1.0")]
	b: f64,

	/// Weight of the average fretted height penalty
	#[arg(long, default_value = "1.0")]
	height: f64,

	/// Weight of the fretted span penalty
	#[arg(long, default_value = "1.0")]
	length: f64,

	/// Weight of the changed-strings penalty
	#[arg(long, default_value = "1.0")]
	n_changed_strings: f64,
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let tuning = Tuning::parse_str(&cli.tuning, cli.frets).context("invalid --tuning")?;
	let repair_mode = if cli.preserve_highest { RepairMode::PreserveHighest } else { RepairMode::Default };
	let weights = Weights { b: cli.b, height: cli.height, length: cli.length, n_changed_strings: cli.n_changed_strings };

	let bytes = fs::read(&cli.midi_file)
		.with_context(|| format!("failed to read MIDI file '{}'", cli.midi_file.display()))?;
	let (input, tempo_map) = parse_midi(&bytes).context("failed to parse MIDI file")?;

	let ticks_per_quarter = input.ticks_per_quarter;
	let outcome = arrange(&input, tuning, repair_mode, weights, |tick| tick_to_seconds(tick, ticks_per_quarter, &tempo_map))
		.context("failed to arrange tablature")?;

	for warning in &outcome.warnings {
		match warning {
			Warning::UnreachableChord { tick, pitches } => {
				println!(
					"{} no fingering found for pitches {:?} at tick {tick}",
					"warning:".yellow().bold(),
					pitches
				);
			}
		}
	}

	let stem = cli
		.midi_file
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_else(|| "tab".to_string());
	let parent = cli.midi_file.parent().unwrap_or_else(|| std::path::Path::new("."));

	let json_path = parent.join(format!("{stem}.json"));
	let json = outcome.tab.to_json().context("failed to serialize tab as JSON")?;
	fs::write(&json_path, json).with_context(|| format!("failed to write '{}'", json_path.display()))?;

	let ascii_path = parent.join(format!("{stem}.txt"));
	let ascii = fretwise_core::tab::ascii::render(&outcome.tab).join("\n");
	fs::write(&ascii_path, ascii).with_context(|| format!("failed to write '{}'", ascii_path.display()))?;

	println!("{} {}", "wrote".green(), json_path.display());
	println!("{} {}", "wrote".green(), ascii_path.display());

	Ok(())
}

/// A tempo map entry: from `tick` onward, one quarter note takes
/// `microseconds_per_quarter` microseconds. Sorted by tick, tick 0 always
/// present (defaulting to 120 BPM if the file never sets a tempo).
type TempoMap = Vec<(u32, u32)>;

/// Read note on/off events, time signatures, and tempo changes out of a
/// standard MIDI file, producing the shape [`arrange`] expects.
fn parse_midi(bytes: &[u8]) -> Result<(ArrangerInput, TempoMap)> {
	let smf = Smf::parse(bytes).context("not a valid MIDI file")?;

	let ticks_per_quarter = match smf.header.timing {
		Timing::Metrical(ticks) => ticks.as_int() as u32,
		Timing::Timecode(..) => bail!("SMPTE timecode-based MIDI files are not supported"),
	};

	let mut time_signatures = Vec::new();
	let mut tempo_map: TempoMap = Vec::new();
	let mut instruments = Vec::new();

	for track in &smf.tracks {
		let mut tick = 0u32;
		let mut is_drum = false;
		let mut open_notes: Vec<(u8, u32, u8)> = Vec::new();
		let mut notes = Vec::new();

		for event in track {
			tick += event.delta.as_int();

			match event.kind {
				TrackEventKind::Midi { channel, message } => {
					if channel.as_int() == DRUM_CHANNEL {
						is_drum = true;
					}
					match message {
						MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
							open_notes.push((key.as_int(), tick, vel.as_int()));
						}
						MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
							let pitch = key.as_int();
							if let Some(pos) = open_notes.iter().position(|&(p, _, _)| p == pitch) {
								let (_, onset_tick, velocity) = open_notes.remove(pos);
								notes.push(RawNote { pitch, onset_tick, offset_tick: tick, velocity });
							}
						}
						_ => {}
					}
				}
				TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denominator_pow2, ..)) => {
					time_signatures.push(TimeSignatureChange {
						tick,
						numerator,
						denominator: 1u8 << denominator_pow2,
					});
				}
				TrackEventKind::Meta(MetaMessage::Tempo(microseconds_per_quarter)) => {
					tempo_map.push((tick, microseconds_per_quarter.as_int()));
				}
				_ => {}
			}
		}

		if !notes.is_empty() {
			instruments.push(InstrumentTrack { is_drum, notes });
		}
	}

	tempo_map.sort_by_key(|&(tick, _)| tick);
	tempo_map.dedup_by_key(|&mut (tick, _)| tick);
	if tempo_map.first().map(|&(tick, _)| tick) != Some(0) {
		tempo_map.insert(0, (0, 500_000));
	}

	let input = ArrangerInput { ticks_per_quarter, time_signatures, instruments }.with_defaults();
	Ok((input, tempo_map))
}

/// Convert a tick offset to seconds by integrating over every tempo segment
/// up to that tick.
fn tick_to_seconds(tick: u32, ticks_per_quarter: u32, tempo_map: &TempoMap) -> f64 {
	let mut seconds = 0.0;
	let mut previous_tick = 0u32;
	let mut previous_tempo = tempo_map.first().map(|&(_, t)| t).unwrap_or(500_000);

	for &(segment_tick, microseconds_per_quarter) in tempo_map {
		if segment_tick >= tick {
			break;
		}
		let segment_ticks = segment_tick - previous_tick;
		seconds += segment_ticks as f64 * previous_tempo as f64 / 1_000_000.0 / ticks_per_quarter as f64;
		previous_tick = segment_tick;
		previous_tempo = microseconds_per_quarter;
	}

	let remaining_ticks = tick - previous_tick;
	seconds += remaining_ticks as f64 * previous_tempo as f64 / 1_000_000.0 / ticks_per_quarter as f64;
	seconds
}
