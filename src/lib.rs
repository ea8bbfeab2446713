//! Hourly Westminster chime for a clock.
//!
//! A wavetable oscillator ticked from a fixed-rate sample interrupt, driven
//! by a non-blocking melody sequencer polled from the main loop, and gated
//! by an hourly trigger with quiet hours.
//!
//! ```no_run
//! use pico_chime::{AnalogOut, Chime, ChimeConfig, Failsafe, ToneGenerator, SAMPLE_RATE_HZ, SINE};
//!
//! struct Dac;
//! impl AnalogOut for Dac {
//!   fn write(&self, _level: u8) {}
//! }
//!
//! static TONE: ToneGenerator = ToneGenerator::new(&SINE, SAMPLE_RATE_HZ, Failsafe::Armed);
//! static DAC: Dac = Dac;
//!
//! // sample interrupt:
//! TONE.tick_into(&DAC);
//!
//! // main loop:
//! let mut chime = Chime::begin(&TONE, &DAC, ChimeConfig::default());
//! chime.play_debug_chime(3, 0);
//! chime.update(10);
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod chime;
pub mod config;
pub mod failsafe;
pub mod melody;
pub mod oscillator;
pub mod sequencer;
pub mod trigger;
pub mod wavetable;

pub use chime::Chime;
pub use config::{ChimeConfig, GapTable, QuietHours, NEUTRAL_LEVEL, SAMPLE_RATE_HZ};
pub use failsafe::Failsafe;
pub use melody::Note;
pub use oscillator::{AnalogOut, ToneGenerator};
pub use sequencer::{ChimePhase, MelodySequencer, PlaybackState};
pub use trigger::{strikes_for_hour, HourlyTrigger};
pub use wavetable::{Wavetable, SINE};
