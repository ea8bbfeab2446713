//! The chime as seen by the rest of the clock.

use chrono::Timelike;

use crate::config::{ChimeConfig, NEUTRAL_LEVEL};
use crate::oscillator::{AnalogOut, ToneGenerator};
use crate::sequencer::{ChimePhase, MelodySequencer, PlaybackState};
use crate::trigger::HourlyTrigger;

/// Most hour strikes a debug chime will play
pub const MAX_STRIKES: u8 = 12;

pub struct Chime {
  tone: &'static ToneGenerator,
  sequencer: MelodySequencer,
  trigger: HourlyTrigger,
}

impl Chime {
  /// Take over the output: silence it and apply the configured volume.
  ///
  /// `tone` must be the generator ticked by the sample interrupt, and `out`
  /// the sink that interrupt writes to.
  pub fn begin(tone: &'static ToneGenerator, out: &'static dyn AnalogOut, config: ChimeConfig) -> Self {
    out.write(NEUTRAL_LEVEL);
    tone.set_volume(config.volume_percent);
    info!("chime ready, {} Hz sample rate, volume {}%", tone.sample_rate_hz(), tone.volume());
    Self {
      tone,
      sequencer: MelodySequencer::new(tone, out, config.gaps),
      trigger: HourlyTrigger::new(config.quiet_hours, config.strike_window_secs),
    }
  }

  /// Poll from the main loop, at least every ~10 ms.
  pub fn update(&mut self, now_ms: u64) {
    self.sequencer.update(now_ms);
  }

  /// 0-100%, takes effect from the next note
  pub fn set_volume(&mut self, percent: u8) {
    self.tone.set_volume(percent);
    debug!("volume {}%", self.tone.volume());
  }

  pub fn volume(&self) -> u8 {
    self.tone.volume()
  }

  /// Play the full chime now, regardless of the time of day.
  pub fn play_debug_chime(&mut self, strikes: u8, now_ms: u64) {
    let strikes = strikes.clamp(1, MAX_STRIKES);
    debug!("debug chime, {} strikes", strikes);
    self.sequencer.start_chime_sequence(strikes, now_ms);
  }

  /// Start the hourly chime when the wall clock has just turned the hour.
  /// Returns true when a chime was started.
  pub fn maybe_chime(&mut self, time: &impl Timelike, now_ms: u64) -> bool {
    match self.trigger.poll(time, self.sequencer.is_playing()) {
      Some(strikes) => {
        self.sequencer.start_chime_sequence(strikes, now_ms);
        true
      }
      None => false,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.sequencer.is_playing()
  }

  pub fn playback_state(&self) -> PlaybackState {
    self.sequencer.playback_state()
  }

  pub fn phase(&self) -> ChimePhase {
    self.sequencer.phase()
  }

  pub fn last_chimed_hour(&self) -> Option<u8> {
    self.trigger.last_chimed_hour()
  }
}
