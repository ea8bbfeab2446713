//! Wavetable oscillator driven by the sample interrupt.
//!
//! `ToneGenerator` is shared between two contexts: the sample interrupt calls
//! [`ToneGenerator::tick`] once per sample period, and the main loop starts and
//! stops notes. Every field has a single writer:
//!
//! | field              | written by                                     |
//! |--------------------|------------------------------------------------|
//! | `phase`            | interrupt (reset by the loop while inactive)   |
//! | `phase_increment`  | loop, at note start                            |
//! | `amplitude`        | loop, at note start                            |
//! | `active`           | loop on start/stop, interrupt on failsafe stop |
//!
//! No multi-field atomicity is needed: the loop writes all note parameters
//! before publishing `active` with `Release`, and the interrupt reads `active`
//! with `Acquire` before touching them.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::{DEFAULT_VOLUME_PERCENT, NEUTRAL_LEVEL};
use crate::failsafe::{sample_target, Failsafe, SampleCounter};
use crate::wavetable::Wavetable;

/// Largest amplitude, reached at 100% volume
pub const MAX_AMPLITUDE: u8 = 127;

/// Sink for 8-bit unsigned output samples (a DAC, or a PWM duty cycle).
///
/// Written from both the sample interrupt and the main loop, hence `&self`.
pub trait AnalogOut {
  fn write(&self, level: u8);
}

/// Per-sample phase step for `frequency_hz`: round(f * 2^32 / rate)
pub const fn phase_increment(frequency_hz: u32, sample_rate_hz: u32) -> u32 {
  let rate = sample_rate_hz as u64;
  ((((frequency_hz as u64) << 32) + rate / 2) / rate) as u32
}

/// Map a 0-100% volume linearly onto 0-127
pub const fn amplitude_for_volume(percent: u8) -> u8 {
  let percent = if percent > 100 { 100 } else { percent };
  ((percent as u16 * MAX_AMPLITUDE as u16) / 100) as u8
}

/// Scale a table sample and offset it around the neutral level.
///
/// Divides by 64 rather than by the amplitude range, so amplitudes above 64
/// overdrive slightly; the result is clamped, never wrapped.
#[inline(always)]
pub fn render(sample: i8, amplitude: u8) -> u8 {
  let level = (sample as i32 * amplitude as i32) / 64 + NEUTRAL_LEVEL as i32;
  level.clamp(u8::MIN as i32, u8::MAX as i32) as u8
}

pub struct ToneGenerator {
  table: &'static Wavetable,
  sample_rate_hz: u32,
  failsafe: Failsafe,
  active: AtomicBool,
  phase: AtomicU32,
  phase_increment: AtomicU32,
  amplitude: AtomicU8,
  volume: AtomicU8,
  counter: SampleCounter,
}

impl ToneGenerator {
  pub const fn new(table: &'static Wavetable, sample_rate_hz: u32, failsafe: Failsafe) -> Self {
    Self {
      table,
      sample_rate_hz,
      failsafe,
      active: AtomicBool::new(false),
      phase: AtomicU32::new(0),
      phase_increment: AtomicU32::new(0),
      amplitude: AtomicU8::new(0),
      volume: AtomicU8::new(DEFAULT_VOLUME_PERCENT),
      counter: SampleCounter::new(),
    }
  }

  /// Begin sounding a tone. The oscillator must be inactive.
  ///
  /// Frequency and duration are not validated here; a zero duration
  /// leaves the failsafe disarmed for this note.
  pub fn start_note(&self, frequency_hz: u32, duration_ms: u32) {
    let increment = phase_increment(frequency_hz, self.sample_rate_hz);
    self.phase_increment.store(increment, Ordering::Relaxed);
    self.amplitude.store(amplitude_for_volume(self.volume()), Ordering::Relaxed);
    self.phase.store(0, Ordering::Relaxed);
    let target = match self.failsafe {
      Failsafe::Armed => sample_target(duration_ms, self.sample_rate_hz),
      Failsafe::Disabled => 0,
    };
    self.counter.arm(target);
    self.active.store(true, Ordering::Release);
  }

  /// Silence now: deactivate, rewind the phase, and write the neutral level
  /// without waiting for the next tick.
  pub fn stop_note(&self, out: &(impl AnalogOut + ?Sized)) {
    self.active.store(false, Ordering::Release);
    self.phase.store(0, Ordering::Relaxed);
    out.write(NEUTRAL_LEVEL);
  }

  /// One sample period. Call from the sample interrupt.
  ///
  /// Returns the level to write, or `None` while inactive. The tick that
  /// reaches the failsafe target only stops the note and yields the
  /// neutral level.
  #[inline(always)]
  pub fn tick(&self) -> Option<u8> {
    if !self.active.load(Ordering::Acquire) {
      return None;
    }
    if self.failsafe == Failsafe::Armed && self.counter.count() {
      self.active.store(false, Ordering::Release);
      return Some(NEUTRAL_LEVEL);
    }
    let phase = self
      .phase
      .load(Ordering::Relaxed)
      .wrapping_add(self.phase_increment.load(Ordering::Relaxed));
    self.phase.store(phase, Ordering::Relaxed);
    Some(render(self.table.sample(phase), self.amplitude.load(Ordering::Relaxed)))
  }

  #[inline(always)]
  pub fn tick_into(&self, out: &(impl AnalogOut + ?Sized)) {
    if let Some(level) = self.tick() {
      out.write(level);
    }
  }

  /// Volume for subsequent notes, 0-100 (larger values are clamped)
  pub fn set_volume(&self, percent: u8) {
    self.volume.store(percent.min(100), Ordering::Relaxed);
  }

  pub fn volume(&self) -> u8 {
    self.volume.load(Ordering::Relaxed)
  }

  pub fn amplitude(&self) -> u8 {
    self.amplitude.load(Ordering::Relaxed)
  }

  pub fn is_active(&self) -> bool {
    self.active.load(Ordering::Acquire)
  }

  pub fn phase(&self) -> u32 {
    self.phase.load(Ordering::Relaxed)
  }

  pub fn phase_increment(&self) -> u32 {
    self.phase_increment.load(Ordering::Relaxed)
  }

  /// Consume a failsafe completion raised by the interrupt
  pub fn take_completed(&self) -> bool {
    self.counter.take_completed()
  }

  pub fn sample_count(&self) -> u32 {
    self.counter.sample_count()
  }

  pub fn sample_target(&self) -> u32 {
    self.counter.sample_target()
  }

  pub fn sample_rate_hz(&self) -> u32 {
    self.sample_rate_hz
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::wavetable::SINE;
  use core::cell::Cell;

  #[derive(Default)]
  struct Probe {
    last: Cell<Option<u8>>,
    writes: Cell<usize>,
  }

  impl AnalogOut for Probe {
    fn write(&self, level: u8) {
      self.last.set(Some(level));
      self.writes.set(self.writes.get() + 1);
    }
  }

  fn tone(failsafe: Failsafe) -> ToneGenerator {
    ToneGenerator::new(&SINE, 44_000, failsafe)
  }

  #[test]
  fn increment_and_amplitude_math() {
    assert_eq!(phase_increment(330, 44_000), 32_212_255);
    assert_eq!(phase_increment(11_000, 44_000), 1 << 30);
    assert_eq!(amplitude_for_volume(0), 0);
    assert_eq!(amplitude_for_volume(10), 12);
    assert_eq!(amplitude_for_volume(50), 63);
    assert_eq!(amplitude_for_volume(100), 127);
    assert_eq!(amplitude_for_volume(250), 127);
  }

  #[test]
  fn render_clamps_overdrive() {
    assert_eq!(render(0, 127), NEUTRAL_LEVEL);
    assert_eq!(render(64, 64), 192);
    assert_eq!(render(-64, 64), 64);
    assert_eq!(render(91, 127), u8::MAX);
    assert_eq!(render(-91, 127), u8::MIN);
    // truncates toward zero like the integer division it is
    assert_eq!(render(-1, 1), NEUTRAL_LEVEL);
  }

  #[test]
  fn inactive_tick_writes_nothing() {
    let tone = tone(Failsafe::Armed);
    let probe = Probe::default();
    for _ in 0..10 {
      tone.tick_into(&probe);
    }
    assert_eq!(probe.writes.get(), 0);
  }

  #[test]
  fn failsafe_stops_after_exact_sample_count() {
    let tone = tone(Failsafe::Armed);
    tone.set_volume(10);
    tone.start_note(330, 600);
    assert_eq!(tone.sample_target(), 26_400);
    assert_eq!(tone.amplitude(), 12);

    for _ in 0..26_399 {
      assert!(tone.tick().is_some());
      assert!(tone.is_active());
      assert!(!tone.counter.is_completed());
    }
    assert_eq!(tone.tick(), Some(NEUTRAL_LEVEL));
    assert!(!tone.is_active());
    assert!(tone.take_completed());
    assert_eq!(tone.tick(), None);
  }

  #[test]
  fn disabled_failsafe_keeps_sounding() {
    let tone = tone(Failsafe::Disabled);
    tone.start_note(440, 1);
    for _ in 0..1_000 {
      assert!(tone.tick().is_some());
    }
    assert!(tone.is_active());
    assert!(!tone.take_completed());
  }

  #[test]
  fn zero_amplitude_is_silent() {
    let tone = tone(Failsafe::Armed);
    tone.set_volume(0);
    for freq in [165, 330, 1_000, 7_919] {
      tone.start_note(freq, 50);
      while let Some(level) = tone.tick() {
        assert_eq!(level, NEUTRAL_LEVEL);
      }
    }
  }

  #[test]
  fn phase_advances_and_wraps() {
    let tone = tone(Failsafe::Disabled);
    tone.start_note(11_000, 100);
    // a quarter cycle per tick
    assert!(tone.tick().is_some());
    assert_eq!(tone.phase(), 1 << 30);
    for _ in 0..3 {
      tone.tick();
    }
    assert_eq!(tone.phase(), 0);
  }

  #[test]
  fn stop_is_synchronous_and_rewinds() {
    let tone = tone(Failsafe::Armed);
    let probe = Probe::default();
    tone.set_volume(100);
    tone.start_note(523, 500);
    for _ in 0..37 {
      tone.tick_into(&probe);
    }
    assert_ne!(tone.phase(), 0);
    tone.stop_note(&probe);
    assert_eq!(probe.last.get(), Some(NEUTRAL_LEVEL));
    assert_eq!(tone.phase(), 0);
    assert!(!tone.is_active());
  }

  #[test]
  fn volume_is_clamped() {
    let tone = tone(Failsafe::Armed);
    tone.set_volume(180);
    assert_eq!(tone.volume(), 100);
  }
}
