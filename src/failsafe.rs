//! Sample-count failsafe.
//!
//! Counts the samples emitted for the current note and ends the note from the
//! interrupt side once its duration has elapsed, so a note always ends even if
//! the polled sequencer stalls.
//!
//! Field ownership: `sample_target` is written by the loop at note start;
//! `sample_count` is written by the interrupt (and reset by the loop while the
//! oscillator is inactive); `completed` is raised by the interrupt and cleared
//! by the loop. Only `load`/`store` are used, Cortex-M0+ has no atomic RMW.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Whether the oscillator carries the sample-count failsafe layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failsafe {
  Armed,
  Disabled,
}

/// Samples needed to play `duration_ms`, rounded to nearest.
pub const fn sample_target(duration_ms: u32, sample_rate_hz: u32) -> u32 {
  ((duration_ms as u64 * sample_rate_hz as u64 + 500) / 1000) as u32
}

pub struct SampleCounter {
  sample_count: AtomicU32,
  sample_target: AtomicU32,
  completed: AtomicBool,
}

impl SampleCounter {
  pub const fn new() -> Self {
    Self {
      sample_count: AtomicU32::new(0),
      sample_target: AtomicU32::new(0),
      completed: AtomicBool::new(false),
    }
  }

  /// Loop side, before the oscillator is activated.
  /// A target of 0 leaves the failsafe disarmed for this note.
  pub fn arm(&self, target: u32) {
    self.sample_count.store(0, Ordering::Relaxed);
    self.sample_target.store(target, Ordering::Relaxed);
    self.completed.store(false, Ordering::Relaxed);
  }

  /// Interrupt side: account one sample.
  /// Returns true when this sample reaches the target; `completed` is raised.
  #[inline(always)]
  pub fn count(&self) -> bool {
    let target = self.sample_target.load(Ordering::Relaxed);
    if target == 0 {
      return false;
    }
    let count = self.sample_count.load(Ordering::Relaxed).wrapping_add(1);
    self.sample_count.store(count, Ordering::Relaxed);
    if count >= target {
      self.completed.store(true, Ordering::Release);
      true
    }
    else {
      false
    }
  }

  /// Loop side: consume a completion raised by the interrupt.
  pub fn take_completed(&self) -> bool {
    if self.completed.load(Ordering::Acquire) {
      self.completed.store(false, Ordering::Relaxed);
      true
    }
    else {
      false
    }
  }

  pub fn is_completed(&self) -> bool {
    self.completed.load(Ordering::Acquire)
  }

  pub fn sample_count(&self) -> u32 {
    self.sample_count.load(Ordering::Relaxed)
  }

  pub fn sample_target(&self) -> u32 {
    self.sample_target.load(Ordering::Relaxed)
  }
}

impl Default for SampleCounter {
  fn default() -> Self {
    Self::new()
  }
}
