//! Chime tuning: timing constants, quiet hours, defaults.

/// Rate of the sample interrupt
pub const SAMPLE_RATE_HZ: u32 = 44_000;

/// Output level of silence, mid-scale of the 8-bit analog output
pub const NEUTRAL_LEVEL: u8 = 128;

pub const NOTE_GAP_MS: u32 = 80;
pub const PHRASE_GAP_MS: u32 = 400;
pub const PRE_STRIKE_PAUSE_MS: u32 = 1500;
pub const STRIKE_GAP_MS: u32 = 1000;

pub const DEFAULT_VOLUME_PERCENT: u8 = 50;

/// Chimes are silenced from this hour (inclusive)...
pub const QUIET_START_HOUR: u8 = 22;
/// ...until this hour (exclusive)
pub const QUIET_END_HOUR: u8 = 8;

/// How many seconds after the top of the hour a chime may still start
pub const STRIKE_WINDOW_SECS: u8 = 2;

/// Silence inserted between sounds, by situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapTable {
  /// between notes of one melody phrase
  pub note_ms: u32,
  /// after the last note of a phrase
  pub phrase_ms: u32,
  /// once, between the end of the melody and the first hour strike
  pub pre_strike_ms: u32,
  /// between consecutive hour strikes
  pub strike_ms: u32,
}

/// Which kind of silence follows the current position in a chime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GapKind {
  Note,
  Phrase,
  PreStrike,
  Strike,
}

impl GapTable {
  pub const fn duration_ms(&self, kind: GapKind) -> u32 {
    match kind {
      GapKind::Note => self.note_ms,
      GapKind::Phrase => self.phrase_ms,
      GapKind::PreStrike => self.pre_strike_ms,
      GapKind::Strike => self.strike_ms,
    }
  }
}

impl Default for GapTable {
  fn default() -> Self {
    Self {
      note_ms: NOTE_GAP_MS,
      phrase_ms: PHRASE_GAP_MS,
      pre_strike_ms: PRE_STRIKE_PAUSE_MS,
      strike_ms: STRIKE_GAP_MS,
    }
  }
}

/// A time-of-day window, in whole hours, during which the hourly chime is suppressed.
///
/// The window runs from `start_hour` (inclusive) to `end_hour` (exclusive) and
/// may wrap past midnight. Equal bounds mean no quiet hours at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
  pub start_hour: u8,
  pub end_hour: u8,
}

impl QuietHours {
  pub const NONE: QuietHours = QuietHours { start_hour: 0, end_hour: 0 };

  pub const fn new(start_hour: u8, end_hour: u8) -> Self {
    Self { start_hour, end_hour }
  }

  pub fn contains(&self, hour: u8) -> bool {
    let (start, end) = (self.start_hour, self.end_hour);
    if start == end {
      false
    }
    else if start < end {
      hour >= start && hour < end
    }
    else {
      // wraps midnight
      hour >= start || hour < end
    }
  }
}

impl Default for QuietHours {
  fn default() -> Self {
    Self::new(QUIET_START_HOUR, QUIET_END_HOUR)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChimeConfig {
  pub gaps: GapTable,
  pub quiet_hours: QuietHours,
  pub strike_window_secs: u8,
  /// 0-100, applied at `Chime::begin`
  pub volume_percent: u8,
}

impl Default for ChimeConfig {
  fn default() -> Self {
    Self {
      gaps: GapTable::default(),
      quiet_hours: QuietHours::default(),
      strike_window_secs: STRIKE_WINDOW_SECS,
      volume_percent: DEFAULT_VOLUME_PERCENT,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_quiet_hours_wrap_midnight() {
    let quiet = QuietHours::default();
    assert!(quiet.contains(22));
    assert!(quiet.contains(23));
    assert!(quiet.contains(0));
    assert!(quiet.contains(7));
    assert!(!quiet.contains(8));
    assert!(!quiet.contains(15));
    assert!(!quiet.contains(21));
  }

  #[test]
  fn daytime_quiet_window() {
    let quiet = QuietHours::new(12, 14);
    assert!(!quiet.contains(11));
    assert!(quiet.contains(12));
    assert!(quiet.contains(13));
    assert!(!quiet.contains(14));
  }

  #[test]
  fn gap_lookup() {
    let gaps = GapTable::default();
    assert_eq!(gaps.duration_ms(GapKind::Note), 80);
    assert_eq!(gaps.duration_ms(GapKind::Phrase), 400);
    assert_eq!(gaps.duration_ms(GapKind::PreStrike), 1500);
    assert_eq!(gaps.duration_ms(GapKind::Strike), 1000);
  }

  #[test]
  fn no_quiet_hours() {
    for hour in 0..24 {
      assert!(!QuietHours::NONE.contains(hour));
    }
  }
}
