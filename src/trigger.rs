//! Once-per-hour chime gate.

use chrono::Timelike;

use crate::config::QuietHours;

/// Hour strikes for a 24-hour clock hour, in 12-hour format: 0 and 12 strike 12
pub const fn strikes_for_hour(hour: u8) -> u8 {
  match hour % 12 {
    0 => 12,
    h => h,
  }
}

pub struct HourlyTrigger {
  last_chimed_hour: Option<u8>,
  quiet_hours: QuietHours,
  strike_window_secs: u8,
}

impl HourlyTrigger {
  pub const fn new(quiet_hours: QuietHours, strike_window_secs: u8) -> Self {
    Self {
      last_chimed_hour: None,
      quiet_hours,
      strike_window_secs,
    }
  }

  /// Decide whether the hourly chime should start now.
  ///
  /// Fires at most once per hour value, in the first `strike_window_secs`
  /// seconds of the hour, outside quiet hours, and only when nothing is
  /// already `playing`. Returns the number of hour strikes.
  pub fn poll(&mut self, time: &impl Timelike, playing: bool) -> Option<u8> {
    if time.minute() != 0 || time.second() >= self.strike_window_secs as u32 {
      return None;
    }
    let hour = time.hour() as u8;
    if self.last_chimed_hour == Some(hour) || playing {
      return None;
    }
    if self.quiet_hours.contains(hour) {
      debug!("quiet hours, no chime at {}:00", hour);
      return None;
    }
    self.last_chimed_hour = Some(hour);
    let strikes = strikes_for_hour(hour);
    info!("hourly chime {}:00, {} strikes", hour, strikes);
    Some(strikes)
  }

  pub fn last_chimed_hour(&self) -> Option<u8> {
    self.last_chimed_hour
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::STRIKE_WINDOW_SECS;
  use chrono::NaiveTime;

  fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
  }

  fn trigger() -> HourlyTrigger {
    HourlyTrigger::new(QuietHours::default(), STRIKE_WINDOW_SECS)
  }

  #[test]
  fn twelve_hour_strikes() {
    assert_eq!(strikes_for_hour(15), 3);
    assert_eq!(strikes_for_hour(0), 12);
    assert_eq!(strikes_for_hour(12), 12);
    assert_eq!(strikes_for_hour(1), 1);
    assert_eq!(strikes_for_hour(23), 11);
  }

  #[test]
  fn fires_once_through_the_window() {
    let mut trigger = trigger();
    let mut fired = 0;
    // every millisecond of the first two seconds resolves to one of two wall-clock seconds
    for ms in 0..2_000u32 {
      if trigger.poll(&hms(15, 0, ms / 1000), false).is_some() {
        fired += 1;
      }
    }
    assert_eq!(fired, 1);
    assert_eq!(trigger.last_chimed_hour(), Some(15));
  }

  #[test]
  fn returns_strike_count() {
    let mut trigger = trigger();
    assert_eq!(trigger.poll(&hms(15, 0, 0), false), Some(3));
    assert_eq!(trigger.poll(&hms(16, 0, 1), false), Some(4));
  }

  #[test]
  fn outside_window_never_fires() {
    let mut trigger = trigger();
    assert_eq!(trigger.poll(&hms(15, 0, 2), false), None);
    assert_eq!(trigger.poll(&hms(15, 1, 0), false), None);
    assert_eq!(trigger.poll(&hms(15, 59, 59), false), None);
    assert_eq!(trigger.last_chimed_hour(), None);
  }

  #[test]
  fn quiet_hours_suppress() {
    let mut trigger = trigger();
    assert_eq!(trigger.poll(&hms(23, 0, 0), false), None);
    assert_eq!(trigger.poll(&hms(0, 0, 0), false), None);
    assert_eq!(trigger.poll(&hms(7, 0, 0), false), None);
    assert_eq!(trigger.poll(&hms(8, 0, 0), false), Some(8));
    assert_eq!(trigger.poll(&hms(21, 0, 0), false), Some(9));
  }

  #[test]
  fn midnight_strikes_twelve_without_quiet_hours() {
    let mut trigger = HourlyTrigger::new(QuietHours::NONE, STRIKE_WINDOW_SECS);
    assert_eq!(trigger.poll(&hms(0, 0, 0), false), Some(12));
    assert_eq!(trigger.poll(&hms(12, 0, 0), false), Some(12));
  }

  #[test]
  fn busy_player_defers_without_consuming_the_hour() {
    let mut trigger = trigger();
    assert_eq!(trigger.poll(&hms(10, 0, 0), true), None);
    assert_eq!(trigger.last_chimed_hour(), None);
    assert_eq!(trigger.poll(&hms(10, 0, 1), false), Some(10));
  }
}
