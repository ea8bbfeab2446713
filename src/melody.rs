//! Compiled-in chime melodies.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Note {
  pub frequency_hz: u16,
  pub duration_ms: u16,
}

impl Note {
  pub const fn new(frequency_hz: u16, duration_ms: u16) -> Self {
    Self { frequency_hz, duration_ms }
  }

  /// Zero pitch or zero length cannot be sounded; the sequencer skips such notes.
  pub const fn is_playable(&self) -> bool {
    self.frequency_hz > 0 && self.duration_ms > 0
  }
}

/// True when every note of `melody` can be sounded and fits below Nyquist.
pub const fn is_valid_melody(melody: &[Note], sample_rate_hz: u32) -> bool {
  let mut i = 0;
  while i < melody.len() {
    let note = melody[i];
    if !note.is_playable() || (note.frequency_hz as u32) * 2 >= sample_rate_hz {
      return false;
    }
    i += 1;
  }
  true
}

pub type NoteFrequencyHz = u16;

pub const FREQ_E3: NoteFrequencyHz = 165;
pub const FREQ_B3: NoteFrequencyHz = 247;
pub const FREQ_E4: NoteFrequencyHz = 330;
pub const FREQ_F4_SHARP: NoteFrequencyHz = 370;
pub const FREQ_G4_SHARP: NoteFrequencyHz = 415;

pub const QUARTER_MS: u16 = 600;
pub const HALF_MS: u16 = 1200;
pub const STRIKE_MS: u16 = 800;

const GS4: Note = Note::new(FREQ_G4_SHARP, QUARTER_MS);
const FS4: Note = Note::new(FREQ_F4_SHARP, QUARTER_MS);
const E4: Note = Note::new(FREQ_E4, QUARTER_MS);
const E4_LONG: Note = Note::new(FREQ_E4, HALF_MS);
const B3_LONG: Note = Note::new(FREQ_B3, HALF_MS);

/// Notes per phrase of the Westminster quarters
pub const PHRASE_LEN: usize = 4;

/// Westminster Quarters as rung before the hour, Big Ben style:
/// three quarter notes and one long note per phrase.
pub const WESTMINSTER: [Note; 16] = [
  GS4, FS4, E4, B3_LONG,
  E4, GS4, FS4, B3_LONG,
  E4, FS4, GS4, E4_LONG,
  GS4, E4, FS4, B3_LONG,
];

/// The hour bell, below the melody
pub const HOUR_STRIKE: Note = Note::new(FREQ_E3, STRIKE_MS);

const _: () = assert!(is_valid_melody(&WESTMINSTER, crate::config::SAMPLE_RATE_HZ));
const _: () = assert!(HOUR_STRIKE.is_playable());
const _: () = assert!(WESTMINSTER.len() % PHRASE_LEN == 0);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn westminster_shape() {
    assert_eq!(WESTMINSTER.len(), 16);
    for phrase in WESTMINSTER.chunks(PHRASE_LEN) {
      // three short notes, then one longer
      assert!(phrase[..3].iter().all(|n| n.duration_ms == QUARTER_MS));
      assert!(phrase[3].duration_ms > QUARTER_MS);
    }
    let mut pitches: Vec<u16> = WESTMINSTER.iter().map(|n| n.frequency_hz).collect();
    pitches.sort_unstable();
    pitches.dedup();
    assert_eq!(pitches.len(), 4);
    assert!(pitches.iter().all(|&p| p > HOUR_STRIKE.frequency_hz));
  }

  #[test]
  fn validation_rejects_unplayable_notes() {
    assert!(!is_valid_melody(&[Note::new(0, 100)], 44_000));
    assert!(!is_valid_melody(&[Note::new(440, 0)], 44_000));
    assert!(!is_valid_melody(&[Note::new(22_000, 100)], 44_000));
    assert!(is_valid_melody(&[], 44_000));
    assert!(is_valid_melody(&[HOUR_STRIKE], 44_000));
  }
}
