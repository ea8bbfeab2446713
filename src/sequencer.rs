//! Non-blocking melody sequencer, polled from the main loop.
//!
//! Two axes of state:
//! - the chime phase (`None → Melody → PauseBeforeStrikes → Strikes → Complete`),
//!   advanced by the pure transition function [`Cursor::advance`];
//! - the playback state (`idle`, `playing_note`, `gap`), a `statig` machine
//!   fed `Start` and `Poll` events.
//!
//! Durations are checked by comparing elapsed milliseconds, never by counting
//! polls, so a late poll only delays a transition.

use statig::prelude::*;

use crate::config::{GapKind, GapTable};
use crate::melody::{Note, HOUR_STRIKE, PHRASE_LEN, WESTMINSTER};
use crate::oscillator::{AnalogOut, ToneGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChimePhase {
  None,
  Melody,
  PauseBeforeStrikes,
  Strikes,
  Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
  Idle,
  PlayingNote,
  Gap,
}

/// What to do next, as decided by [`Cursor::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
  /// sound the melody note at this index
  Melody(usize),
  /// sound one hour strike
  Strike,
  /// a silence with no preceding note, before the strikes
  Pause,
  /// the chime is over
  Finished,
}

/// Position within a chime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  pub phase: ChimePhase,
  /// count of melody notes already started
  pub sequence_index: usize,
  /// count of strikes already started
  pub strike_index: u8,
  pub strike_count: u8,
}

impl Cursor {
  pub const IDLE: Cursor = Cursor {
    phase: ChimePhase::None,
    sequence_index: 0,
    strike_index: 0,
    strike_count: 0,
  };

  pub const fn start(strike_count: u8) -> Self {
    Cursor { phase: ChimePhase::Melody, strike_count, ..Self::IDLE }
  }

  /// Transition function for the phase axis.
  pub fn advance(self, melody_len: usize) -> (Cursor, Cue) {
    match self.phase {
      ChimePhase::Melody if self.sequence_index < melody_len => (
        Cursor { sequence_index: self.sequence_index + 1, ..self },
        Cue::Melody(self.sequence_index),
      ),
      ChimePhase::Melody => (Cursor { phase: ChimePhase::PauseBeforeStrikes, ..self }, Cue::Pause),
      ChimePhase::PauseBeforeStrikes => {
        Cursor { phase: ChimePhase::Strikes, strike_index: 0, ..self }.advance(melody_len)
      }
      ChimePhase::Strikes if self.strike_index < self.strike_count => (
        Cursor { strike_index: self.strike_index + 1, ..self },
        Cue::Strike,
      ),
      ChimePhase::Strikes => (Cursor { phase: ChimePhase::Complete, ..self }, Cue::Finished),
      ChimePhase::None | ChimePhase::Complete => (self, Cue::Finished),
    }
  }

  /// The silence that follows this position
  pub fn gap_kind(&self, phrase_len: usize) -> GapKind {
    match self.phase {
      ChimePhase::Melody if phrase_len > 0 && self.sequence_index % phrase_len == 0 => GapKind::Phrase,
      ChimePhase::Melody => GapKind::Note,
      ChimePhase::PauseBeforeStrikes => GapKind::PreStrike,
      ChimePhase::Strikes => GapKind::Strike,
      ChimePhase::None | ChimePhase::Complete => GapKind::Note,
    }
  }
}

pub enum Event {
  Start { strikes: u8, now_ms: u64 },
  Poll { now_ms: u64 },
}

/// Shared storage of the playback state machine.
pub struct Sequencer {
  tone: &'static ToneGenerator,
  out: &'static dyn AnalogOut,
  melody: &'static [Note],
  phrase_len: usize,
  strike: Note,
  gaps: GapTable,
  cursor: Cursor,
  /// start of the current note or gap
  note_start_ms: u64,
  note_duration_ms: u32,
  gap_ms: u32,
}

#[state_machine(initial = "State::idle()", state(derive(Debug, Clone, Copy, PartialEq, Eq)))]
impl Sequencer {
  #[state]
  fn idle(&mut self, event: &Event) -> Response<State> {
    match *event {
      Event::Start { strikes, now_ms } => {
        info!("chime start: {} strikes", strikes);
        self.cursor = Cursor::start(strikes);
        Transition(self.advance(now_ms))
      }
      Event::Poll { now_ms } => {
        if self.cursor.phase == ChimePhase::Complete {
          self.cursor = Cursor::IDLE;
        }
        if let Some(next) = self.reap_failsafe(now_ms) {
          return Transition(next);
        }
        // a tone is sounding although nothing is scheduled
        if self.tone.is_active() && self.elapsed_ms(now_ms) > self.note_duration_ms as u64 {
          warn!("stray tone stopped at {} ms", now_ms);
          return Transition(self.end_note(now_ms));
        }
        Handled
      }
    }
  }

  #[state]
  fn playing_note(&mut self, event: &Event) -> Response<State> {
    match *event {
      Event::Start { .. } => Handled,
      Event::Poll { now_ms } => {
        if let Some(next) = self.reap_failsafe(now_ms) {
          return Transition(next);
        }
        if self.elapsed_ms(now_ms) >= self.note_duration_ms as u64 {
          Transition(self.end_note(now_ms))
        }
        else {
          Handled
        }
      }
    }
  }

  #[state]
  fn gap(&mut self, event: &Event) -> Response<State> {
    match *event {
      Event::Start { .. } => Handled,
      Event::Poll { now_ms } => {
        if let Some(next) = self.reap_failsafe(now_ms) {
          return Transition(next);
        }
        if self.elapsed_ms(now_ms) >= self.gap_ms as u64 {
          Transition(self.advance(now_ms))
        }
        else {
          Handled
        }
      }
    }
  }
}

impl Sequencer {
  pub fn new(
    tone: &'static ToneGenerator,
    out: &'static dyn AnalogOut,
    gaps: GapTable,
    melody: &'static [Note],
    phrase_len: usize,
    strike: Note,
  ) -> Self {
    Self {
      tone,
      out,
      melody,
      phrase_len,
      strike,
      gaps,
      cursor: Cursor::IDLE,
      note_start_ms: 0,
      note_duration_ms: 0,
      gap_ms: 0,
    }
  }

  fn elapsed_ms(&self, now_ms: u64) -> u64 {
    now_ms.saturating_sub(self.note_start_ms)
  }

  /// A note ended by the sample-count failsafe: resynchronize by entering a gap.
  fn reap_failsafe(&mut self, now_ms: u64) -> Option<State> {
    if !self.tone.take_completed() {
      return None;
    }
    debug!("failsafe ended note at {} ms", now_ms);
    Some(self.end_note(now_ms))
  }

  /// Silence after a note. After the last melody note the pause before the
  /// strikes takes the place of the phrase gap.
  fn end_note(&mut self, now_ms: u64) -> State {
    if self.cursor.phase == ChimePhase::Melody && self.cursor.sequence_index >= self.melody.len() {
      let (cursor, _) = self.cursor.advance(self.melody.len());
      info!("chime phase {}", cursor.phase);
      self.cursor = cursor;
    }
    self.enter_gap(now_ms)
  }

  fn enter_gap(&mut self, now_ms: u64) -> State {
    self.tone.stop_note(self.out);
    // a completion raised between the deadline and the stop is stale
    self.tone.take_completed();
    self.note_start_ms = now_ms;
    self.gap_ms = self.gaps.duration_ms(self.cursor.gap_kind(self.phrase_len));
    State::gap()
  }

  fn start_note(&mut self, note: Note, now_ms: u64) {
    trace!("note {} Hz for {} ms", note.frequency_hz, note.duration_ms);
    self.tone.start_note(note.frequency_hz as u32, note.duration_ms as u32);
    self.note_start_ms = now_ms;
    self.note_duration_ms = note.duration_ms as u32;
  }

  /// Move to the next sound of the chime, skipping notes that cannot be played.
  fn advance(&mut self, now_ms: u64) -> State {
    loop {
      let (cursor, cue) = self.cursor.advance(self.melody.len());
      if cursor.phase != self.cursor.phase {
        info!("chime phase {}", cursor.phase);
      }
      self.cursor = cursor;
      let note = match cue {
        Cue::Melody(index) => self.melody[index],
        Cue::Strike => self.strike,
        Cue::Pause => return self.enter_gap(now_ms),
        Cue::Finished => {
          self.tone.stop_note(self.out);
          return State::idle();
        }
      };
      if !note.is_playable() {
        warn!("skipping unplayable note {} Hz {} ms", note.frequency_hz, note.duration_ms);
        continue;
      }
      self.start_note(note, now_ms);
      return State::playing_note();
    }
  }
}

/// Plays the hour melody followed by hour strikes, one poll at a time.
pub struct MelodySequencer {
  machine: StateMachine<Sequencer>,
}

impl MelodySequencer {
  /// Westminster quarters and the hour bell
  pub fn new(tone: &'static ToneGenerator, out: &'static dyn AnalogOut, gaps: GapTable) -> Self {
    Self::with_melody(tone, out, gaps, &WESTMINSTER, PHRASE_LEN, HOUR_STRIKE)
  }

  pub fn with_melody(
    tone: &'static ToneGenerator,
    out: &'static dyn AnalogOut,
    gaps: GapTable,
    melody: &'static [Note],
    phrase_len: usize,
    strike: Note,
  ) -> Self {
    let storage = Sequencer::new(tone, out, gaps, melody, phrase_len, strike);
    Self { machine: storage.state_machine() }
  }

  /// Start a chime. Ignored while one is already playing.
  pub fn start_chime_sequence(&mut self, strikes: u8, now_ms: u64) {
    self.machine.handle(&Event::Start { strikes, now_ms });
  }

  /// Advance playback; call at least every ~10 ms.
  pub fn update(&mut self, now_ms: u64) {
    self.machine.handle(&Event::Poll { now_ms });
  }

  pub fn is_playing(&self) -> bool {
    self.playback_state() != PlaybackState::Idle
  }

  pub fn playback_state(&self) -> PlaybackState {
    match self.machine.state() {
      State::Idle { .. } => PlaybackState::Idle,
      State::PlayingNote { .. } => PlaybackState::PlayingNote,
      State::Gap { .. } => PlaybackState::Gap,
    }
  }

  pub fn phase(&self) -> ChimePhase {
    self.machine.cursor.phase
  }

  pub fn cursor(&self) -> Cursor {
    self.machine.cursor
  }
}
