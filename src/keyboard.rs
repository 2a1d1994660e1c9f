//! Note-state model behind the on-screen keyboard.
//!
//! The model is fed from two directions: the user plays it (`press` /
//! `release`) and incoming hardware events are mirrored into it (`apply`).
//! Both return the note changes they caused; it is up to the caller to tag
//! those changes with the right provenance.

use crate::midi::{MessageKind, MidiEvent};

const CHANNELS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteChange {
    On { channel: u8, note: u8, velocity: u8 },
    Off { channel: u8, note: u8 },
}

#[derive(Debug, Default)]
pub struct KeyboardState {
    held: [u128; CHANNELS], // bit n set ⇒ note n is down
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_note_on(&self, channel: u8, note: u8) -> bool {
        match slot(channel) {
            Some(ch) => self.held[ch] & bit(note) != 0,
            None => false,
        }
    }

    pub fn held_notes(&self, channel: u8) -> Vec<u8> {
        (0..128u8)
            .filter(|&note| self.is_note_on(channel, note))
            .collect()
    }

    /// Every press is a note-on, held or not; only releases depend on state.
    pub fn press(&mut self, channel: u8, note: u8, velocity: u8) -> Option<NoteChange> {
        let ch = slot(channel)?;
        if note > 127 {
            return None;
        }
        self.held[ch] |= bit(note);
        Some(NoteChange::On {
            channel,
            note,
            velocity,
        })
    }

    pub fn release(&mut self, channel: u8, note: u8) -> Option<NoteChange> {
        let ch = slot(channel)?;
        if note > 127 || self.held[ch] & bit(note) == 0 {
            return None;
        }
        self.held[ch] &= !bit(note);
        Some(NoteChange::Off { channel, note })
    }

    pub fn release_all(&mut self, channel: u8) -> Vec<NoteChange> {
        self.held_notes(channel)
            .into_iter()
            .filter_map(|note| self.release(channel, note))
            .collect()
    }

    /// Mirror an incoming event into the note state.
    pub fn apply(&mut self, event: &MidiEvent) -> Vec<NoteChange> {
        match event.kind() {
            MessageKind::NoteOn {
                channel,
                note,
                velocity,
            } => self.press(channel, note, velocity).into_iter().collect(),
            MessageKind::NoteOff { channel, note, .. } => {
                self.release(channel, note).into_iter().collect()
            }
            MessageKind::AllNotesOff { channel } => self.release_all(channel),
            _ => Vec::new(),
        }
    }

    /// One character per key in `low..=high`: `|` white, `'` black, `#` held.
    pub fn render(&self, channel: u8, low: u8, high: u8) -> String {
        (low..=high.min(127))
            .map(|note| {
                if self.is_note_on(channel, note) {
                    '#'
                } else if matches!(note % 12, 1 | 3 | 6 | 8 | 10) {
                    '\''
                } else {
                    '|'
                }
            })
            .collect()
    }
}

fn slot(channel: u8) -> Option<usize> {
    (1..=CHANNELS as u8)
        .contains(&channel)
        .then(|| channel as usize - 1)
}

fn bit(note: u8) -> u128 {
    1u128 << (note & 0x7F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presses_always_report_but_releases_need_a_held_note() {
        let mut kb = KeyboardState::new();
        assert_eq!(
            kb.press(1, 60, 90),
            Some(NoteChange::On {
                channel: 1,
                note: 60,
                velocity: 90
            })
        );
        assert_eq!(
            kb.press(1, 60, 70),
            Some(NoteChange::On {
                channel: 1,
                note: 60,
                velocity: 70
            })
        );
        assert!(kb.is_note_on(1, 60));
        assert!(!kb.is_note_on(2, 60));

        assert_eq!(kb.release(1, 60), Some(NoteChange::Off { channel: 1, note: 60 }));
        assert_eq!(kb.release(1, 60), None);
    }

    #[test]
    fn invalid_channels_are_ignored() {
        let mut kb = KeyboardState::new();
        assert_eq!(kb.press(0, 60, 90), None);
        assert_eq!(kb.press(17, 60, 90), None);
        assert_eq!(kb.press(1, 128, 90), None);
        assert!(!kb.is_note_on(0, 60));
    }

    #[test]
    fn apply_mirrors_incoming_notes() {
        let mut kb = KeyboardState::new();
        let on = MidiEvent::new(&[0x91, 64, 80], 0.0, "hw");
        assert_eq!(kb.apply(&on).len(), 1);
        assert!(kb.is_note_on(2, 64));

        // Releasing a note that is not down changes nothing.
        let stray = MidiEvent::new(&[0x81, 65, 0], 0.0, "hw");
        assert!(kb.apply(&stray).is_empty());

        let program = MidiEvent::new(&[0xC1, 3], 0.0, "hw");
        assert!(kb.apply(&program).is_empty());
    }

    #[test]
    fn all_notes_off_releases_the_channel() {
        let mut kb = KeyboardState::new();
        kb.press(1, 60, 90);
        kb.press(1, 64, 90);
        kb.press(2, 67, 90);

        let changes = kb.apply(&MidiEvent::new(&[0xB0, 123, 0], 0.0, "hw"));
        assert_eq!(
            changes,
            [
                NoteChange::Off { channel: 1, note: 60 },
                NoteChange::Off { channel: 1, note: 64 },
            ]
        );
        assert!(kb.held_notes(1).is_empty());
        assert_eq!(kb.held_notes(2), [67]);
    }

    #[test]
    fn render_marks_held_keys() {
        let mut kb = KeyboardState::new();
        kb.press(1, 62, 90);
        assert_eq!(kb.render(1, 60, 71), "|'#'||'|'|'|");
    }
}
