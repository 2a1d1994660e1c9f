//! MIDI events as they travel through the router, plus classification of
//! their raw bytes.

/// Source label used for events played on the virtual keyboard.
pub const KEYBOARD_SOURCE: &str = "On-Screen Keyboard";

const CC_ALL_SOUND_OFF: u8 = 120;
const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Clone, PartialEq)]
pub struct MidiEvent {
    bytes: Vec<u8>,
    timestamp: f64,
    source: String,
}

/// What a message means. Channels are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    PitchWheel { channel: u8, value: u16 },
    Aftertouch { channel: u8, note: u8, value: u8 },
    ChannelPressure { channel: u8, value: u8 },
    AllNotesOff { channel: u8 },
    AllSoundOff { channel: u8 },
    Meta,
    Controller { channel: u8, controller: u8, value: u8 },
    Raw,
}

impl MidiEvent {
    pub fn new(bytes: &[u8], timestamp: f64, source: impl Into<String>) -> Self {
        Self {
            bytes: bytes.to_vec(),
            timestamp,
            source: source.into(),
        }
    }

    /// `channel` is 1-based; out-of-range data bytes are masked to 7 bits.
    pub fn note_on(channel: u8, note: u8, velocity: u8, timestamp: f64, source: &str) -> Self {
        Self::new(
            &[0x90 | channel_nibble(channel), note & 0x7F, velocity & 0x7F],
            timestamp,
            source,
        )
    }

    pub fn note_off(channel: u8, note: u8, timestamp: f64, source: &str) -> Self {
        Self::new(
            &[0x80 | channel_nibble(channel), note & 0x7F, 0],
            timestamp,
            source,
        )
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> MessageKind {
        classify(&self.bytes)
    }
}

fn channel_nibble(channel: u8) -> u8 {
    channel.clamp(1, 16) - 1
}

// ─────────────────── helpers ─────────────────────────────────────────────────

fn classify(msg: &[u8]) -> MessageKind {
    let Some(&status) = msg.first() else {
        return MessageKind::Raw;
    };
    let channel = (status & 0x0F) + 1;

    match status & 0xF0 {
        0x90 if msg.len() >= 3 && msg[2] > 0 => MessageKind::NoteOn {
            channel,
            note: msg[1],
            velocity: msg[2],
        },
        0x80 | 0x90 if msg.len() >= 3 => MessageKind::NoteOff {
            channel,
            note: msg[1],
            velocity: msg[2],
        },
        0xC0 if msg.len() >= 2 => MessageKind::ProgramChange {
            channel,
            program: msg[1],
        },
        0xE0 if msg.len() >= 3 => MessageKind::PitchWheel {
            channel,
            value: ((msg[2] as u16) << 7) | msg[1] as u16, // 14-bit
        },
        0xA0 if msg.len() >= 3 => MessageKind::Aftertouch {
            channel,
            note: msg[1],
            value: msg[2],
        },
        0xD0 if msg.len() >= 2 => MessageKind::ChannelPressure {
            channel,
            value: msg[1],
        },
        0xB0 if msg.len() >= 3 => match msg[1] {
            CC_ALL_NOTES_OFF => MessageKind::AllNotesOff { channel },
            CC_ALL_SOUND_OFF => MessageKind::AllSoundOff { channel },
            controller => MessageKind::Controller {
                channel,
                controller,
                value: msg[2],
            },
        },
        0xF0 if status == 0xFF && msg.len() >= 2 => MessageKind::Meta,
        _ => MessageKind::Raw, // SysEx, realtime, truncated messages
    }
}
