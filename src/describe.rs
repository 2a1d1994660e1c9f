//! Human-readable descriptions of MIDI messages.

use crate::midi::{MessageKind, MidiEvent};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Octave number printed for note 60.
pub const MIDDLE_C_OCTAVE: i32 = 3;

pub fn describe(event: &MidiEvent) -> String {
    match event.kind() {
        MessageKind::NoteOn { note, .. } => format!("Note on {}", note_name(note)),
        MessageKind::NoteOff { note, .. } => format!("Note off {}", note_name(note)),
        MessageKind::ProgramChange { program, .. } => format!("Program change {program}"),
        MessageKind::PitchWheel { value, .. } => format!("Pitch wheel {value}"),
        MessageKind::Aftertouch { note, value, .. } => {
            format!("After touch {}: {value}", note_name(note))
        }
        MessageKind::ChannelPressure { value, .. } => format!("Channel pressure {value}"),
        MessageKind::AllNotesOff { .. } => "All notes off".to_string(),
        MessageKind::AllSoundOff { .. } => "All sound off".to_string(),
        MessageKind::Meta => "Meta event".to_string(),
        MessageKind::Controller {
            controller, value, ..
        } => {
            let name = controller_name(controller)
                .map(str::to_string)
                .unwrap_or_else(|| format!("[{controller}]"));
            format!("Controller {name}: {value}")
        }
        MessageKind::Raw => hex_dump(event.bytes()),
    }
}

/// `60` → `"C3"`, sharps only.
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 + (MIDDLE_C_OCTAVE - 5);
    format!("{}{octave}", NOTE_NAMES[note as usize % 12])
}

pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn controller_name(controller: u8) -> Option<&'static str> {
    let name = match controller {
        0 => "Bank Select",
        1 => "Modulation Wheel (coarse)",
        2 => "Breath controller (coarse)",
        4 => "Foot Pedal (coarse)",
        5 => "Portamento Time (coarse)",
        6 => "Data Entry (coarse)",
        7 => "Volume (coarse)",
        8 => "Balance (coarse)",
        10 => "Pan position (coarse)",
        11 => "Expression (coarse)",
        12 => "Effect Control 1 (coarse)",
        13 => "Effect Control 2 (coarse)",
        16 => "General Purpose Slider 1",
        17 => "General Purpose Slider 2",
        18 => "General Purpose Slider 3",
        19 => "General Purpose Slider 4",
        32 => "Bank Select (fine)",
        33 => "Modulation Wheel (fine)",
        34 => "Breath controller (fine)",
        36 => "Foot Pedal (fine)",
        37 => "Portamento Time (fine)",
        38 => "Data Entry (fine)",
        39 => "Volume (fine)",
        40 => "Balance (fine)",
        42 => "Pan position (fine)",
        43 => "Expression (fine)",
        44 => "Effect Control 1 (fine)",
        45 => "Effect Control 2 (fine)",
        64 => "Hold Pedal (on/off)",
        65 => "Portamento (on/off)",
        66 => "Sustenuto Pedal (on/off)",
        67 => "Soft Pedal (on/off)",
        68 => "Legato Pedal (on/off)",
        69 => "Hold 2 Pedal (on/off)",
        70 => "Sound Variation",
        71 => "Sound Timbre",
        72 => "Sound Release Time",
        73 => "Sound Attack Time",
        74 => "Sound Brightness",
        75 => "Sound Control 6",
        76 => "Sound Control 7",
        77 => "Sound Control 8",
        78 => "Sound Control 9",
        79 => "Sound Control 10",
        80 => "General Purpose Button 1 (on/off)",
        81 => "General Purpose Button 2 (on/off)",
        82 => "General Purpose Button 3 (on/off)",
        83 => "General Purpose Button 4 (on/off)",
        91 => "Reverb Level",
        92 => "Tremolo Level",
        93 => "Chorus Level",
        94 => "Celeste Level",
        95 => "Phaser Level",
        96 => "Data Button increment",
        97 => "Data Button decrement",
        98 => "Non-registered Parameter (fine)",
        99 => "Non-registered Parameter (coarse)",
        100 => "Registered Parameter (fine)",
        101 => "Registered Parameter (coarse)",
        120 => "All Sound Off",
        121 => "All Controllers Off",
        122 => "Local Keyboard (on/off)",
        123 => "All Notes Off",
        124 => "Omni Mode Off",
        125 => "Omni Mode On",
        126 => "Mono Operation",
        127 => "Poly Operation",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe_bytes(bytes: &[u8]) -> String {
        describe(&MidiEvent::new(bytes, 0.0, "test"))
    }

    #[test]
    fn note_names_put_middle_c_in_octave_three() {
        assert_eq!(note_name(60), "C3");
        assert_eq!(note_name(61), "C#3");
        assert_eq!(note_name(0), "C-2");
        assert_eq!(note_name(127), "G8");
    }

    #[test]
    fn describes_each_message_kind() {
        assert_eq!(describe_bytes(&[0x90, 60, 100]), "Note on C3");
        assert_eq!(describe_bytes(&[0x80, 69, 0]), "Note off A3");
        assert_eq!(describe_bytes(&[0x90, 69, 0]), "Note off A3");
        assert_eq!(describe_bytes(&[0xC0, 12]), "Program change 12");
        assert_eq!(describe_bytes(&[0xE0, 0, 64]), "Pitch wheel 8192");
        assert_eq!(describe_bytes(&[0xA0, 62, 33]), "After touch D3: 33");
        assert_eq!(describe_bytes(&[0xD0, 77]), "Channel pressure 77");
        assert_eq!(describe_bytes(&[0xB0, 123, 0]), "All notes off");
        assert_eq!(describe_bytes(&[0xB0, 120, 0]), "All sound off");
        assert_eq!(describe_bytes(&[0xFF, 0x2F, 0x00]), "Meta event");
    }

    #[test]
    fn controllers_use_the_name_table_with_numeric_fallback() {
        assert_eq!(describe_bytes(&[0xB0, 7, 100]), "Controller Volume (coarse): 100");
        assert_eq!(describe_bytes(&[0xB0, 64, 127]), "Controller Hold Pedal (on/off): 127");
        assert_eq!(describe_bytes(&[0xB0, 119, 5]), "Controller [119]: 5");
        assert_eq!(describe_bytes(&[0xB0, 3, 1]), "Controller [3]: 1");
    }

    #[test]
    fn unclassified_messages_dump_as_hex() {
        assert_eq!(describe_bytes(&[0xF0, 0x7E, 0x7F, 0xF7]), "f0 7e 7f f7");
        assert_eq!(describe_bytes(&[0xFE]), "fe");
        assert_eq!(describe_bytes(&[]), "");
    }
}
