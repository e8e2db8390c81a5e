//! Stroke payload decoding: pure bit permutations from device frames to
//! [`Chord`]s.

use stenod_chord::{Chord, Key};

pub const STENURA_FRAME_LEN: usize = 4;
pub const GEMINI_FRAME_LEN: usize = 6;

/// Framing marker carried in the top two bits of every Stenura stroke
/// byte; the low six bits are key flags.
const STENURA_MARKER: u8 = 0xC0;

/// Key carried by each Stenura bit, per byte, from bit 5 down to bit 0.
/// The first slot of byte 0 is the steno mark, which does not map to a
/// key.
const STENURA_KEYS: [[Option<Key>; 6]; 4] = [
    [
        None, // steno mark
        Some(Key::Number),
        Some(Key::LeftS),
        Some(Key::LeftT),
        Some(Key::LeftK),
        Some(Key::LeftP),
    ],
    [
        Some(Key::LeftW),
        Some(Key::LeftH),
        Some(Key::LeftR),
        Some(Key::A),
        Some(Key::O),
        Some(Key::Star),
    ],
    [
        Some(Key::E),
        Some(Key::U),
        Some(Key::RightF),
        Some(Key::RightR),
        Some(Key::RightP),
        Some(Key::RightB),
    ],
    [
        Some(Key::RightL),
        Some(Key::RightG),
        Some(Key::RightT),
        Some(Key::RightS),
        Some(Key::RightD),
        Some(Key::RightZ),
    ],
];

/// Decode one 4-byte Stenura stroke frame. Bytes whose framing marker is
/// not intact contribute no keys, so corrupted padding decodes to the
/// empty chord rather than phantom strokes.
pub fn decode_stenura(frame: &[u8; STENURA_FRAME_LEN]) -> Chord {
    let mut chord = Chord::EMPTY;
    for (byte_index, &byte) in frame.iter().enumerate() {
        if byte & STENURA_MARKER != STENURA_MARKER {
            continue;
        }
        for (slot, key) in STENURA_KEYS[byte_index].iter().enumerate() {
            let bit = 5 - slot;
            if byte & (1 << bit) != 0 {
                if let Some(key) = key {
                    chord.set(*key);
                }
            }
        }
    }
    chord
}

/// Encode a chord into the documented Stenura byte layout (framing
/// markers set, steno mark clear).
pub fn encode_stenura(chord: Chord) -> [u8; STENURA_FRAME_LEN] {
    let mut frame = [STENURA_MARKER; STENURA_FRAME_LEN];
    for (byte_index, keys) in STENURA_KEYS.iter().enumerate() {
        for (slot, key) in keys.iter().enumerate() {
            if let Some(key) = key {
                if chord.has(*key) {
                    frame[byte_index] |= 1 << (5 - slot);
                }
            }
        }
    }
    frame
}

/// Key carried by each Gemini PR bit, per byte, from bit 6 down to bit 0.
/// The layout follows the Gemini PR convention: `Fn` and the reserved
/// and power slots carry no key; the four star slots and the number-bar
/// slots all fold onto their shared key.
const GEMINI_KEYS: [[Option<Key>; 7]; 6] = [
    [
        None, // Fn
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
    ],
    [
        Some(Key::LeftS),
        Some(Key::LeftS),
        Some(Key::LeftT),
        Some(Key::LeftK),
        Some(Key::LeftP),
        Some(Key::LeftW),
        Some(Key::LeftH),
    ],
    [
        Some(Key::LeftR),
        Some(Key::A),
        Some(Key::O),
        Some(Key::Star),
        Some(Key::Star),
        None, // res1
        None, // res2
    ],
    [
        None, // pwr
        Some(Key::Star),
        Some(Key::Star),
        Some(Key::E),
        Some(Key::U),
        Some(Key::RightF),
        Some(Key::RightR),
    ],
    [
        Some(Key::RightP),
        Some(Key::RightB),
        Some(Key::RightL),
        Some(Key::RightG),
        Some(Key::RightT),
        Some(Key::RightS),
        Some(Key::RightD),
    ],
    [
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::Number),
        Some(Key::RightZ),
    ],
];

/// True when `byte` is a plausible start of a Gemini PR frame: bit 7 is
/// set on the first byte only.
pub fn is_gemini_frame_start(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// Decode one 6-byte Gemini PR frame.
pub fn decode_gemini(frame: &[u8; GEMINI_FRAME_LEN]) -> Chord {
    let mut chord = Chord::EMPTY;
    for (byte_index, &byte) in frame.iter().enumerate() {
        for (slot, key) in GEMINI_KEYS[byte_index].iter().enumerate() {
            let bit = 6 - slot;
            if byte & (1 << bit) != 0 {
                if let Some(key) = key {
                    chord.set(*key);
                }
            }
        }
    }
    chord
}
