//! Chord model: a bit-packed steno stroke with parse/format to and from
//! canonical steno notation.
//!
//! Key order is `#STKPWHRAO*EUFRPBLGTSDZ`. Each chord is 23 independent
//! key bits: the number bar, the left bank (S T K P W H R A O), the star,
//! and the right bank (E U F R P B L G T S D Z).

mod chord;

pub use chord::{Chord, ChordError, Key, NUM_KEYS};
