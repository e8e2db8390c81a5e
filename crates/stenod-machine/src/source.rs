use stenod_chord::Chord;

use crate::error::MachineError;

/// A stream of chords from a steno machine. `read` blocks until the next
/// chord; `Ok(None)` means the machine shut down cleanly.
pub trait ChordSource: Send {
    fn read(&mut self) -> Result<Option<Chord>, MachineError>;
}
