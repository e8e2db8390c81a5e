use std::io;

/// The byte the writer emits to retract one character.
pub const DELETE: u8 = 0x16;

/// Where translated output goes. Bytes are keystrokes to type, except
/// [`DELETE`], which means "delete one character".
pub trait Sink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }
}

/// In-memory sink that honours [`DELETE`] as backspace. Doubles as the
/// reference model for what a well-behaved key injector leaves on
/// screen.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    contents: String,
    underflows: usize,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.contents
    }

    /// Number of deletes that arrived with nothing left to delete.
    pub fn underflows(&self) -> usize {
        self.underflows
    }
}

impl Sink for WriteBuffer {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        // Deletes operate on characters, so the byte stream is decoded
        // back to text before applying them.
        let mut pending = Vec::new();
        let flush = |pending: &mut Vec<u8>, contents: &mut String| {
            if !pending.is_empty() {
                contents.push_str(&String::from_utf8_lossy(pending));
                pending.clear();
            }
        };
        for &byte in bytes {
            if byte == DELETE {
                flush(&mut pending, &mut self.contents);
                if self.contents.pop().is_none() {
                    self.underflows += 1;
                }
            } else {
                pending.push(byte);
            }
        }
        flush(&mut pending, &mut self.contents);
        Ok(())
    }
}
