use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stenod_chord::Chord;

use crate::error::MachineError;
use crate::source::ChordSource;
use crate::stroke::{decode_gemini, is_gemini_frame_start, GEMINI_FRAME_LEN};
use crate::transport::Transport;

/// Gemini PR reader: a plain byte stream of 6-byte frames, bit 7 set on
/// the first byte only. No request/response traffic, so no worker
/// threads; the driver blocks directly on `read`.
pub struct GeminiMachine {
    transport: Arc<dyn Transport>,
    stop: Arc<AtomicBool>,
}

impl GeminiMachine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

impl ChordSource for GeminiMachine {
    fn read(&mut self) -> Result<Option<Chord>, MachineError> {
        let mut frame = [0u8; GEMINI_FRAME_LEN];
        'resync: loop {
            if self.stopped() {
                return Ok(None);
            }

            // Find a frame start, skipping noise bytes.
            let mut byte = [0u8; 1];
            if self.transport.read(&mut byte)? == 0 {
                continue;
            }
            if !is_gemini_frame_start(byte[0]) {
                continue;
            }
            frame[0] = byte[0];

            let mut filled = 1;
            while filled < GEMINI_FRAME_LEN {
                if self.stopped() {
                    return Ok(None);
                }
                match self.transport.read(&mut frame[filled..])? {
                    0 => continue,
                    n => filled += n,
                }
            }
            // A header bit inside the body means we lost sync; drop the
            // frame and hunt for the next start byte.
            if frame[1..].iter().any(|&b| b & 0x80 != 0) {
                tracing::warn!("desynchronized Gemini frame dropped");
                continue 'resync;
            }

            let chord = decode_gemini(&frame);
            if chord.is_empty() {
                continue;
            }
            tracing::debug!(%chord, "stroke from machine");
            return Ok(Some(chord));
        }
    }
}
