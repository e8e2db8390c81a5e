//! Machine protocol clients: the Stenura request/response serial
//! protocol with its background reader, retrier, and poller threads, and
//! the simpler Gemini PR stream reader.

mod client;
mod crc;
mod error;
mod gemini;
mod protocol;
mod queue;
mod serial;
mod source;
mod stroke;
mod transport;

pub use client::{MachineConfig, SessionEvent, StenturaClient};
pub use crc::crc16;
pub use error::MachineError;
pub use gemini::GeminiMachine;
pub use protocol::{Action, Request, Response, SOH};
pub use queue::ChordQueue;
pub use serial::SerialPort;
pub use source::ChordSource;
pub use stroke::{decode_gemini, decode_stenura, encode_stenura, GEMINI_FRAME_LEN, STENURA_FRAME_LEN};
pub use transport::Transport;
