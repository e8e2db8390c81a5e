use thiserror::Error;

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad CRC on packet seq {seq}")]
    BadCrc { seq: u8 },

    #[error("bad packet length {len}")]
    BadLength { len: u16 },

    #[error("response seq {0} matches no pending request")]
    UnmatchedSeq(u8),

    #[error("request timed out")]
    Timeout,

    #[error("machine connection closed")]
    Closed,
}
