use stenod_chord::ChordError;
use thiserror::Error;

use crate::value::ValueError;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("chord parse error: {0}")]
    Chord(#[from] ChordError),

    #[error("value parse error: {0}")]
    Value(#[from] ValueError),

    #[error("empty chord path")]
    EmptyPath,

    #[error("invalid dictionary JSON: {0}")]
    InvalidJson(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
