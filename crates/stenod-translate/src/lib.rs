//! The translator: turns a stream of chords into writes and retractions
//! against an output sink, with an undo history deep enough to reverse
//! any prior decision.

mod engine;
mod formatter;
mod sink;
mod translator;
mod writer;

pub use engine::{Engine, EngineStats, StatsSnapshot};
pub use formatter::{FormatState, Formatter, Rendered, RetroOp};
pub use sink::{Sink, WriteBuffer, DELETE};
pub use translator::{Emit, Translation, Translator, UndoFrame};
pub use writer::Writer;
