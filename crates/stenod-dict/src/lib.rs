//! Steno dictionary: the value mini-language (attachment affixes,
//! capitalization directives, glue, currency templates, conditionals,
//! macros) and the chord trie it hangs from.

mod error;
mod loader;
mod trie;
mod value;

pub use error::DictionaryError;
pub use loader::{load_json_file, load_json_str, LoadStats};
pub use trie::{Dictionary, NodeId};
pub use value::{Atom, DictionaryValue, Span, ValueError};
