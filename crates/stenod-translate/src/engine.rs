use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stenod_chord::Chord;
use stenod_dict::{Atom, Dictionary};

use crate::sink::Sink;
use crate::translator::{Emit, Translator};
use crate::writer::Writer;

/// Counters surfaced by the daemon's periodic stats log line.
#[derive(Debug, Default)]
pub struct EngineStats {
    strokes: AtomicU64,
    matches: AtomicU64,
    untranslated: AtomicU64,
    undos: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub strokes: u64,
    pub matches: u64,
    pub untranslated: u64,
    pub undos: u64,
}

impl EngineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            strokes: self.strokes.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            untranslated: self.untranslated.load(Ordering::Relaxed),
            undos: self.undos.load(Ordering::Relaxed),
        }
    }
}

/// How the engine routes one translated chord.
enum Action {
    Normal,
    Undo,
    RepeatLastStroke,
    ToggleAsterisk,
    /// `true` forces attachment (remove the space), `false` forces a
    /// space.
    Respace(bool),
}

/// Drives the translator and writer in lockstep: one undo frame and one
/// writer frame per processed stroke, so the undo stroke can pop both.
pub struct Engine<S: Sink> {
    translator: Translator,
    writer: Writer<S>,
    last_chord: Option<Chord>,
    stats: Arc<EngineStats>,
}

impl<S: Sink> Engine<S> {
    pub fn new(dict: Dictionary, sink: S) -> Self {
        Self {
            translator: Translator::new(dict),
            writer: Writer::new(sink),
            last_chord: None,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn sink(&self) -> &S {
        self.writer.sink()
    }

    /// Process one chord from the machine.
    pub fn process(&mut self, chord: Chord) -> io::Result<()> {
        self.stats.strokes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%chord, "stroke");
        self.process_inner(chord, 0)
    }

    fn process_inner(&mut self, chord: Chord, depth: u8) -> io::Result<()> {
        let translation = self.translator.translate(chord);

        let action = match &translation.emit {
            Emit::Node(node) => {
                let value = self
                    .translator
                    .dictionary()
                    .value(*node)
                    .expect("emitted node carries a value");
                match value.atoms() {
                    [Atom::Undo] => Action::Undo,
                    [Atom::RepeatLastStroke] => Action::RepeatLastStroke,
                    [Atom::ToggleAsterisk] => Action::ToggleAsterisk,
                    [Atom::InsertSpaceBetweenLastStrokes] => Action::Respace(false),
                    [Atom::RemoveSpaceBetweenLastStrokes] => Action::Respace(true),
                    _ => Action::Normal,
                }
            }
            _ => Action::Normal,
        };

        match action {
            Action::Normal => {
                match &translation.emit {
                    Emit::Node(_) => {
                        self.stats.matches.fetch_add(1, Ordering::Relaxed);
                    }
                    Emit::Untranslated(_) => {
                        self.stats.untranslated.fetch_add(1, Ordering::Relaxed);
                    }
                    Emit::None => {}
                }
                self.writer
                    .apply(&translation, self.translator.dictionary())?;
                self.last_chord = Some(chord);
            }
            Action::Undo => {
                self.stats.undos.fetch_add(1, Ordering::Relaxed);
                // Pop two frames: the undo stroke's own (it contributes
                // nothing and never reached the writer), then the stroke
                // being undone, replayed on both translator and writer.
                self.translator.undo_last();
                if self.translator.undo_last().is_some() {
                    self.writer.undo_last()?;
                }
            }
            Action::RepeatLastStroke => {
                self.translator.undo_last();
                if let Some(previous) = self.last_chord {
                    if depth == 0 {
                        self.process_inner(previous, depth + 1)?;
                    }
                }
            }
            Action::ToggleAsterisk => {
                self.translator.undo_last();
                if let Some(previous) = self.last_chord {
                    if depth == 0 {
                        if self.translator.undo_last().is_some() {
                            self.writer.undo_last()?;
                        }
                        self.process_inner(previous.toggled_star(), depth + 1)?;
                    }
                }
            }
            Action::Respace(attach) => {
                self.translator.undo_last();
                if let Some(previous) = self.last_chord {
                    if depth == 0 {
                        if self.translator.undo_last().is_some() {
                            self.writer.undo_last()?;
                        }
                        self.writer.set_force_attach(attach);
                        self.process_inner(previous, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::WriteBuffer;
    use stenod_dict::load_json_str;

    fn chord(s: &str) -> Chord {
        Chord::parse(s).unwrap()
    }

    fn engine(json: &str) -> Engine<WriteBuffer> {
        let mut dict = Dictionary::new();
        load_json_str(&mut dict, json).unwrap();
        Engine::new(dict, WriteBuffer::new())
    }

    fn feed(engine: &mut Engine<WriteBuffer>, strokes: &[&str]) -> Vec<String> {
        strokes
            .iter()
            .map(|s| {
                engine.process(chord(s)).unwrap();
                engine.sink().as_str().to_string()
            })
            .collect()
    }

    #[test]
    fn scenario_branching_undo_progression() {
        let mut e = engine(
            r#"{ "S": "Batata", "T": "Tomate", "S/T/K": "Cebola", "*": "=undo" }"#,
        );
        let progression = feed(&mut e, &["S", "T", "K", "*", "*", "*", "*"]);
        assert_eq!(
            progression,
            [
                " Batata",
                " Batata Tomate",
                " Cebola",
                " Batata Tomate",
                " Batata",
                "",
                "",
            ]
        );
        assert_eq!(e.sink().underflows(), 0);
    }

    #[test]
    fn scenario_undo_of_untranslated_stroke() {
        let mut e = engine(r#"{ "*": "=undo" }"#);
        let progression = feed(&mut e, &["S", "*"]);
        assert_eq!(progression, ["S-", ""]);
        assert_eq!(e.sink().underflows(), 0);
    }

    #[test]
    fn scenario_longer_match_replaces_shorter() {
        let mut e = engine(
            r#"{ "H": "Cebola", "K": "Chocolate", "P": "Pimenta", "*": "=undo", "T/P/H": "Tomate" }"#,
        );
        let progression = feed(&mut e, &["T", "P", "H"]);
        assert_eq!(progression, ["", " Pimenta", " Tomate"]);
        assert_eq!(e.sink().underflows(), 0);
    }

    #[test]
    fn undo_empties_translator_state() {
        let mut e = engine(
            r#"{ "S": "Batata", "T": "Tomate", "S/T/K": "Cebola", "*": "=undo" }"#,
        );
        feed(&mut e, &["S", "T", "K", "*", "*", "*", "*"]);
        assert!(e.translator().branches().is_empty());
        assert_eq!(e.translator().undo_depth(), 0);
    }

    #[test]
    fn undo_with_empty_history_is_noop() {
        let mut e = engine(r#"{ "*": "=undo" }"#);
        let progression = feed(&mut e, &["*", "*"]);
        assert_eq!(progression, ["", ""]);
        assert_eq!(e.sink().underflows(), 0);
    }

    #[test]
    fn affixes_attach_across_strokes() {
        let mut e = engine(r#"{ "WAUBG": "walk", "-G": "{^ing}", "*": "=undo" }"#);
        let progression = feed(&mut e, &["WAUBG", "-G", "*"]);
        assert_eq!(progression, [" walk", " walking", " walk"]);
    }

    #[test]
    fn capitalization_survives_undo() {
        let mut e = engine(
            r#"{ "KPA": "{-|}", "H-L": "hello", "*": "=undo" }"#,
        );
        let progression = feed(&mut e, &["KPA", "H-L", "*", "H-L"]);
        // Undoing the capitalized word restores the pending directive.
        assert_eq!(progression, ["", " Hello", "", " Hello"]);
    }

    #[test]
    fn repeat_last_stroke_macro() {
        let mut e = engine(r##"{ "KAT": "cat", "#*": "{*+}" }"##);
        let progression = feed(&mut e, &["KAT", "#*"]);
        assert_eq!(progression, [" cat", " cat cat"]);
    }

    #[test]
    fn toggle_asterisk_macro() {
        let mut e = engine(r##"{ "KAT": "cat", "KA*T": "kitten", "#EU": "{*}" }"##);
        let progression = feed(&mut e, &["KAT", "#EU"]);
        assert_eq!(progression, [" cat", " kitten"]);
    }

    #[test]
    fn respace_macros() {
        let mut e = engine(
            r#"{ "A": "alpha", "PW-": "beta", "TK-FPS": "{*!}", "TK-EPS": "{*?}" }"#,
        );
        let progression = feed(&mut e, &["A", "PW-", "TK-FPS", "TK-EPS"]);
        assert_eq!(
            progression,
            [" alpha", " alpha beta", " alphabeta", " alpha beta"]
        );
    }

    #[test]
    fn glue_strokes_fingerspell() {
        let mut e = engine(r#"{ "A*": "{&A}", "PW*": "{&B}", "KAT": "cat" }"#);
        let progression = feed(&mut e, &["A*", "PW*", "KAT"]);
        assert_eq!(progression, [" A", " AB", " AB cat"]);
    }

    #[test]
    fn stats_count_stroke_kinds() {
        let mut e = engine(r#"{ "S": "Batata", "*": "=undo" }"#);
        feed(&mut e, &["S", "-Z", "*"]);
        let snapshot = e.stats().snapshot();
        assert_eq!(snapshot.strokes, 3);
        assert_eq!(snapshot.matches, 1);
        assert_eq!(snapshot.untranslated, 1);
        assert_eq!(snapshot.undos, 1);
    }
}
