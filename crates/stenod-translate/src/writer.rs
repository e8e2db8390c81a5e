use std::io;

use regex::Regex;
use stenod_dict::{Dictionary, NodeId};

use crate::formatter::{capitalize_first, lowercase_first, FormatState, Formatter, RetroOp};
use crate::sink::{Sink, DELETE};
use crate::translator::{Emit, Translation};

/// One unit of emitted output: the exact bytes typed, tagged with the
/// trie node that produced it so retractions can be matched up even when
/// some values render no text.
#[derive(Debug, Clone)]
struct Segment {
    text: String,
    source: Option<NodeId>,
}

/// Reverses one applied translation: everything typed and everything
/// re-typed during retraction, plus the formatter state to restore.
#[derive(Debug, Default)]
struct WriterFrame {
    popped: Vec<Segment>,
    pushed: Vec<Segment>,
    prior_state: FormatState,
}

/// Renders translations into sink bytes. Keeps a stack of emitted
/// segments and one frame per applied translation so any step can be
/// replayed backwards byte-for-byte.
pub struct Writer<S: Sink> {
    sink: S,
    formatter: Formatter,
    emitted: Vec<Segment>,
    frames: Vec<WriterFrame>,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            formatter: Formatter::new(),
            emitted: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn set_force_attach(&mut self, attach: bool) {
        self.formatter.set_force_attach(attach);
    }

    /// Apply one translation: retract superseded output, then render and
    /// type the new emission. Pushes exactly one writer frame.
    pub fn apply(&mut self, translation: &Translation, dict: &Dictionary) -> io::Result<()> {
        let mut frame = WriterFrame {
            prior_state: self.formatter.state(),
            ..WriterFrame::default()
        };

        for &node in &translation.retract {
            self.retract_segment(node, &mut frame)?;
        }

        match &translation.emit {
            Emit::None => {}
            Emit::Untranslated(chord) => {
                // Raw chords are typed verbatim, without the leading
                // space a dictionary word gets.
                let segment = Segment {
                    text: chord.format(),
                    source: None,
                };
                self.type_segment(segment, &mut frame)?;
            }
            Emit::Node(node) => {
                let value = dict
                    .value(*node)
                    .expect("emitted node carries a value");
                let rendered = self.formatter.render(value);
                for op in &rendered.retro {
                    self.apply_retro(op, &mut frame)?;
                }
                if !rendered.text.is_empty() {
                    let segment = Segment {
                        text: rendered.text,
                        source: Some(*node),
                    };
                    self.type_segment(segment, &mut frame)?;
                }
            }
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Reverse the most recently applied translation: erase what it
    /// typed and re-type what it retracted.
    pub fn undo_last(&mut self) -> io::Result<bool> {
        let Some(frame) = self.frames.pop() else {
            return Ok(false);
        };

        for expected in frame.pushed.iter().rev() {
            match self.emitted.pop() {
                Some(segment) => self.erase(&segment)?,
                None => {
                    tracing::warn!(text = %expected.text, "undo found no segment to erase");
                }
            }
        }
        for segment in frame.popped.into_iter().rev() {
            self.sink.write_bytes(segment.text.as_bytes())?;
            self.emitted.push(segment);
        }
        self.formatter.restore(frame.prior_state);
        Ok(true)
    }

    fn retract_segment(&mut self, node: NodeId, frame: &mut WriterFrame) -> io::Result<()> {
        // A value that rendered no text (a bare directive) left no
        // segment behind; only pop when the tag matches.
        let matches = self
            .emitted
            .last()
            .is_some_and(|segment| segment.source == Some(node));
        if !matches {
            return Ok(());
        }
        let segment = self.emitted.pop().expect("tag match implies a segment");
        self.erase(&segment)?;
        frame.popped.push(segment);
        Ok(())
    }

    fn type_segment(&mut self, segment: Segment, frame: &mut WriterFrame) -> io::Result<()> {
        self.sink.write_bytes(segment.text.as_bytes())?;
        self.emitted.push(segment.clone());
        frame.pushed.push(segment);
        Ok(())
    }

    fn erase(&mut self, segment: &Segment) -> io::Result<()> {
        let deletes = vec![DELETE; segment.text.chars().count()];
        self.sink.write_bytes(&deletes)
    }

    fn apply_retro(&mut self, op: &RetroOp, frame: &mut WriterFrame) -> io::Result<()> {
        let Some(segment) = self.emitted.pop() else {
            tracing::debug!(?op, "retro operation with no previous output");
            return Ok(());
        };
        self.erase(&segment)?;
        frame.popped.push(segment.clone());

        let (lead, body) = match segment.text.strip_prefix(' ') {
            Some(body) => (" ", body),
            None => ("", segment.text.as_str()),
        };
        let new_body = match op {
            RetroOp::Capitalize => capitalize_first(body),
            RetroOp::Uncapitalize => lowercase_first(body),
            RetroOp::UppercaseWord => body.to_uppercase(),
            RetroOp::Currency { prefix, suffix } => format!("{prefix}{body}{suffix}"),
            RetroOp::Conditional {
                regex,
                if_true,
                if_false,
            } => match Regex::new(regex) {
                Ok(re) => match re.captures(body) {
                    Some(captures) => expand_backrefs(if_true, &captures),
                    None => if_false.clone(),
                },
                Err(e) => {
                    tracing::warn!(regex = %regex, error = %e, "bad conditional regex");
                    body.to_string()
                }
            },
        };

        let new_segment = Segment {
            text: format!("{lead}{new_body}"),
            source: segment.source,
        };
        self.type_segment(new_segment, frame)
    }
}

/// Expand `\1`-style backreferences in a conditional arm.
fn expand_backrefs(template: &str, captures: &regex::Captures<'_>) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                chars.next();
                if let Some(group) = captures.get(digit as usize) {
                    out.push_str(group.as_str());
                }
                continue;
            }
        }
        out.push(ch);
    }
    out
}
