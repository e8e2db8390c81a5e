use std::fmt;
use thiserror::Error;

/// A byte range into the owned raw string of a [`DictionaryValue`].
/// Atoms carry ranges instead of substrings so parsing never allocates
/// per atom and the raw entry can be reported verbatim in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub const EMPTY: Span = Span { start: 0, len: 0 };

    fn new(start: usize, end: usize) -> Self {
        Span {
            start,
            len: end - start,
        }
    }

    pub fn slice<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.start..self.start + self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One parsed unit of a dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
    /// Literal text outside braces.
    Raw(Span),
    /// `{^text}`: attach to the previous output (no space before).
    AttachPrefix(Span),
    /// `{text^}`: attach to the next output (no space after).
    AttachSuffix(Span),
    /// `{^text^}`: attach on both sides.
    AttachInfix(Span),
    /// `{&X}`: attaches only when the previous output was also glue.
    Glue(Span),
    /// `{-|}`
    CapitalizeNext,
    /// `{*-|}`
    CapitalizePrev,
    /// `{>}`
    UncapitalizeNext,
    /// `{*>}`
    UncapitalizePrev,
    /// `{<}`
    UppercaseNextWord,
    /// `{*<}`
    UppercasePrevWord,
    /// `{~|text}` or `{^~|text^}`: emit text but let a pending
    /// capitalization pass through to the following word.
    CarryCapitalization {
        text: Span,
        attach_prefix: bool,
        attach_suffix: bool,
    },
    /// `{#Caps_Lock}`
    CapsLockMode,
    /// `{*(prefix c suffix)}`: retro currency template.
    Currency { prefix: Span, suffix: Span },
    /// `{=regex/ifTrue/ifFalse}`
    Conditional {
        regex: Span,
        if_true: Span,
        if_false: Span,
    },
    /// The whole entry equals `=undo`.
    Undo,
    /// `{*+}`
    RepeatLastStroke,
    /// `{*}`
    ToggleAsterisk,
    /// `{*?}`
    InsertSpaceBetweenLastStrokes,
    /// `{*!}`
    RemoveSpaceBetweenLastStrokes,
    /// `{#name}`: named keyboard shortcut, parsed but not executed.
    Command(Span),
    /// `{}`
    DoNothing,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("closing brace at byte {index} has no opening brace")]
    MissingOpenBracket { index: usize },

    #[error("opening brace at byte {index} is never closed")]
    MissingCloseBracket { index: usize },

    #[error("nested opening brace at byte {index}")]
    CannotNestType { index: usize },

    #[error("currency template has no `c` slot")]
    CurrencyMissingC,

    #[error("conditional is missing its regex")]
    ConditionalMissingRegex,

    #[error("conditional is missing its if-true arm")]
    ConditionalMissingIfTrue,

    #[error("conditional is missing its if-false arm")]
    ConditionalMissingIfFalse,

    #[error("unrecognized atom {content:?} at byte {index}")]
    Unknown { content: String, index: usize },
}

/// A parsed dictionary entry: the raw string plus its atom sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryValue {
    raw: String,
    atoms: Vec<Atom>,
}

impl DictionaryValue {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValueError> {
        let raw = raw.into();

        // The undo stroke is the one entry that is not brace syntax.
        if raw == "=undo" {
            return Ok(Self {
                raw,
                atoms: vec![Atom::Undo],
            });
        }

        let atoms = scan(&raw)?;
        Ok(Self { raw, atoms })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn text(&self, span: Span) -> &str {
        span.slice(&self.raw)
    }

    /// True when the entry is the `=undo` directive.
    pub fn is_undo(&self) -> bool {
        matches!(self.atoms.as_slice(), [Atom::Undo])
    }
}

impl fmt::Display for DictionaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn scan(raw: &str) -> Result<Vec<Atom>, ValueError> {
    let mut atoms = Vec::new();
    let mut raw_start: Option<usize> = None;
    let mut chars = raw.char_indices();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '{' => {
                if let Some(start) = raw_start.take() {
                    atoms.push(Atom::Raw(Span::new(start, index)));
                }
                let content_start = index + 1;
                let mut close = None;
                for (offset, inner) in raw[content_start..].char_indices() {
                    match inner {
                        '{' => {
                            return Err(ValueError::CannotNestType {
                                index: content_start + offset,
                            })
                        }
                        '}' => {
                            close = Some(content_start + offset);
                            break;
                        }
                        _ => {}
                    }
                }
                let close = close.ok_or(ValueError::MissingCloseBracket { index })?;
                atoms.push(dispatch(raw, content_start, close)?);
                // Skip the scanner past the consumed brace group.
                for _ in raw[index..=close].chars().skip(1) {
                    chars.next();
                }
            }
            '}' => return Err(ValueError::MissingOpenBracket { index }),
            _ => {
                if raw_start.is_none() {
                    raw_start = Some(index);
                }
            }
        }
    }

    if let Some(start) = raw_start {
        atoms.push(Atom::Raw(Span::new(start, raw.len())));
    }
    Ok(atoms)
}

/// Classify the material between one `{` `}` pair. `start..end` are byte
/// offsets of the content within `raw`.
fn dispatch(raw: &str, start: usize, end: usize) -> Result<Atom, ValueError> {
    let content = &raw[start..end];

    match content {
        "" => return Ok(Atom::DoNothing),
        "-|" => return Ok(Atom::CapitalizeNext),
        "*-|" => return Ok(Atom::CapitalizePrev),
        ">" => return Ok(Atom::UncapitalizeNext),
        "*>" => return Ok(Atom::UncapitalizePrev),
        "<" => return Ok(Atom::UppercaseNextWord),
        "*<" => return Ok(Atom::UppercasePrevWord),
        "*" => return Ok(Atom::ToggleAsterisk),
        "*+" => return Ok(Atom::RepeatLastStroke),
        "*?" => return Ok(Atom::InsertSpaceBetweenLastStrokes),
        "*!" => return Ok(Atom::RemoveSpaceBetweenLastStrokes),
        _ => {}
    }

    if let Some(rest) = content.strip_prefix('#') {
        if rest.eq_ignore_ascii_case("caps_lock") {
            return Ok(Atom::CapsLockMode);
        }
        return Ok(Atom::Command(Span::new(start + 1, end)));
    }

    if let Some(rest) = content.strip_prefix("*(") {
        let body = rest.strip_suffix(')').unwrap_or(rest);
        let body_start = start + 2;
        let c_offset = body.find('c').ok_or(ValueError::CurrencyMissingC)?;
        return Ok(Atom::Currency {
            prefix: Span::new(body_start, body_start + c_offset),
            suffix: Span::new(body_start + c_offset + 1, body_start + body.len()),
        });
    }

    if let Some(rest) = content.strip_prefix('=') {
        return conditional(rest, start + 1);
    }

    // Carry-capitalization, possibly wrapped in attachment carets.
    if let Some(rest) = content.strip_prefix("~|") {
        let text_start = start + 2;
        let (text_end, attach_suffix) = if rest.ends_with('^') {
            (end - 1, true)
        } else {
            (end, false)
        };
        return Ok(Atom::CarryCapitalization {
            text: Span::new(text_start, text_end),
            attach_prefix: false,
            attach_suffix,
        });
    }
    if let Some(rest) = content.strip_prefix("^~|") {
        let text_start = start + 3;
        let (text_end, attach_suffix) = if rest.ends_with('^') {
            (end - 1, true)
        } else {
            (end, false)
        };
        return Ok(Atom::CarryCapitalization {
            text: Span::new(text_start, text_end),
            attach_prefix: true,
            attach_suffix,
        });
    }

    if content == "^" {
        return Ok(Atom::AttachInfix(Span::EMPTY));
    }
    if content.starts_with('^') && content.ends_with('^') && content.len() >= 2 {
        return Ok(Atom::AttachInfix(Span::new(start + 1, end - 1)));
    }
    if content.starts_with('^') {
        return Ok(Atom::AttachPrefix(Span::new(start + 1, end)));
    }
    if content.ends_with('^') {
        return Ok(Atom::AttachSuffix(Span::new(start, end - 1)));
    }
    if content.starts_with('&') {
        return Ok(Atom::Glue(Span::new(start + 1, end)));
    }

    Err(ValueError::Unknown {
        content: content.to_string(),
        index: start,
    })
}

fn conditional(rest: &str, rest_start: usize) -> Result<Atom, ValueError> {
    if rest.is_empty() {
        return Err(ValueError::ConditionalMissingRegex);
    }
    let first_slash = rest.find('/').ok_or(ValueError::ConditionalMissingIfTrue)?;
    if first_slash == 0 {
        return Err(ValueError::ConditionalMissingRegex);
    }
    let after = &rest[first_slash + 1..];
    let second_slash = after
        .find('/')
        .ok_or(ValueError::ConditionalMissingIfFalse)?;

    let regex = Span::new(rest_start, rest_start + first_slash);
    let if_true_start = rest_start + first_slash + 1;
    let if_true = Span::new(if_true_start, if_true_start + second_slash);
    let if_false = Span::new(if_true_start + second_slash + 1, rest_start + rest.len());
    Ok(Atom::Conditional {
        regex,
        if_true,
        if_false,
    })
}
