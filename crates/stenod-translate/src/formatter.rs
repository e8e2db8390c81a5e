use stenod_dict::{Atom, DictionaryValue};

/// Case directive pending for the next emitted word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
    Capitalize,
    Uncapitalize,
    UppercaseWord,
}

/// The formatter's persistent state between translations. Copied into
/// every writer frame so undo restores it exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatState {
    /// The next word joins the previous output without a space.
    attach_next: bool,
    /// One-shot override of `attach_next`, set by the space macros.
    force_attach: Option<bool>,
    pending_case: Option<CaseMode>,
    last_was_glue: bool,
    caps_lock: bool,
}

/// An operation on already-emitted output, applied by the writer before
/// the rendered text is typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetroOp {
    /// `{*-|}`
    Capitalize,
    /// `{*>}`
    Uncapitalize,
    /// `{*<}`
    UppercaseWord,
    /// `{*(prefix c suffix)}`: wrap the previous segment in a currency
    /// template.
    Currency { prefix: String, suffix: String },
    /// `{=regex/ifTrue/ifFalse}`: replace the previous segment with the
    /// matching arm, `\n` backreferences expanded.
    Conditional {
        regex: String,
        if_true: String,
        if_false: String,
    },
}

/// What one dictionary value renders to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub retro: Vec<RetroOp>,
    pub text: String,
}

/// Applies the value mini-language: attachment, capitalization, glue,
/// caps lock, and the retro templates.
#[derive(Debug, Default)]
pub struct Formatter {
    state: FormatState,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FormatState {
        self.state
    }

    pub fn restore(&mut self, state: FormatState) {
        self.state = state;
    }

    /// One-shot attachment override for the next rendered word; used by
    /// the insert/remove-space macros when re-translating.
    pub fn set_force_attach(&mut self, attach: bool) {
        self.state.force_attach = Some(attach);
    }

    /// Render one dictionary value into retro operations plus the text
    /// to type, advancing the formatter state.
    pub fn render(&mut self, value: &DictionaryValue) -> Rendered {
        let mut out = Rendered::default();
        let mut attach = self.state.attach_next;
        if let Some(forced) = self.state.force_attach.take() {
            attach = forced;
        }
        let mut glue_prev = self.state.last_was_glue;
        let mut emitted_any = false;

        for &atom in value.atoms() {
            match atom {
                Atom::Raw(span) => {
                    self.emit_word(&mut out.text, value.text(span), attach);
                    attach = false;
                    glue_prev = false;
                    emitted_any = true;
                }
                Atom::AttachPrefix(span) => {
                    self.emit_word(&mut out.text, value.text(span), true);
                    attach = false;
                    glue_prev = false;
                    emitted_any = true;
                }
                Atom::AttachSuffix(span) => {
                    self.emit_word(&mut out.text, value.text(span), attach);
                    attach = true;
                    glue_prev = false;
                    emitted_any = true;
                }
                Atom::AttachInfix(span) => {
                    self.emit_word(&mut out.text, value.text(span), true);
                    attach = true;
                    glue_prev = false;
                    emitted_any = true;
                }
                Atom::Glue(span) => {
                    self.emit_word(&mut out.text, value.text(span), attach || glue_prev);
                    attach = false;
                    glue_prev = true;
                    emitted_any = true;
                }
                Atom::CarryCapitalization {
                    text,
                    attach_prefix,
                    attach_suffix,
                } => {
                    // The pending case rides over this text to the next
                    // real word.
                    let pending = self.state.pending_case;
                    self.emit_word(&mut out.text, value.text(text), attach || attach_prefix);
                    self.state.pending_case = pending;
                    attach = attach_suffix;
                    glue_prev = false;
                    emitted_any = true;
                }
                Atom::CapitalizeNext => self.state.pending_case = Some(CaseMode::Capitalize),
                Atom::UncapitalizeNext => self.state.pending_case = Some(CaseMode::Uncapitalize),
                Atom::UppercaseNextWord => self.state.pending_case = Some(CaseMode::UppercaseWord),
                Atom::CapitalizePrev => out.retro.push(RetroOp::Capitalize),
                Atom::UncapitalizePrev => out.retro.push(RetroOp::Uncapitalize),
                Atom::UppercasePrevWord => out.retro.push(RetroOp::UppercaseWord),
                Atom::CapsLockMode => self.state.caps_lock = !self.state.caps_lock,
                Atom::Currency { prefix, suffix } => out.retro.push(RetroOp::Currency {
                    prefix: value.text(prefix).to_string(),
                    suffix: value.text(suffix).to_string(),
                }),
                Atom::Conditional {
                    regex,
                    if_true,
                    if_false,
                } => out.retro.push(RetroOp::Conditional {
                    regex: value.text(regex).to_string(),
                    if_true: value.text(if_true).to_string(),
                    if_false: value.text(if_false).to_string(),
                }),
                Atom::Command(span) => {
                    tracing::debug!(command = value.text(span), "ignoring keyboard command");
                }
                // Resolved by the engine before rendering.
                Atom::Undo
                | Atom::RepeatLastStroke
                | Atom::ToggleAsterisk
                | Atom::InsertSpaceBetweenLastStrokes
                | Atom::RemoveSpaceBetweenLastStrokes => {}
                Atom::DoNothing => {}
            }
        }

        self.state.attach_next = attach;
        if emitted_any {
            self.state.last_was_glue = glue_prev;
        }
        out
    }

    fn emit_word(&mut self, out: &mut String, text: &str, attach_before: bool) {
        if !attach_before {
            out.push(' ');
        }
        if text.is_empty() {
            return;
        }
        let mut word = match self.state.pending_case.take() {
            Some(CaseMode::Capitalize) => capitalize_first(text),
            Some(CaseMode::Uncapitalize) => lowercase_first(text),
            Some(CaseMode::UppercaseWord) => text.to_uppercase(),
            None => text.to_string(),
        };
        if self.state.caps_lock {
            word = word.to_uppercase();
        }
        out.push_str(&word);
    }
}

pub(crate) fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
