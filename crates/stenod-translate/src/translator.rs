use stenod_chord::Chord;
use stenod_dict::{Dictionary, NodeId};

/// What one chord asks the writer to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// The chord produced no visible output (it extended or started a
    /// branch without reaching a value).
    None,
    /// The value at this trie node should be written.
    Node(NodeId),
    /// No dictionary match anywhere: the raw chord is written in its
    /// short steno form.
    Untranslated(Chord),
}

/// The outcome of translating one chord: retractions first, then the
/// emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub emit: Emit,
    /// Previously written outputs to retract before writing, most recent
    /// first. Each entry is the trie node whose value was on screen.
    pub retract: Vec<NodeId>,
}

/// Everything needed to reverse the mutations of one `translate` call.
#[derive(Debug, Clone)]
pub struct UndoFrame {
    pub translation: Translation,
    /// Hypothesis branches removed because they had no child for the
    /// chord, with the index each occupied at removal time.
    pub trimmed: Vec<(NodeId, usize)>,
    /// Output branches popped from the tail after a deeper branch
    /// produced this chord's output.
    pub replaced: Vec<NodeId>,
}

/// The translator state machine.
///
/// `possible_branches` is kept strictly sorted by node depth descending:
/// the head is the longest in-flight match, and the tail, when it
/// carries a value, is the output currently visible on screen.
pub struct Translator {
    dict: Dictionary,
    branches: Vec<NodeId>,
    undo_list: Vec<UndoFrame>,
}

impl Translator {
    pub fn new(dict: Dictionary) -> Self {
        Self {
            dict,
            branches: Vec::new(),
            undo_list: Vec::new(),
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn branches(&self) -> &[NodeId] {
        &self.branches
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_list.len()
    }

    /// Translate one chord, mutating the branch list and pushing an undo
    /// frame atomically for this call.
    pub fn translate(&mut self, chord: Chord) -> Translation {
        let mut trimmed = Vec::new();
        let mut replaced = Vec::new();
        let mut retract = Vec::new();
        let mut emit = Emit::None;
        let mut output_index = None;

        // Scan longest-first. A branch with a child advances in place; a
        // branch with none was a hypothesis that never produced output
        // and is dropped. The first value-bearing child wins and stops
        // the scan, preserving later entries for retraction.
        let mut index = 0;
        while index < self.branches.len() {
            let branch = self.branches[index];
            match self.dict.child(branch, chord) {
                Some(child) => {
                    self.branches[index] = child;
                    if self.dict.value(child).is_some() {
                        emit = Emit::Node(child);
                        output_index = Some(index);
                        break;
                    }
                    index += 1;
                }
                None => {
                    self.branches.remove(index);
                    trimmed.push((branch, index));
                }
            }
        }

        if let Some(output_index) = output_index {
            if self.branches.len() > output_index + 1 {
                // The tail is the most recently visible output.
                let last = *self.branches.last().expect("tail checked non-empty");
                if self.dict.value(last).is_some() {
                    retract.push(last);
                }
                // Each tail pop exposes the output that was visible one
                // step earlier: the ancestor of the new tail at the
                // popped branch's depth.
                while self.branches.len() > output_index + 1 {
                    let popped = self.branches.pop().expect("tail checked non-empty");
                    let new_last = *self.branches.last().expect("output branch remains");
                    let steps = self.dict.depth(new_last) - self.dict.depth(popped);
                    let ancestor = self
                        .dict
                        .ancestor(new_last, steps)
                        .expect("branch depth bounds its ancestor walk");
                    if self.dict.value(ancestor).is_some() {
                        retract.push(ancestor);
                    }
                    replaced.push(popped);
                }
            }
        } else if let Some(child) = self.dict.child(NodeId::ROOT, chord) {
            // No branch matched, but the chord starts a fresh path. At
            // depth 1 it is the shortest, so it extends the ordering.
            self.branches.push(child);
            if self.dict.value(child).is_some() {
                emit = Emit::Node(child);
            }
        } else {
            emit = Emit::Untranslated(chord);
        }

        debug_assert!(self.depths_strictly_descending());

        let translation = Translation { emit, retract };
        self.undo_list.push(UndoFrame {
            translation: translation.clone(),
            trimmed,
            replaced,
        });
        translation
    }

    /// Reverse the most recent `translate` call. Returns the reversed
    /// frame, or `None` when there is nothing left to undo.
    pub fn undo_last(&mut self) -> Option<UndoFrame> {
        let frame = self.undo_list.pop()?;

        for branch in self.branches.iter_mut() {
            *branch = self
                .dict
                .parent(*branch)
                .expect("every non-root trie node has a parent");
        }
        for &(branch, index) in frame.trimmed.iter().rev() {
            self.branches.insert(index, branch);
        }
        // A root tail means the undone chord had sprouted a fresh
        // root-child branch; parent-replacement turned it back into the
        // root itself.
        if self.branches.last().is_some_and(|last| last.is_root()) {
            self.branches.pop();
        }

        if !frame.replaced.is_empty() {
            tracing::trace!(replaced = frame.replaced.len(), "undo released replaced branches");
        }
        debug_assert!(self.depths_strictly_descending());
        Some(frame)
    }

    fn depths_strictly_descending(&self) -> bool {
        self.branches
            .windows(2)
            .all(|pair| self.dict.depth(pair[0]) > self.dict.depth(pair[1]))
    }
}
