use std::collections::HashMap;

use stenod_chord::Chord;

use crate::error::DictionaryError;
use crate::value::DictionaryValue;

/// Index of a trie node inside the dictionary arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

struct Node {
    value: Option<DictionaryValue>,
    children: HashMap<Chord, NodeId>,
    parent: Option<NodeId>,
    depth: usize,
}

impl Node {
    fn root() -> Self {
        Node {
            value: None,
            children: HashMap::new(),
            parent: None,
            depth: 0,
        }
    }
}

/// The chord trie. Nodes live in an arena and reference each other by
/// index; the parent of the root is `None` and every other node's parent
/// is the unique node whose children contain it.
pub struct Dictionary {
    nodes: Vec<Node>,
    entries: usize,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::root()],
            entries: 0,
        }
    }

    /// Number of value-bearing entries.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Insert a slash-separated chord path (`"STKPWHR/-T"`) mapping to a
    /// raw value string. Re-inserting an existing path replaces the old
    /// value.
    pub fn insert(&mut self, path: &str, raw_value: &str) -> Result<(), DictionaryError> {
        if path.is_empty() {
            return Err(DictionaryError::EmptyPath);
        }
        let mut chords = Vec::new();
        for part in path.split('/') {
            if part.is_empty() {
                return Err(DictionaryError::EmptyPath);
            }
            chords.push(Chord::parse(part)?);
        }
        let value = DictionaryValue::parse(raw_value)?;

        let mut node = NodeId::ROOT;
        for chord in chords {
            node = match self.nodes[node.0].children.get(&chord).copied() {
                Some(child) => child,
                None => {
                    let depth = self.nodes[node.0].depth + 1;
                    let child = NodeId(self.nodes.len());
                    self.nodes.push(Node {
                        value: None,
                        children: HashMap::new(),
                        parent: Some(node),
                        depth,
                    });
                    self.nodes[node.0].children.insert(chord, child);
                    child
                }
            };
        }

        let slot = &mut self.nodes[node.0].value;
        if let Some(old) = slot.replace(value) {
            tracing::debug!(path, old = old.raw(), new = raw_value, "replacing entry");
        } else {
            self.entries += 1;
        }
        Ok(())
    }

    pub fn child(&self, node: NodeId, chord: Chord) -> Option<NodeId> {
        self.nodes[node.0].children.get(&chord).copied()
    }

    pub fn value(&self, node: NodeId) -> Option<&DictionaryValue> {
        self.nodes[node.0].value.as_ref()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn depth(&self, node: NodeId) -> usize {
        self.nodes[node.0].depth
    }

    /// Walk `steps` parents up from `node`.
    pub fn ancestor(&self, node: NodeId, steps: usize) -> Option<NodeId> {
        let mut current = node;
        for _ in 0..steps {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// Convenience lookup of a full chord sequence.
    pub fn lookup(&self, chords: &[Chord]) -> Option<&DictionaryValue> {
        let mut node = NodeId::ROOT;
        for &chord in chords {
            node = self.child(node, chord)?;
        }
        self.value(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(s: &str) -> Chord {
        Chord::parse(s).unwrap()
    }

    #[test]
    fn insert_and_lookup_single() {
        let mut dict = Dictionary::new();
        dict.insert("S", "Batata").unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.lookup(&[chord("S")]).unwrap().raw(), "Batata");
        assert!(dict.lookup(&[chord("T")]).is_none());
    }

    #[test]
    fn insert_path_creates_intermediate_nodes() {
        let mut dict = Dictionary::new();
        dict.insert("S/T/K", "Cebola").unwrap();

        let s = dict.child(NodeId::ROOT, chord("S")).unwrap();
        let st = dict.child(s, chord("T")).unwrap();
        let stk = dict.child(st, chord("K")).unwrap();

        assert!(dict.value(s).is_none());
        assert!(dict.value(st).is_none());
        assert_eq!(dict.value(stk).unwrap().raw(), "Cebola");

        assert_eq!(dict.depth(stk), 3);
        assert_eq!(dict.parent(stk), Some(st));
        assert_eq!(dict.parent(st), Some(s));
        assert_eq!(dict.parent(s), Some(NodeId::ROOT));
        assert_eq!(dict.parent(NodeId::ROOT), None);
    }

    #[test]
    fn ancestor_walk() {
        let mut dict = Dictionary::new();
        dict.insert("S/T/K", "x").unwrap();
        let s = dict.child(NodeId::ROOT, chord("S")).unwrap();
        let st = dict.child(s, chord("T")).unwrap();
        let stk = dict.child(st, chord("K")).unwrap();

        assert_eq!(dict.ancestor(stk, 0), Some(stk));
        assert_eq!(dict.ancestor(stk, 2), Some(s));
        assert_eq!(dict.ancestor(stk, 3), Some(NodeId::ROOT));
        assert_eq!(dict.ancestor(stk, 4), None);
    }

    #[test]
    fn reinsert_replaces_value() {
        let mut dict = Dictionary::new();
        dict.insert("S", "old").unwrap();
        dict.insert("S", "new").unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.lookup(&[chord("S")]).unwrap().raw(), "new");
    }

    #[test]
    fn bad_chord_and_empty_path_rejected() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.insert("Q", "x"),
            Err(DictionaryError::Chord(_))
        ));
        assert!(matches!(
            dict.insert("", "x"),
            Err(DictionaryError::EmptyPath)
        ));
        assert!(matches!(
            dict.insert("S//T", "x"),
            Err(DictionaryError::EmptyPath)
        ));
    }

    #[test]
    fn bad_value_rejected_without_creating_entry() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            dict.insert("S", "{^ing"),
            Err(DictionaryError::Value(_))
        ));
        assert_eq!(dict.len(), 0);
    }
}
