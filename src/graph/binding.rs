//! Binding table: which entity each reference site resolved to.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::SymbolId;
use crate::error::IndexerError;

/// Identifier of a reference-site node in the resolver's syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Category of a reference site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Identifier,
    MethodCall,
    FieldAccess,
    ConstructorCall,
}

impl BindingKind {
    pub const ALL: [BindingKind; 4] = [
        BindingKind::Identifier,
        BindingKind::MethodCall,
        BindingKind::FieldAccess,
        BindingKind::ConstructorCall,
    ];
}

/// A reference site as it appears in source.
///
/// `text` is the referenced name as written (for constructor calls, the full
/// type name, possibly dotted). `line` is 1-based, `column` 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceNode {
    pub id: NodeId,
    pub text: String,
    pub line: u32,
    pub column: u32,
    /// Generated by the resolver; not present in source.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl ReferenceNode {
    pub fn new(id: NodeId, text: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            id,
            text: text.into(),
            line,
            column,
            synthetic: false,
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BindingFile", into = "BindingFile")]
pub struct BindingTable {
    nodes: BTreeMap<NodeId, ReferenceNode>,
    identifiers: BTreeMap<NodeId, SymbolId>,
    method_calls: BTreeMap<NodeId, SymbolId>,
    field_accesses: BTreeMap<NodeId, SymbolId>,
    constructor_calls: BTreeMap<NodeId, SymbolId>,
    node_files: BTreeMap<NodeId, String>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `node` (a `kind` reference in `file`) resolved to `target`.
    pub fn record(
        &mut self,
        kind: BindingKind,
        node: ReferenceNode,
        target: SymbolId,
        file: Option<&str>,
    ) {
        let id = node.id;
        self.map_mut(kind).insert(id, target);
        if let Some(file) = file {
            self.node_files.insert(id, file.to_string());
        }
        self.nodes.insert(id, node);
    }

    /// Records a binding under a freshly numbered node.
    ///
    /// Fails once the node id space is used up.
    pub fn add(
        &mut self,
        kind: BindingKind,
        text: &str,
        line: u32,
        column: u32,
        target: SymbolId,
        file: &str,
    ) -> Result<NodeId, IndexerError> {
        let next = match self.nodes.keys().next_back() {
            Some(last) => last.0.checked_add(1),
            None => Some(1),
        };
        let id = NodeId(next.ok_or_else(|| {
            IndexerError::InvalidGraph("reference node ids exhausted".to_string())
        })?);
        self.record(kind, ReferenceNode::new(id, text, line, column), target, Some(file));
        Ok(id)
    }

    pub fn bindings(&self, kind: BindingKind) -> &BTreeMap<NodeId, SymbolId> {
        match kind {
            BindingKind::Identifier => &self.identifiers,
            BindingKind::MethodCall => &self.method_calls,
            BindingKind::FieldAccess => &self.field_accesses,
            BindingKind::ConstructorCall => &self.constructor_calls,
        }
    }

    fn map_mut(&mut self, kind: BindingKind) -> &mut BTreeMap<NodeId, SymbolId> {
        match kind {
            BindingKind::Identifier => &mut self.identifiers,
            BindingKind::MethodCall => &mut self.method_calls,
            BindingKind::FieldAccess => &mut self.field_accesses,
            BindingKind::ConstructorCall => &mut self.constructor_calls,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&ReferenceNode> {
        self.nodes.get(&id)
    }

    /// File containing the node, if known.
    pub fn node_file(&self, id: NodeId) -> Option<&str> {
        self.node_files
            .get(&id)
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BindingFile {
    #[serde(default)]
    references: Vec<ReferenceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReferenceRecord {
    kind: BindingKind,
    target: SymbolId,
    node: ReferenceNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

impl TryFrom<BindingFile> for BindingTable {
    type Error = IndexerError;

    fn try_from(file: BindingFile) -> Result<Self, Self::Error> {
        let mut table = BindingTable::new();
        for record in file.references {
            if table.nodes.contains_key(&record.node.id) {
                return Err(IndexerError::Parse(format!(
                    "reference {} is bound more than once",
                    record.node.id
                )));
            }
            table.record(record.kind, record.node, record.target, record.file.as_deref());
        }
        Ok(table)
    }
}

impl From<BindingTable> for BindingFile {
    fn from(mut table: BindingTable) -> Self {
        let mut references = Vec::with_capacity(table.nodes.len());
        for kind in BindingKind::ALL {
            for (id, target) in std::mem::take(table.map_mut(kind)) {
                let Some(node) = table.nodes.remove(&id) else {
                    continue;
                };
                references.push(ReferenceRecord {
                    kind,
                    target,
                    node,
                    file: table.node_files.remove(&id),
                });
            }
        }
        references.sort_by_key(|r| r.node.id);
        BindingFile { references }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_numbers_nodes_sequentially() {
        let mut table = BindingTable::new();
        let a = table.add(BindingKind::Identifier, "x", 1, 0, SymbolId(1), "/a.cls").unwrap();
        let b = table.add(BindingKind::MethodCall, "run", 2, 4, SymbolId(2), "/a.cls").unwrap();
        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(2));
        assert_eq!(table.bindings(BindingKind::MethodCall).get(&b), Some(&SymbolId(2)));
        assert!(table.bindings(BindingKind::Identifier).get(&b).is_none());
        assert_eq!(table.node_file(a), Some("/a.cls"));
    }

    #[test]
    fn test_add_fails_when_node_ids_run_out() {
        let mut table = BindingTable::new();
        table.record(
            BindingKind::Identifier,
            ReferenceNode::new(NodeId(u32::MAX), "last", 1, 0),
            SymbolId(1),
            Some("/a.cls"),
        );
        let err = table
            .add(BindingKind::Identifier, "x", 2, 0, SymbolId(1), "/a.cls")
            .unwrap_err();
        assert!(matches!(err, IndexerError::InvalidGraph(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_file_is_unknown() {
        let mut table = BindingTable::new();
        table.record(
            BindingKind::FieldAccess,
            ReferenceNode::new(NodeId(5), "count", 3, 2),
            SymbolId(1),
            Some(""),
        );
        assert_eq!(table.node_file(NodeId(5)), None);
    }

    #[test]
    fn test_json_form() {
        let json = r#"{"references": [
            {"kind": "constructor_call", "target": 3,
             "node": {"id": 9, "text": "Outer.Inner", "line": 4, "column": 12},
             "file": "/src/Use.cls"},
            {"kind": "identifier", "target": 4,
             "node": {"id": 10, "text": "tmp", "line": 5, "column": 0, "synthetic": true}}
        ]}"#;
        let table: BindingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.bindings(BindingKind::ConstructorCall).get(&NodeId(9)),
            Some(&SymbolId(3))
        );
        assert!(table.node(NodeId(10)).unwrap().synthetic);
        assert_eq!(table.node_file(NodeId(10)), None);

        let back: BindingTable =
            serde_json::from_str(&serde_json::to_string(&table).unwrap()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_json_rejects_double_binding() {
        let json = r#"{"references": [
            {"kind": "identifier", "target": 1, "node": {"id": 1, "text": "a", "line": 1, "column": 0}},
            {"kind": "method_call", "target": 2, "node": {"id": 1, "text": "a", "line": 1, "column": 0}}
        ]}"#;
        assert!(serde_json::from_str::<BindingTable>(json).is_err());
    }
}
