use serde::{Deserialize, Serialize};

// =====================================================
// Index Envelope
// =====================================================

/// A complete code-intelligence index for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub metadata: Metadata,
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Metadata for symbols referenced by the index but not defined in any
    /// of its documents.
    #[serde(default)]
    pub external_symbols: Vec<SymbolInformation>,
}

impl Index {
    pub fn document(&self, relative_path: &str) -> Option<&Document> {
        self.documents
            .iter()
            .find(|d| d.relative_path == relative_path)
    }

    /// Every symbol that has metadata somewhere in the index.
    pub fn known_symbols(&self) -> std::collections::HashSet<&str> {
        self.documents
            .iter()
            .flat_map(|d| d.symbols.iter())
            .chain(self.external_symbols.iter())
            .map(|si| si.symbol.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: ProtocolVersion,
    pub tool_info: ToolInfo,
    /// URI of the project root, e.g. `file:///home/me/project`.
    pub project_root: String,
    pub text_document_encoding: TextEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersion {
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    #[default]
    Utf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionEncoding {
    #[default]
    Utf8CodeUnitOffsetFromLineStart,
}

// =====================================================
// Documents and Occurrences
// =====================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub language: String,
    /// Project-root-relative path with `/` separators.
    pub relative_path: String,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
    #[serde(default)]
    pub symbols: Vec<SymbolInformation>,
    pub position_encoding: PositionEncoding,
}

impl Document {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            language: "apex".to_string(),
            relative_path: relative_path.into(),
            occurrences: Vec::new(),
            symbols: Vec::new(),
            position_encoding: PositionEncoding::Utf8CodeUnitOffsetFromLineStart,
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter().filter(|o| o.is_definition())
    }

    pub fn references(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter().filter(|o| !o.is_definition())
    }

    pub fn defines(&self, symbol: &str) -> bool {
        self.definitions().any(|o| o.symbol == symbol)
    }

    pub fn symbol_info(&self, symbol: &str) -> Option<&SymbolInformation> {
        self.symbols.iter().find(|si| si.symbol == symbol)
    }
}

/// Role bits of an occurrence. Values match the SCIP `SymbolRole` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolRole {
    Definition,
    ReadAccess,
}

impl SymbolRole {
    pub fn bits(self) -> i32 {
        match self {
            SymbolRole::Definition => 0x1,
            SymbolRole::ReadAccess => 0x8,
        }
    }
}

/// A symbol mentioned at a single-line span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// `[line, start_column, end_column]`, all 0-based, end exclusive.
    pub range: [u32; 3],
    pub symbol: String,
    pub symbol_roles: i32,
}

impl Occurrence {
    pub fn new(line: u32, start_column: u32, end_column: u32, symbol: impl Into<String>, role: SymbolRole) -> Self {
        Self {
            range: [line, start_column, end_column],
            symbol: symbol.into(),
            symbol_roles: role.bits(),
        }
    }

    pub fn line(&self) -> u32 {
        self.range[0]
    }

    pub fn start_column(&self) -> u32 {
        self.range[1]
    }

    pub fn end_column(&self) -> u32 {
        self.range[2]
    }

    pub fn has_role(&self, role: SymbolRole) -> bool {
        self.symbol_roles & role.bits() != 0
    }

    pub fn is_definition(&self) -> bool {
        self.has_role(SymbolRole::Definition)
    }
}

// =====================================================
// Symbol Metadata
// =====================================================

/// Coarse symbol kind exposed to navigation tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InformationKind {
    #[default]
    UnspecifiedKind,
    Class,
    Interface,
    Enum,
    Method,
    Constructor,
    Field,
    Property,
    Parameter,
    Variable,
    EnumMember,
}

impl InformationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InformationKind::UnspecifiedKind => "unspecified",
            InformationKind::Class => "class",
            InformationKind::Interface => "interface",
            InformationKind::Enum => "enum",
            InformationKind::Method => "method",
            InformationKind::Constructor => "constructor",
            InformationKind::Field => "field",
            InformationKind::Property => "property",
            InformationKind::Parameter => "parameter",
            InformationKind::Variable => "variable",
            InformationKind::EnumMember => "enum_member",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInformation {
    pub symbol: String,
    pub display_name: String,
    pub kind: InformationKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documentation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl SymbolInformation {
    pub fn new(symbol: impl Into<String>, display_name: impl Into<String>, kind: InformationKind) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
            kind,
            documentation: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn relationship(&self, symbol: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.symbol == symbol)
    }
}

/// Link from one symbol to another, e.g. a class to the interface it implements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub symbol: String,
    #[serde(default)]
    pub is_reference: bool,
    #[serde(default)]
    pub is_implementation: bool,
}

impl Relationship {
    pub fn implementation(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            is_implementation: true,
            ..Default::default()
        }
    }

    pub fn reference(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            is_reference: true,
            ..Default::default()
        }
    }
}

// =====================================================
// Statistics
// =====================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub occurrences: usize,
    pub definitions: usize,
    pub references: usize,
    pub symbols: usize,
    pub external_symbols: usize,
    pub symbols_by_kind: Vec<(String, usize)>,
}

impl IndexStats {
    pub fn from_index(index: &Index) -> Self {
        let mut by_kind = std::collections::BTreeMap::<&'static str, usize>::new();
        let mut stats = IndexStats {
            documents: index.documents.len(),
            external_symbols: index.external_symbols.len(),
            ..Default::default()
        };
        for doc in &index.documents {
            stats.occurrences += doc.occurrences.len();
            stats.definitions += doc.definitions().count();
            stats.symbols += doc.symbols.len();
            for si in &doc.symbols {
                *by_kind.entry(si.kind.as_str()).or_default() += 1;
            }
        }
        stats.references = stats.occurrences - stats.definitions;
        stats.symbols_by_kind = by_kind
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        stats
    }
}
