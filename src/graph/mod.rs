//! Resolved symbol graph consumed by the indexer.
//!
//! The graph is produced by the external Apex resolver and handed over as a
//! JSON document (see [`ResolvedProgram`]). Every entity lives in one map keyed
//! by [`SymbolId`] and is one of four mutually exclusive categories, modelled
//! as the closed [`Entity`] enum.

pub mod binding;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

pub use binding::{BindingKind, BindingTable, NodeId, ReferenceNode};

/// Stable identifier of an entity within one resolved graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Sentinel used by the resolver for "could not resolve".
    pub const INVALID: SymbolId = SymbolId(0);

    pub fn new(id: u32) -> Self {
        SymbolId(id)
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

/// Fine-grained kind of a resolved entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Interface,
    Enum,
    Trigger,
    Method,
    Constructor,
    Field,
    Property,
    Parameter,
    LocalVariable,
    EnumValue,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Trigger => "trigger",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Field => "field",
            SymbolKind::Property => "property",
            SymbolKind::Parameter => "parameter",
            SymbolKind::LocalVariable => "local_variable",
            SymbolKind::EnumValue => "enum_value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Trigger,
}

impl TypeKind {
    pub fn symbol_kind(self) -> SymbolKind {
        match self {
            TypeKind::Class => SymbolKind::Class,
            TypeKind::Interface => SymbolKind::Interface,
            TypeKind::Enum => SymbolKind::Enum,
            TypeKind::Trigger => SymbolKind::Trigger,
        }
    }
}

/// Where an entity is declared in source.
///
/// `line` is 1-based, `column` is 0-based and counted in UTF-8 bytes. A
/// declaration without a file path belongs to code the index does not own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declaration located at `line`/`column` of `file_path`.
    pub fn at(name: impl Into<String>, file_path: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            name: name.into(),
            file_path: Some(file_path.into()),
            line,
            column,
            doc_comment: None,
        }
    }

    pub fn with_doc_comment(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    /// The declaring file, ignoring empty paths.
    pub fn source_file(&self) -> Option<&str> {
        self.file_path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn documentation(&self) -> Option<&str> {
        self.doc_comment.as_deref().filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSymbol {
    pub kind: TypeKind,
    /// Dot-separated path from the root namespace through enclosing types.
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<SymbolId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<SymbolId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<SymbolId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SymbolId>,
}

impl TypeSymbol {
    pub fn new(kind: TypeKind, qualified_name: impl Into<String>) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
            declaration: None,
            implements: Vec::new(),
            extends: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn implementing(mut self, ids: impl IntoIterator<Item = SymbolId>) -> Self {
        self.implements.extend(ids);
        self
    }

    pub fn extending(mut self, ids: impl IntoIterator<Item = SymbolId>) -> Self {
        self.extends.extend(ids);
        self
    }

    pub fn source_file(&self) -> Option<&str> {
        self.declaration.as_ref().and_then(Declaration::source_file)
    }

    /// Last segment of the qualified name.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSymbol {
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    pub declaring_type: SymbolId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<SymbolId>,
}

impl MethodSymbol {
    pub fn new(name: impl Into<String>, declaring_type: SymbolId) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Method,
            declaring_type,
            declaration: None,
            parameters: Vec::new(),
        }
    }

    pub fn constructor(name: impl Into<String>, declaring_type: SymbolId) -> Self {
        Self {
            kind: MethodKind::Constructor,
            ..Self::new(name, declaring_type)
        }
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSymbol {
    pub name: String,
    pub declaring_type: SymbolId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Declaration>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub getter: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub setter: bool,
}

impl FieldSymbol {
    pub fn new(name: impl Into<String>, declaring_type: SymbolId) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            declaration: None,
            getter: false,
            setter: false,
        }
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn with_accessors(mut self, getter: bool, setter: bool) -> Self {
        self.getter = getter;
        self.setter = setter;
        self
    }

    pub fn has_accessors(&self) -> bool {
        self.getter || self.setter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Parameter,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSymbol {
    pub name: String,
    pub kind: VariableKind,
    /// Enclosing method (or type, for initializer blocks).
    pub parent: SymbolId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Declaration>,
}

impl VariableSymbol {
    pub fn parameter(name: impl Into<String>, parent: SymbolId) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Parameter,
            parent,
            declaration: None,
        }
    }

    pub fn local(name: impl Into<String>, parent: SymbolId) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Local,
            parent,
            declaration: None,
        }
    }
}

/// One resolved entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Entity {
    Type(TypeSymbol),
    Method(MethodSymbol),
    Field(FieldSymbol),
    Variable(VariableSymbol),
}

impl Entity {
    pub fn declaration(&self) -> Option<&Declaration> {
        match self {
            Entity::Type(t) => t.declaration.as_ref(),
            Entity::Method(m) => m.declaration.as_ref(),
            Entity::Field(f) => f.declaration.as_ref(),
            Entity::Variable(v) => v.declaration.as_ref(),
        }
    }

    /// Human-readable name, preferring the declared spelling.
    pub fn display_name(&self) -> &str {
        if let Some(decl) = self.declaration() {
            if !decl.name.is_empty() {
                return &decl.name;
            }
        }
        match self {
            Entity::Type(t) => t.simple_name(),
            Entity::Method(m) => &m.name,
            Entity::Field(f) => &f.name,
            Entity::Variable(v) => &v.name,
        }
    }
}

/// All resolved entities of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphFile", into = "GraphFile")]
pub struct SymbolGraph {
    entities: BTreeMap<SymbolId, Entity>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Entity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    pub fn type_by_id(&self, id: SymbolId) -> Option<&TypeSymbol> {
        match self.get(id)? {
            Entity::Type(t) => Some(t),
            _ => None,
        }
    }

    fn type_of_kind(&self, id: SymbolId, kind: TypeKind) -> Option<&TypeSymbol> {
        self.type_by_id(id).filter(|t| t.kind == kind)
    }

    pub fn class_by_id(&self, id: SymbolId) -> Option<&TypeSymbol> {
        self.type_of_kind(id, TypeKind::Class)
    }

    pub fn interface_by_id(&self, id: SymbolId) -> Option<&TypeSymbol> {
        self.type_of_kind(id, TypeKind::Interface)
    }

    pub fn enum_by_id(&self, id: SymbolId) -> Option<&TypeSymbol> {
        self.type_of_kind(id, TypeKind::Enum)
    }

    pub fn trigger_by_id(&self, id: SymbolId) -> Option<&TypeSymbol> {
        self.type_of_kind(id, TypeKind::Trigger)
    }

    pub fn method_by_id(&self, id: SymbolId) -> Option<&MethodSymbol> {
        match self.get(id)? {
            Entity::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn field_by_id(&self, id: SymbolId) -> Option<&FieldSymbol> {
        match self.get(id)? {
            Entity::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn variable_by_id(&self, id: SymbolId) -> Option<&VariableSymbol> {
        match self.get(id)? {
            Entity::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Every declared type, nested types included, in id order.
    pub fn types(&self) -> impl Iterator<Item = (SymbolId, &TypeSymbol)> {
        self.entities.iter().filter_map(|(id, e)| match e {
            Entity::Type(t) => Some((*id, t)),
            _ => None,
        })
    }

    fn types_of_kind(&self, kind: TypeKind) -> Vec<(SymbolId, &TypeSymbol)> {
        self.types().filter(|(_, t)| t.kind == kind).collect()
    }

    pub fn all_classes(&self) -> Vec<(SymbolId, &TypeSymbol)> {
        self.types_of_kind(TypeKind::Class)
    }

    pub fn all_interfaces(&self) -> Vec<(SymbolId, &TypeSymbol)> {
        self.types_of_kind(TypeKind::Interface)
    }

    pub fn all_enums(&self) -> Vec<(SymbolId, &TypeSymbol)> {
        self.types_of_kind(TypeKind::Enum)
    }

    pub fn all_triggers(&self) -> Vec<(SymbolId, &TypeSymbol)> {
        self.types_of_kind(TypeKind::Trigger)
    }

    /// Fine-grained kind of an entity.
    ///
    /// Field vs. property is derived from accessor presence, and fields of an
    /// enum are its values.
    pub fn symbol_kind(&self, id: SymbolId) -> Option<SymbolKind> {
        let kind = match self.get(id)? {
            Entity::Type(t) => t.kind.symbol_kind(),
            Entity::Method(m) => match m.kind {
                MethodKind::Method => SymbolKind::Method,
                MethodKind::Constructor => SymbolKind::Constructor,
            },
            Entity::Field(f) => {
                if self.enum_by_id(f.declaring_type).is_some() {
                    SymbolKind::EnumValue
                } else if f.has_accessors() {
                    SymbolKind::Property
                } else {
                    SymbolKind::Field
                }
            }
            Entity::Variable(v) => match v.kind {
                VariableKind::Parameter => SymbolKind::Parameter,
                VariableKind::Local => SymbolKind::LocalVariable,
            },
        };
        Some(kind)
    }

    /// Finds a top-level type by name, ignoring ASCII case.
    pub fn find_top_level_type(&self, name: &str) -> Option<SymbolId> {
        self.types()
            .find(|(_, t)| t.qualified_name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    /// Checks cross-entity references.
    ///
    /// Links to [`SymbolId::INVALID`] are allowed (the resolver's marker for
    /// unresolved targets); links to ids that do not exist, or that point at
    /// the wrong category, are rejected.
    pub fn validate(&self) -> Result<()> {
        for (id, entity) in self.iter() {
            if !id.is_valid() {
                return Err(IndexerError::InvalidGraph(
                    "symbol id 0 is reserved for unresolved targets".to_string(),
                ));
            }
            match entity {
                Entity::Type(t) => {
                    for target in t.implements.iter().chain(&t.extends) {
                        self.expect_type(id, *target)?;
                    }
                    for method in &t.methods {
                        if self.method_by_id(*method).is_none() {
                            return Err(dangling(id, *method, "method"));
                        }
                    }
                    for field in &t.fields {
                        if self.field_by_id(*field).is_none() {
                            return Err(dangling(id, *field, "field"));
                        }
                    }
                }
                Entity::Method(m) => {
                    self.expect_type(id, m.declaring_type)?;
                    for param in &m.parameters {
                        if self.variable_by_id(*param).is_none() {
                            return Err(dangling(id, *param, "parameter"));
                        }
                    }
                }
                Entity::Field(f) => self.expect_type(id, f.declaring_type)?,
                Entity::Variable(v) => match self.get(v.parent) {
                    Some(Entity::Method(_) | Entity::Type(_)) => {}
                    Some(_) => {
                        return Err(IndexerError::InvalidGraph(format!(
                            "{id} has parent {} that is neither a method nor a type",
                            v.parent
                        )))
                    }
                    None if v.parent.is_valid() => return Err(dangling(id, v.parent, "parent")),
                    None => {}
                },
            }
        }
        Ok(())
    }

    fn expect_type(&self, from: SymbolId, target: SymbolId) -> Result<()> {
        if target.is_valid() && self.type_by_id(target).is_none() {
            return Err(dangling(from, target, "type"));
        }
        Ok(())
    }
}

fn dangling(from: SymbolId, to: SymbolId, what: &str) -> IndexerError {
    IndexerError::InvalidGraph(format!("{from} refers to missing {what} {to}"))
}

/// Wire form of [`SymbolGraph`]: a flat list of entities tagged with their id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphFile {
    #[serde(default)]
    symbols: Vec<SymbolRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymbolRecord {
    id: SymbolId,
    #[serde(flatten)]
    entity: Entity,
}

impl TryFrom<GraphFile> for SymbolGraph {
    type Error = IndexerError;

    fn try_from(file: GraphFile) -> Result<Self> {
        let mut graph = SymbolGraph::new();
        for record in file.symbols {
            if graph.entities.insert(record.id, record.entity).is_some() {
                return Err(IndexerError::InvalidGraph(format!(
                    "duplicate symbol id {}",
                    record.id
                )));
            }
        }
        Ok(graph)
    }
}

impl From<SymbolGraph> for GraphFile {
    fn from(graph: SymbolGraph) -> Self {
        GraphFile {
            symbols: graph
                .entities
                .into_iter()
                .map(|(id, entity)| SymbolRecord { id, entity })
                .collect(),
        }
    }
}

/// Incrementally assembles a [`SymbolGraph`], keeping member lists in sync.
///
/// Running out of ids is reported by [`GraphBuilder::build`]; entities added
/// after that point get [`SymbolId::INVALID`] and are dropped.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: SymbolGraph,
    next_id: Option<u32>,
    exhausted: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: SymbolGraph::new(),
            next_id: Some(1),
            exhausted: false,
        }
    }

    /// Continues building on top of an existing graph.
    pub fn from_graph(graph: SymbolGraph) -> Self {
        let next_id = match graph.entities.keys().next_back() {
            Some(last) => last.0.checked_add(1),
            None => Some(1),
        };
        Self {
            graph,
            next_id,
            exhausted: false,
        }
    }

    pub fn graph(&self) -> &SymbolGraph {
        &self.graph
    }

    pub fn add(&mut self, entity: Entity) -> SymbolId {
        let Some(next) = self.next_id else {
            self.exhausted = true;
            return SymbolId::INVALID;
        };
        let id = SymbolId(next);
        self.next_id = next.checked_add(1);
        self.graph.entities.insert(id, entity);
        id
    }

    pub fn add_type(&mut self, ty: TypeSymbol) -> SymbolId {
        self.add(Entity::Type(ty))
    }

    /// Adds a method and registers it with its declaring type.
    pub fn add_method(&mut self, method: MethodSymbol) -> SymbolId {
        let owner = method.declaring_type;
        let id = self.add(Entity::Method(method));
        if !id.is_valid() {
            return id;
        }
        if let Some(ty) = self.type_mut(owner) {
            ty.methods.push(id);
        }
        id
    }

    /// Adds a field and registers it with its declaring type.
    pub fn add_field(&mut self, field: FieldSymbol) -> SymbolId {
        let owner = field.declaring_type;
        let id = self.add(Entity::Field(field));
        if !id.is_valid() {
            return id;
        }
        if let Some(ty) = self.type_mut(owner) {
            ty.fields.push(id);
        }
        id
    }

    /// Adds a variable; parameters are appended to their method's signature.
    pub fn add_variable(&mut self, variable: VariableSymbol) -> SymbolId {
        let parent = variable.parent;
        let is_param = variable.kind == VariableKind::Parameter;
        let id = self.add(Entity::Variable(variable));
        if is_param && id.is_valid() {
            if let Some(Entity::Method(m)) = self.graph.entities.get_mut(&parent) {
                m.parameters.push(id);
            }
        }
        id
    }

    pub fn type_mut(&mut self, id: SymbolId) -> Option<&mut TypeSymbol> {
        match self.graph.entities.get_mut(&id)? {
            Entity::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, id: SymbolId) -> Option<&mut FieldSymbol> {
        match self.graph.entities.get_mut(&id)? {
            Entity::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Validates and returns the finished graph.
    pub fn build(self) -> Result<SymbolGraph> {
        if self.exhausted {
            return Err(IndexerError::InvalidGraph("symbol ids exhausted".to_string()));
        }
        self.graph.validate()?;
        Ok(self.graph)
    }
}

/// Output of the external resolver: the symbol graph plus its bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedProgram {
    pub graph: SymbolGraph,
    #[serde(default)]
    pub binding: BindingTable,
}

impl ResolvedProgram {
    pub fn new(graph: SymbolGraph, binding: BindingTable) -> Self {
        Self { graph, binding }
    }

    /// Loads a resolved program from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses and validates a resolved program.
    pub fn from_json(content: &str) -> Result<Self> {
        let program: ResolvedProgram = serde_json::from_str(content)?;
        program.graph.validate()?;
        Ok(program)
    }

    /// Whether any type in the graph was declared in a source file.
    pub fn has_sources(&self) -> bool {
        self.graph.types().any(|(_, t)| t.source_file().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> (SymbolGraph, SymbolId, SymbolId, SymbolId) {
        let mut builder = GraphBuilder::new();
        let class = builder.add_type(
            TypeSymbol::new(TypeKind::Class, "MyClass")
                .with_declaration(Declaration::at("MyClass", "/src/MyClass.cls", 1, 13)),
        );
        let field = builder.add_field(
            FieldSymbol::new("count", class)
                .with_declaration(Declaration::at("count", "/src/MyClass.cls", 3, 4)),
        );
        let method = builder.add_method(MethodSymbol::new("getCount", class));
        (builder.build().unwrap(), class, field, method)
    }

    #[test]
    fn test_builder_registers_members() {
        let (graph, class, field, method) = sample_graph();
        let ty = graph.class_by_id(class).unwrap();
        assert_eq!(ty.fields, vec![field]);
        assert_eq!(ty.methods, vec![method]);
        assert!(graph.interface_by_id(class).is_none());
    }

    #[test]
    fn test_symbol_kind_derivation() {
        let mut builder = GraphBuilder::new();
        let class = builder.add_type(TypeSymbol::new(TypeKind::Class, "A"));
        let season = builder.add_type(TypeSymbol::new(TypeKind::Enum, "Season"));
        let plain = builder.add_field(FieldSymbol::new("plain", class));
        let prop = builder.add_field(FieldSymbol::new("prop", class).with_accessors(true, false));
        let winter = builder.add_field(FieldSymbol::new("WINTER", season));
        let graph = builder.build().unwrap();

        assert_eq!(graph.symbol_kind(plain), Some(SymbolKind::Field));
        assert_eq!(graph.symbol_kind(prop), Some(SymbolKind::Property));
        assert_eq!(graph.symbol_kind(winter), Some(SymbolKind::EnumValue));
        assert_eq!(graph.symbol_kind(season), Some(SymbolKind::Enum));
        assert_eq!(graph.symbol_kind(SymbolId(99)), None);
    }

    #[test]
    fn test_validate_rejects_missing_declaring_type() {
        let mut builder = GraphBuilder::new();
        builder.add_method(MethodSymbol::new("orphan", SymbolId(42)));
        let err = builder.build().unwrap_err();
        assert!(matches!(err, IndexerError::InvalidGraph(_)));
    }

    #[test]
    fn test_validate_allows_invalid_sentinel() {
        let mut builder = GraphBuilder::new();
        builder.add_method(MethodSymbol::new("detached", SymbolId::INVALID));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_graph_json_roundtrip_keeps_ids() {
        let (graph, class, field, _) = sample_graph();
        let json = serde_json::to_string(&graph).unwrap();
        assert!(json.contains("\"category\":\"type\""));
        let loaded: SymbolGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, graph);
        assert_eq!(loaded.field_by_id(field).unwrap().declaring_type, class);
    }

    #[test]
    fn test_graph_json_rejects_duplicate_ids() {
        let json = r#"{"symbols": [
            {"id": 1, "category": "type", "kind": "class", "qualified_name": "A"},
            {"id": 1, "category": "type", "kind": "class", "qualified_name": "B"}
        ]}"#;
        assert!(serde_json::from_str::<SymbolGraph>(json).is_err());
    }

    #[test]
    fn test_find_top_level_type_ignores_case() {
        let (graph, class, _, _) = sample_graph();
        assert_eq!(graph.find_top_level_type("myclass"), Some(class));
        assert_eq!(graph.find_top_level_type("Other"), None);
    }

    #[test]
    fn test_variable_parent_must_be_method_or_type() {
        let json = r#"{"graph": {"symbols": [
            {"id": 1, "category": "type", "kind": "class", "qualified_name": "A",
             "declaration": {"name": "A", "file_path": "/p/A.cls", "line": 1, "column": 13}},
            {"id": 2, "category": "variable", "name": "x", "kind": "local", "parent": 2},
            {"id": 3, "category": "field", "name": "f", "declaring_type": 1},
            {"id": 4, "category": "variable", "name": "y", "kind": "local", "parent": 3}
        ]}}"#;
        let err = ResolvedProgram::from_json(json).unwrap_err();
        assert!(matches!(err, IndexerError::InvalidGraph(_)), "{err}");

        let mut builder = GraphBuilder::new();
        let class = builder.add_type(TypeSymbol::new(TypeKind::Class, "A"));
        let method = builder.add_method(MethodSymbol::new("run", class));
        builder.add_variable(VariableSymbol::parameter("p", method));
        builder.add_variable(VariableSymbol::local("init", class));
        builder.add_variable(VariableSymbol::local("loose", SymbolId::INVALID));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_from_json_rejects_dangling_links() {
        let json = r#"{"graph": {"symbols": [
            {"id": 1, "category": "method", "name": "m", "declaring_type": 7}
        ]}}"#;
        let err = ResolvedProgram::from_json(json).unwrap_err();
        assert!(matches!(err, IndexerError::InvalidGraph(_)), "{err}");
    }

    #[test]
    fn test_from_graph_at_max_id_reports_exhaustion() {
        let mut graph = SymbolGraph::new();
        graph
            .entities
            .insert(SymbolId(u32::MAX), Entity::Type(TypeSymbol::new(TypeKind::Class, "Last")));
        let mut builder = GraphBuilder::from_graph(graph);
        let id = builder.add_type(TypeSymbol::new(TypeKind::Class, "Extra"));
        assert_eq!(id, SymbolId::INVALID);
        let field = builder.add_field(FieldSymbol::new("f", SymbolId(u32::MAX)));
        assert_eq!(field, SymbolId::INVALID);
        let err = builder.build().unwrap_err();
        assert!(matches!(err, IndexerError::InvalidGraph(_)));
    }

    #[test]
    fn test_from_graph_continues_ids() {
        let (graph, _, _, method) = sample_graph();
        let mut builder = GraphBuilder::from_graph(graph);
        let next = builder.add_type(TypeSymbol::new(TypeKind::Interface, "Callable"));
        assert!(next > method);
    }
}
