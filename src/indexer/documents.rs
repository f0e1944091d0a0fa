//! Builds per-file documents from a resolved graph and its binding table.
//!
//! Two passes run over immutable inputs: definitions (every declared type and
//! member with a source file) and references (every recorded binding). The
//! builder then attaches metadata to the documents that define each symbol
//! and checks that every occurrence is covered.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::error::{IndexerError, Result};
use crate::graph::{
    BindingKind, BindingTable, Declaration, NodeId, SymbolGraph, SymbolId, SymbolKind,
    TypeSymbol,
};
use crate::index::{
    Document, InformationKind, Occurrence, Relationship, SymbolInformation, SymbolRole,
};

use super::locals::LocalAllocator;
use super::objects::is_metadata_descriptor;
use super::stdlib::is_foreign;
use super::symbols::scip_symbol;

/// Output of a finished build.
#[derive(Debug, Default)]
pub struct BuildOutput {
    pub documents: Vec<Document>,
    pub external_symbols: Vec<SymbolInformation>,
}

pub struct DocumentBuilder<'a> {
    graph: &'a SymbolGraph,
    binding: &'a BindingTable,
    project_root: PathBuf,
    locals: LocalAllocator,
    /// `(document, variable)` → local symbol, so repeated uses share one id.
    local_ids: HashMap<(String, SymbolId), String>,
    local_infos: BTreeMap<String, Vec<SymbolInformation>>,
    /// Global symbols whose metadata belongs to each document.
    defined: BTreeMap<String, BTreeSet<String>>,
    docs: BTreeMap<String, Document>,
    symbol_infos: BTreeMap<String, SymbolInformation>,
    external: BTreeMap<String, SymbolInformation>,
    /// Global symbols emitted by the references pass, with their entity.
    referenced: BTreeMap<String, SymbolId>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(graph: &'a SymbolGraph, binding: &'a BindingTable, project_root: &Path) -> Self {
        Self {
            graph,
            binding,
            project_root: project_root.to_path_buf(),
            locals: LocalAllocator::new(),
            local_ids: HashMap::new(),
            local_infos: BTreeMap::new(),
            defined: BTreeMap::new(),
            docs: BTreeMap::new(),
            symbol_infos: BTreeMap::new(),
            external: BTreeMap::new(),
            referenced: BTreeMap::new(),
        }
    }

    /// Runs both passes and finalizes.
    pub fn build(mut self) -> Result<BuildOutput> {
        self.build_definitions();
        self.build_references();
        self.finish()
    }

    fn relative_path(&self, path: &str) -> String {
        relative_path(&self.project_root, path)
    }

    fn doc_mut(&mut self, rel: &str) -> &mut Document {
        self.docs
            .entry(rel.to_string())
            .or_insert_with(|| Document::new(rel))
    }

    /// Records an occurrence for a 1-based `line`; line 0 means "no position".
    fn add_occurrence(
        &mut self,
        rel: &str,
        line: u32,
        column: u32,
        len: usize,
        symbol: &str,
        role: SymbolRole,
    ) -> bool {
        if line == 0 {
            tracing::debug!("No source line for {} in {}", symbol, rel);
            return false;
        }
        let end = column.saturating_add(u32::try_from(len).unwrap_or(u32::MAX));
        self.doc_mut(rel)
            .occurrences
            .push(Occurrence::new(line - 1, column, end, symbol, role));
        true
    }

    /// Registers metadata for a symbol defined in `rel`.
    fn define_symbol(
        &mut self,
        rel: &str,
        symbol: &str,
        display_name: &str,
        kind: InformationKind,
    ) -> &mut SymbolInformation {
        self.doc_mut(rel);
        self.defined
            .entry(rel.to_string())
            .or_default()
            .insert(symbol.to_string());
        self.symbol_infos
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolInformation::new(symbol, display_name, kind))
    }

    fn information_kind_of(&self, id: SymbolId) -> InformationKind {
        self.graph
            .symbol_kind(id)
            .map(information_kind)
            .unwrap_or_default()
    }

    // =====================================================
    // Definitions
    // =====================================================

    pub fn build_definitions(&mut self) {
        let graph = self.graph;
        for (id, ty) in graph.types() {
            self.define_type(id, ty);
            let owner_file = ty.source_file();
            for field in &ty.fields {
                self.define_member(*field, owner_file);
            }
            for method in &ty.methods {
                self.define_member(*method, owner_file);
            }
        }
    }

    fn define_type(&mut self, id: SymbolId, ty: &TypeSymbol) {
        let (Some(decl), Some(file)) = (ty.declaration.as_ref(), ty.source_file()) else {
            return;
        };
        if is_metadata_descriptor(file) {
            return;
        }
        let Some(symbol) = scip_symbol(self.graph, id) else {
            tracing::debug!("Skipping unnameable type {}", ty.qualified_name);
            return;
        };
        let rel = self.relative_path(file);
        self.add_occurrence(&rel, decl.line, decl.column, decl.name.len(), &symbol, SymbolRole::Definition);

        let implements: Vec<String> = ty
            .implements
            .iter()
            .filter_map(|target| self.relationship_target(*target))
            .collect();
        let extends: Vec<String> = ty
            .extends
            .iter()
            .filter_map(|target| self.relationship_target(*target))
            .collect();

        let kind = information_kind(ty.kind.symbol_kind());
        let info = self.define_symbol(&rel, &symbol, &decl.name, kind);
        attach_documentation(info, decl);
        for target in implements {
            push_relationship(info, Relationship::implementation(target));
        }
        for target in extends {
            push_relationship(info, Relationship::reference(target));
        }
    }

    /// Identifier of a supertype; foreign supertypes are kept as external symbols.
    fn relationship_target(&mut self, id: SymbolId) -> Option<String> {
        let symbol = scip_symbol(self.graph, id)?;
        if is_foreign(self.graph, id) {
            self.record_external(id, &symbol);
        }
        Some(symbol)
    }

    /// Defines a field or method declared in `owner_file` (or its own file).
    fn define_member(&mut self, id: SymbolId, owner_file: Option<&str>) {
        let Some(entity) = self.graph.get(id) else {
            return;
        };
        let Some(decl) = entity.declaration() else {
            tracing::debug!("No declaration for member {}", id);
            return;
        };
        let Some(file) = decl.source_file().or(owner_file) else {
            return;
        };
        if is_metadata_descriptor(file) || is_foreign(self.graph, id) {
            return;
        }
        let Some(symbol) = scip_symbol(self.graph, id) else {
            tracing::debug!("Skipping unnameable member {}", decl.name);
            return;
        };
        let rel = self.relative_path(file);
        self.add_occurrence(&rel, decl.line, decl.column, decl.name.len(), &symbol, SymbolRole::Definition);
        let kind = self.information_kind_of(id);
        let info = self.define_symbol(&rel, &symbol, &decl.name, kind);
        attach_documentation(info, decl);

        if let Some(method) = self.graph.method_by_id(id) {
            self.register_parameters(&rel, &method.parameters);
        }
    }

    /// Parameters carry no source span, so they get metadata but no occurrence.
    fn register_parameters(&mut self, rel: &str, parameters: &[SymbolId]) {
        for param in parameters {
            if self.graph.variable_by_id(*param).is_some() {
                self.local_for(rel, *param);
            }
        }
    }

    fn local_for(&mut self, rel: &str, id: SymbolId) -> String {
        let key = (rel.to_string(), id);
        if let Some(symbol) = self.local_ids.get(&key) {
            return symbol.clone();
        }
        let symbol = self.locals.next(rel);
        let (name, kind) = match self.graph.variable_by_id(id) {
            Some(var) => (var.name.as_str(), self.information_kind_of(id)),
            None => ("", InformationKind::Variable),
        };
        self.local_infos
            .entry(rel.to_string())
            .or_default()
            .push(SymbolInformation::new(&symbol, name, kind));
        self.local_ids.insert(key, symbol.clone());
        symbol
    }

    // =====================================================
    // References
    // =====================================================

    pub fn build_references(&mut self) {
        let binding = self.binding;
        for kind in BindingKind::ALL {
            for (node, target) in binding.bindings(kind) {
                self.add_reference(*node, *target);
            }
        }
    }

    fn add_reference(&mut self, node_id: NodeId, target: SymbolId) {
        let Some(node) = self.binding.node(node_id) else {
            tracing::debug!("Binding for unknown node {}", node_id);
            return;
        };
        if node.synthetic {
            return;
        }
        let Some(file) = self.binding.node_file(node_id) else {
            return;
        };
        if is_metadata_descriptor(file) || is_foreign(self.graph, target) {
            return;
        }
        let rel = self.relative_path(file);
        let Some(symbol) = self.resolve_symbol(target, &rel) else {
            return;
        };
        if self.add_occurrence(&rel, node.line, node.column, node.text.len(), &symbol, SymbolRole::ReadAccess)
            && self.graph.variable_by_id(target).is_none()
        {
            self.referenced.insert(symbol, target);
        }
    }

    fn resolve_symbol(&mut self, target: SymbolId, rel: &str) -> Option<String> {
        if let Some(symbol) = scip_symbol(self.graph, target) {
            return Some(symbol);
        }
        if self.graph.variable_by_id(target).is_some() {
            return Some(self.local_for(rel, target));
        }
        None
    }

    // =====================================================
    // Finalization
    // =====================================================

    fn record_external(&mut self, id: SymbolId, symbol: &str) {
        if self.external.contains_key(symbol) {
            return;
        }
        let Some(entity) = self.graph.get(id) else {
            return;
        };
        let info = SymbolInformation::new(symbol, entity.display_name(), self.information_kind_of(id));
        self.external.insert(symbol.to_string(), info);
    }

    /// Attaches metadata to documents and checks that every occurrence is covered.
    pub fn finish(mut self) -> Result<BuildOutput> {
        let docs = std::mem::take(&mut self.docs);
        let mut documents = Vec::with_capacity(docs.len());
        for (rel, mut doc) in docs {
            let defined = self.defined.remove(&rel).unwrap_or_default();
            let mut symbols: Vec<SymbolInformation> = defined
                .iter()
                .filter_map(|symbol| self.symbol_infos.get(symbol).cloned())
                .collect();
            symbols.extend(self.local_infos.remove(&rel).unwrap_or_default());
            doc.symbols = symbols;
            doc.occurrences.sort_by(|a, b| {
                (a.range, &a.symbol, a.symbol_roles).cmp(&(b.range, &b.symbol, b.symbol_roles))
            });
            documents.push(doc);
        }

        let covered: HashSet<String> = documents
            .iter()
            .flat_map(|d| d.symbols.iter().map(|si| si.symbol.clone()))
            .collect();
        let referenced = std::mem::take(&mut self.referenced);
        for (symbol, id) in referenced {
            if !covered.contains(&symbol) {
                self.record_external(id, &symbol);
            }
        }

        let external_symbols: Vec<SymbolInformation> = self.external.into_values().collect();
        verify_coverage(&documents, &external_symbols)?;
        Ok(BuildOutput {
            documents,
            external_symbols,
        })
    }
}

/// Fails if any occurrence names a symbol with no metadata in the index.
pub fn verify_coverage(documents: &[Document], external: &[SymbolInformation]) -> Result<()> {
    let known: HashSet<&str> = documents
        .iter()
        .flat_map(|d| d.symbols.iter())
        .chain(external)
        .map(|si| si.symbol.as_str())
        .collect();
    for doc in documents {
        if let Some(occ) = doc.occurrences.iter().find(|o| !known.contains(o.symbol.as_str())) {
            return Err(IndexerError::Invariant(format!(
                "occurrence of {} in {} at {:?} has no symbol information",
                occ.symbol, doc.relative_path, occ.range
            )));
        }
    }
    Ok(())
}

fn attach_documentation(info: &mut SymbolInformation, decl: &Declaration) {
    if let Some(doc) = decl.documentation() {
        if info.documentation.is_empty() {
            info.documentation.push(doc.to_string());
        }
    }
}

fn push_relationship(info: &mut SymbolInformation, relationship: Relationship) {
    if !info.relationships.contains(&relationship) {
        info.relationships.push(relationship);
    }
}

/// Maps a resolved-graph kind to the coarse kind exposed in the index.
pub fn information_kind(kind: SymbolKind) -> InformationKind {
    match kind {
        SymbolKind::Class | SymbolKind::Trigger => InformationKind::Class,
        SymbolKind::Interface => InformationKind::Interface,
        SymbolKind::Enum => InformationKind::Enum,
        SymbolKind::Method => InformationKind::Method,
        SymbolKind::Constructor => InformationKind::Constructor,
        SymbolKind::Field => InformationKind::Field,
        SymbolKind::Property => InformationKind::Property,
        SymbolKind::Parameter => InformationKind::Parameter,
        SymbolKind::LocalVariable => InformationKind::Variable,
        SymbolKind::EnumValue => InformationKind::EnumMember,
    }
}

/// Path of `path` relative to `root`, with `/` separators.
///
/// Both sides are normalized lexically first, so files outside `root` get
/// leading `..` segments. When no relative form exists (one side absolute and
/// the other not, or different drive prefixes) the path is kept as given.
pub fn relative_path(root: &Path, path: &str) -> String {
    let base = normalize(root);
    let full = normalize(Path::new(path));
    if base.is_absolute() != full.is_absolute() {
        return path.replace('\\', "/");
    }

    let base: Vec<Component<'_>> = base.components().collect();
    let full: Vec<Component<'_>> = full.components().collect();
    let common = base
        .iter()
        .zip(&full)
        .take_while(|(a, b)| a == b)
        .count();
    let anchored = |c: &Component<'_>| matches!(c, Component::Prefix(_) | Component::RootDir);
    if base[common..].iter().any(|c| anchored(c) || *c == Component::ParentDir)
        || full[common..].iter().any(anchored)
    {
        return path.replace('\\', "/");
    }

    let segments: Vec<String> = base[common..]
        .iter()
        .map(|_| "..".to_string())
        .chain(full[common..].iter().map(|c| c.as_os_str().to_string_lossy().into_owned()))
        .collect();
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}
