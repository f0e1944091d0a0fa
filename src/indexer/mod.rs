pub mod documents;
pub mod locals;
pub mod objects;
pub mod stdlib;
pub mod symbols;
pub mod walker;

use std::path::Path;

pub use documents::{relative_path, verify_coverage, BuildOutput, DocumentBuilder};
pub use locals::LocalAllocator;
pub use objects::{is_metadata_descriptor, DescriptorKind, DescriptorSet};
pub use stdlib::is_foreign;
pub use symbols::{escape_name, local_symbol, scip_symbol, unescape_name, SYMBOL_PREFIX};
pub use walker::FileWalker;

use crate::config::Options;
use crate::error::{IndexerError, Result};
use crate::graph::{BindingTable, ResolvedProgram, SymbolGraph};
use crate::index::{write_index, Index, IndexStats, Metadata, ProtocolVersion, TextEncoding, ToolInfo};

pub const TOOL_NAME: &str = "scip-apex";

/// Builds the index for one resolved program.
pub fn build_index(
    graph: &SymbolGraph,
    binding: &BindingTable,
    project_root: &Path,
    arguments: &[String],
) -> Result<Index> {
    let output = DocumentBuilder::new(graph, binding, project_root).build()?;
    Ok(Index {
        metadata: Metadata {
            version: ProtocolVersion::Unspecified,
            tool_info: ToolInfo {
                name: TOOL_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                arguments: arguments.to_vec(),
            },
            project_root: format!("file://{}", project_root.to_string_lossy().replace('\\', "/")),
            text_document_encoding: TextEncoding::Utf8,
        },
        documents: output.documents,
        external_symbols: output.external_symbols,
    })
}

/// Loads the resolved program, folds in descriptors, and writes the index.
pub fn run(options: &Options) -> Result<IndexStats> {
    let program = ResolvedProgram::load(&options.resolved)?;
    tracing::debug!(
        "Loaded {} symbols and {} bindings from {}",
        program.graph.len(),
        program.binding.len(),
        options.resolved.display()
    );

    let descriptors = if options.metadata_descriptors {
        DescriptorSet::load(options.source_dirs.as_slice())?
    } else {
        DescriptorSet::new()
    };
    if !program.has_sources() && descriptors.is_empty() {
        return Err(IndexerError::NoSources(options.resolved.display().to_string()));
    }

    let graph = descriptors.fold_into(program.graph)?;
    let index = build_index(&graph, &program.binding, &options.project_root, &options.arguments)?;
    let bytes = write_index(&index, &options.output)?;

    let stats = IndexStats::from_index(&index);
    tracing::info!(
        "Indexed {} documents ({} occurrences, {} external symbols) into {} ({} bytes)",
        stats.documents,
        stats.occurrences,
        stats.external_symbols,
        options.output.display(),
        bytes
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Declaration, GraphBuilder, TypeKind, TypeSymbol};

    #[test]
    fn test_build_index_metadata() {
        let mut builder = GraphBuilder::new();
        builder.add_type(
            TypeSymbol::new(TypeKind::Class, "A")
                .with_declaration(Declaration::at("A", "/proj/src/A.cls", 1, 13)),
        );
        let graph = builder.build().unwrap();
        let args = vec!["scip-apex".to_string(), "index".to_string()];

        let index = build_index(&graph, &BindingTable::new(), Path::new("/proj"), &args).unwrap();
        assert_eq!(index.metadata.tool_info.name, "scip-apex");
        assert_eq!(index.metadata.tool_info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(index.metadata.tool_info.arguments, args);
        assert_eq!(index.metadata.project_root, "file:///proj");
        assert_eq!(index.metadata.text_document_encoding, TextEncoding::Utf8);
        assert_eq!(index.documents.len(), 1);
        assert_eq!(index.documents[0].relative_path, "src/A.cls");
        assert_eq!(index.documents[0].language, "apex");
    }

    #[test]
    fn test_empty_graph_gives_empty_index() {
        let index = build_index(&SymbolGraph::new(), &BindingTable::new(), Path::new("/p"), &[]).unwrap();
        assert!(index.documents.is_empty());
        assert!(index.external_symbols.is_empty());
    }
}
