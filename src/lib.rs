pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod indexer;

pub use config::{IndexerConfig, Options, CONFIG_FILENAME};
pub use error::{IndexerError, Result};
pub use graph::{
    BindingKind, BindingTable, Declaration, Entity, FieldSymbol, GraphBuilder, MethodKind,
    MethodSymbol, ReferenceNode, ResolvedProgram, SymbolGraph, SymbolId, SymbolKind, TypeKind,
    TypeSymbol, VariableKind, VariableSymbol,
};
pub use index::{
    read_index, write_index, Document, Index, IndexStats, InformationKind, Occurrence,
    Relationship, SymbolInformation, SymbolRole,
};
pub use indexer::{build_index, run, DescriptorSet, DocumentBuilder};
