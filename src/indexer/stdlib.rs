//! Distinguishes project entities from standard-library and other foreign ones.

use crate::graph::{Entity, SymbolGraph, SymbolId};

/// Returns true if `id` does not originate in indexed project source.
///
/// Types are foreign when they have no declaring file. Members and variables
/// inherit the classification of their declaring type or parent. Unknown ids
/// and the invalid sentinel are foreign.
pub fn is_foreign(graph: &SymbolGraph, id: SymbolId) -> bool {
    if !id.is_valid() {
        return true;
    }
    match graph.get(id) {
        Some(Entity::Type(ty)) => ty.source_file().is_none(),
        Some(Entity::Method(method)) => is_foreign(graph, method.declaring_type),
        Some(Entity::Field(field)) => is_foreign(graph, field.declaring_type),
        Some(Entity::Variable(var)) => is_foreign(graph, var.parent),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        Declaration, FieldSymbol, GraphBuilder, MethodSymbol, TypeKind, TypeSymbol,
        VariableSymbol,
    };

    #[test]
    fn test_project_entities_are_not_foreign() {
        let mut builder = GraphBuilder::new();
        let class = builder.add_type(
            TypeSymbol::new(TypeKind::Class, "MyClass")
                .with_declaration(Declaration::at("MyClass", "/src/MyClass.cls", 1, 13)),
        );
        let method = builder.add_method(MethodSymbol::new("run", class));
        let field = builder.add_field(FieldSymbol::new("count", class));
        let local = builder.add_variable(VariableSymbol::local("i", method));
        let graph = builder.build().unwrap();

        for id in [class, method, field, local] {
            assert!(!is_foreign(&graph, id), "{id} should be local to the project");
        }
    }

    #[test]
    fn test_stdlib_entities_are_foreign() {
        let mut builder = GraphBuilder::new();
        let string = builder.add_type(
            TypeSymbol::new(TypeKind::Class, "System.String")
                .with_declaration(Declaration::new("String")),
        );
        let list = builder.add_type(TypeSymbol::new(TypeKind::Class, "System.List"));
        let method = builder.add_method(MethodSymbol::new("length", string));
        let field = builder.add_field(FieldSymbol::new("size", list));
        let param = builder.add_variable(VariableSymbol::parameter("s", method));
        let graph = builder.build().unwrap();

        for id in [string, list, method, field, param] {
            assert!(is_foreign(&graph, id), "{id} should be foreign");
        }
    }

    #[test]
    fn test_invalid_and_unknown_are_foreign() {
        let graph = GraphBuilder::new().build().unwrap();
        assert!(is_foreign(&graph, SymbolId::INVALID));
        assert!(is_foreign(&graph, SymbolId(17)));
    }

    #[test]
    fn test_empty_file_path_is_foreign() {
        let mut builder = GraphBuilder::new();
        let mut decl = Declaration::new("Ghost");
        decl.file_path = Some(String::new());
        let ghost = builder.add_type(TypeSymbol::new(TypeKind::Trigger, "Ghost").with_declaration(decl));
        let graph = builder.build().unwrap();
        assert!(is_foreign(&graph, ghost));
    }
}
