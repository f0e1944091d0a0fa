//! Canonical symbol identifiers.
//!
//! A global identifier is `"scip-apex apex . . "` followed by a descriptor:
//! one segment per enclosing type terminated by `#`, then `name().` for
//! methods or `name.` for fields. Segments containing characters outside
//! `[A-Za-z0-9_+\-$]` are wrapped in backticks with inner backticks doubled.
//! Parameters and locals have no global identifier; they use `local <n>`.

use std::borrow::Cow;

use crate::graph::{Entity, MethodKind, SymbolGraph, SymbolId};

pub const SCHEME: &str = "scip-apex";
pub const MANAGER: &str = "apex";
pub const PACKAGE: &str = ".";
pub const VERSION: &str = ".";

/// `"<scheme> <manager> <package> <version> "`, shared by every global symbol.
pub const SYMBOL_PREFIX: &str = "scip-apex apex . . ";

/// Reserved method name for constructors; not a valid Apex identifier.
pub const CONSTRUCTOR_NAME: &str = "<init>";

const LOCAL_PREFIX: &str = "local ";

/// Returns the global identifier of `id`, or `None` if it cannot be named.
pub fn scip_symbol(graph: &SymbolGraph, id: SymbolId) -> Option<String> {
    if !id.is_valid() {
        return None;
    }
    let descriptors = descriptors_for(graph, id)?;
    Some(format!("{SYMBOL_PREFIX}{descriptors}"))
}

/// Descriptor part of the identifier of `id`.
pub fn descriptors_for(graph: &SymbolGraph, id: SymbolId) -> Option<String> {
    match graph.get(id)? {
        Entity::Type(ty) => type_descriptors(&ty.qualified_name),
        Entity::Method(method) => {
            let parent = descriptors_for(graph, method.declaring_type)?;
            let name = match method.kind {
                MethodKind::Constructor => escape_name(CONSTRUCTOR_NAME),
                MethodKind::Method if method.name.is_empty() => return None,
                MethodKind::Method => escape_name(&method.name),
            };
            Some(format!("{parent}{name}()."))
        }
        Entity::Field(field) => {
            if field.name.is_empty() {
                return None;
            }
            let parent = descriptors_for(graph, field.declaring_type)?;
            Some(format!("{parent}{}.", escape_name(&field.name)))
        }
        Entity::Variable(_) => None,
    }
}

fn type_descriptors(qualified_name: &str) -> Option<String> {
    let mut out = String::with_capacity(qualified_name.len() + 4);
    for part in qualified_name.split('.') {
        if part.is_empty() {
            return None;
        }
        out.push_str(&escape_name(part));
        out.push('#');
    }
    Some(out)
}

/// Document-scoped identifier number `n`.
pub fn local_symbol(n: u32) -> String {
    format!("{LOCAL_PREFIX}{n}")
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '+' | '-' | '$')
}

/// Quotes `name` if it contains anything outside the safe identifier set.
pub fn escape_name(name: &str) -> Cow<'_, str> {
    if name.chars().all(is_ident_char) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

/// Inverse of [`escape_name`] for a single segment.
pub fn unescape_name(segment: &str) -> Option<String> {
    if let Some(inner) = segment
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
    {
        if inner.replace("``", "").contains('`') {
            return None;
        }
        return Some(inner.replace("``", "`"));
    }
    if segment.chars().all(is_ident_char) {
        Some(segment.to_string())
    } else {
        None
    }
}

/// One parsed descriptor segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Type(String),
    Method(String),
    Term(String),
}

/// Parses a global identifier into its descriptor segments.
pub fn parse_symbol(symbol: &str) -> Option<Vec<Descriptor>> {
    parse_descriptors(symbol.strip_prefix(SYMBOL_PREFIX)?)
}

/// Parses a descriptor string, failing on any malformed segment.
pub fn parse_descriptors(descriptors: &str) -> Option<Vec<Descriptor>> {
    let mut out = Vec::new();
    let mut chars = descriptors.chars().peekable();
    while chars.peek().is_some() {
        let mut name = String::new();
        if chars.peek() == Some(&'`') {
            chars.next();
            loop {
                match chars.next()? {
                    '`' if chars.peek() == Some(&'`') => {
                        chars.next();
                        name.push('`');
                    }
                    '`' => break,
                    ch => name.push(ch),
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !is_ident_char(ch) {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                return None;
            }
        }
        let descriptor = match chars.next()? {
            '#' => Descriptor::Type(name),
            '.' => Descriptor::Term(name),
            '(' => {
                if chars.next()? != ')' || chars.next()? != '.' {
                    return None;
                }
                Descriptor::Method(name)
            }
            _ => return None,
        };
        out.push(descriptor);
    }
    Some(out)
}
