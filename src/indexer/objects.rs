//! Custom-object metadata descriptors.
//!
//! Three layouts are recognized:
//! - `Foo.object`: a full object definition whose `<fields><fullName>`
//!   entries become fields without their own file
//! - `Foo.object-meta.xml`: declares object `Foo` in that file
//! - `objects/Foo/fields/Bar.field-meta.xml`: declares field `Bar` of `Foo`
//!
//! Descriptors are merged by case-insensitive name and folded into the
//! resolved graph so that references to custom objects can be named.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{IndexerError, Result};
use crate::graph::{Declaration, FieldSymbol, GraphBuilder, SymbolGraph, SymbolId, TypeKind, TypeSymbol};

use super::walker::FileWalker;

const OBJECT_SUFFIX: &str = ".object";
const OBJECT_META_SUFFIX: &str = ".object-meta.xml";
const FIELD_META_SUFFIX: &str = ".field-meta.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// `Foo.object`
    Object,
    /// `Foo.object-meta.xml`
    ObjectMeta,
    /// `objects/Foo/fields/Bar.field-meta.xml`
    FieldMeta,
}

impl DescriptorKind {
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(OBJECT_META_SUFFIX) {
            Some(Self::ObjectMeta)
        } else if name.ends_with(FIELD_META_SUFFIX) {
            Some(Self::FieldMeta)
        } else if name.ends_with(OBJECT_SUFFIX) {
            Some(Self::Object)
        } else {
            None
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Object => OBJECT_SUFFIX,
            Self::ObjectMeta => OBJECT_META_SUFFIX,
            Self::FieldMeta => FIELD_META_SUFFIX,
        }
    }
}

/// True for files that describe metadata rather than code. Such files never
/// become documents.
pub fn is_metadata_descriptor(path: &str) -> bool {
    DescriptorKind::of(Path::new(path)).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub name: String,
    pub file: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl ObjectDescriptor {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            file: None,
            fields: Vec::new(),
        }
    }

    fn add_field(&mut self, name: &str, file: Option<String>) {
        match self
            .fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => {
                if existing.file.is_none() {
                    existing.file = file;
                }
            }
            None => self.fields.push(FieldDescriptor {
                name: name.to_string(),
                file,
            }),
        }
    }
}

/// All descriptors found under a set of directories, keyed by lowercased name.
#[derive(Debug, Default)]
pub struct DescriptorSet {
    objects: BTreeMap<String, ObjectDescriptor>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `dirs` and ingests every descriptor file. Files that cannot be
    /// read or parsed are logged and skipped.
    pub fn load<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let walker = FileWalker::new();
        let mut set = Self::new();
        for dir in dirs {
            for path in walker.walk(dir.as_ref())? {
                if let Err(e) = set.add_file(&path) {
                    tracing::warn!("Skipping descriptor {}: {}", path.display(), e);
                }
            }
        }
        tracing::debug!("Loaded {} object descriptors", set.len());
        Ok(set)
    }

    /// Ingests one descriptor file. Non-descriptor paths are ignored.
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let Some(kind) = DescriptorKind::of(path) else {
            return Ok(());
        };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = &file_name[..file_name.len() - kind.suffix().len()];
        if stem.is_empty() {
            return Err(IndexerError::Parse(format!("unnamed descriptor {}", path.display())));
        }
        let absolute = std::path::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();

        match kind {
            DescriptorKind::Object => {
                let fields = parse_object_fields(&std::fs::read_to_string(path)?)?;
                let object = self.object_mut(stem, Some(absolute));
                for field in fields {
                    object.add_field(&field, None);
                }
            }
            DescriptorKind::ObjectMeta => {
                self.object_mut(stem, Some(absolute));
            }
            DescriptorKind::FieldMeta => {
                let object_name = path
                    .parent()
                    .and_then(Path::parent)
                    .and_then(Path::file_name)
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| {
                        IndexerError::Parse(format!("no object directory for {}", path.display()))
                    })?;
                check_xml(&std::fs::read_to_string(path)?)?;
                self.object_mut(object_name, None)
                    .add_field(stem, Some(absolute));
            }
        }
        Ok(())
    }

    fn object_mut(&mut self, name: &str, file: Option<String>) -> &mut ObjectDescriptor {
        let object = self
            .objects
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| ObjectDescriptor::new(name));
        if object.file.is_none() {
            object.file = file;
        }
        object
    }

    pub fn get(&self, name: &str) -> Option<&ObjectDescriptor> {
        self.objects.get(&name.to_ascii_lowercase())
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectDescriptor> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Adds the descriptors to `graph`.
    ///
    /// An object whose name matches an existing top-level type (ignoring case)
    /// extends that type, filling in its file if it had none. Fields are
    /// matched the same way.
    pub fn fold_into(&self, graph: SymbolGraph) -> Result<SymbolGraph> {
        if self.is_empty() {
            return Ok(graph);
        }
        let mut builder = GraphBuilder::from_graph(graph);
        for object in self.objects() {
            let type_id = fold_object(&mut builder, object);
            for field in &object.fields {
                fold_field(&mut builder, type_id, field);
            }
        }
        builder.build()
    }
}

fn descriptor_declaration(name: &str, file: Option<&String>) -> Declaration {
    match file {
        Some(file) => Declaration::at(name, file.as_str(), 1, 0),
        None => Declaration {
            line: 1,
            ..Declaration::new(name)
        },
    }
}

fn fold_object(builder: &mut GraphBuilder, object: &ObjectDescriptor) -> SymbolId {
    let existing = builder.graph().find_top_level_type(&object.name);
    let Some(id) = existing else {
        return builder.add_type(
            TypeSymbol::new(TypeKind::Class, object.name.as_str())
                .with_declaration(descriptor_declaration(&object.name, object.file.as_ref())),
        );
    };
    if let (Some(ty), Some(file)) = (builder.type_mut(id), object.file.as_ref()) {
        if ty.source_file().is_none() {
            let name = ty.simple_name().to_string();
            ty.declaration = Some(descriptor_declaration(&name, Some(file)));
        }
    }
    id
}

fn fold_field(builder: &mut GraphBuilder, type_id: SymbolId, field: &FieldDescriptor) {
    let existing = builder.graph().type_by_id(type_id).and_then(|ty| {
        ty.fields.iter().copied().find(|id| {
            builder
                .graph()
                .field_by_id(*id)
                .is_some_and(|f| f.name.eq_ignore_ascii_case(&field.name))
        })
    });
    match existing {
        Some(id) => {
            if let (Some(symbol), Some(file)) = (builder.field_mut(id), field.file.as_ref()) {
                let has_file = symbol
                    .declaration
                    .as_ref()
                    .and_then(Declaration::source_file)
                    .is_some();
                if !has_file {
                    let name = symbol.name.clone();
                    symbol.declaration = Some(descriptor_declaration(&name, Some(file)));
                }
            }
        }
        None => {
            builder.add_field(
                FieldSymbol::new(field.name.as_str(), type_id)
                    .with_declaration(descriptor_declaration(&field.name, field.file.as_ref())),
            );
        }
    }
}

/// Names of the fields declared in a `.object` document.
pub fn parse_object_fields(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut fields = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_root = true;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(name);
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                if is_field_full_name(&stack) {
                    let text = e
                        .unescape()
                        .map_err(|e| IndexerError::Xml(format!("bad text: {e}")))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        fields.push(text.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IndexerError::Xml(format!(
                    "parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(IndexerError::Xml("no root element".to_string()));
    }
    if let Some(open) = stack.last() {
        return Err(IndexerError::Xml(format!("unclosed element <{open}>")));
    }
    Ok(fields)
}

/// `<CustomObject><fields><fullName>`
fn is_field_full_name(stack: &[String]) -> bool {
    matches!(stack, [_, fields, full_name] if fields == "fields" && full_name == "fullName")
}

/// Checks that `content` is a well-formed XML document.
fn check_xml(content: &str) -> Result<()> {
    let mut reader = Reader::from_str(content);
    let mut saw_root = false;
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                saw_root = true;
                depth += 1;
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IndexerError::Xml(format!(
                    "parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }
    match (saw_root, depth) {
        (false, _) => Err(IndexerError::Xml("no root element".to_string())),
        (true, 0) => Ok(()),
        (true, _) => Err(IndexerError::Xml("unclosed element".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const OBJECT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CustomObject xmlns="http://soap.sforce.com/2006/04/metadata">
    <label>Invoice</label>
    <fields>
        <fullName>Amount__c</fullName>
        <type>Currency</type>
    </fields>
    <fields>
        <fullName>Status__c</fullName>
    </fields>
    <listViews>
        <fullName>All</fullName>
    </listViews>
</CustomObject>
"#;

    const FIELD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CustomField xmlns="http://soap.sforce.com/2006/04/metadata">
    <fullName>CustomField__c</fullName>
</CustomField>
"#;

    #[test]
    fn test_descriptor_kind() {
        assert_eq!(DescriptorKind::of(Path::new("a/Invoice__c.object")), Some(DescriptorKind::Object));
        assert_eq!(
            DescriptorKind::of(Path::new("a/Invoice__c.object-meta.xml")),
            Some(DescriptorKind::ObjectMeta)
        );
        assert_eq!(
            DescriptorKind::of(Path::new("objects/X/fields/Y.field-meta.xml")),
            Some(DescriptorKind::FieldMeta)
        );
        assert_eq!(DescriptorKind::of(Path::new("classes/A.cls")), None);
        assert_eq!(DescriptorKind::of(Path::new("classes/A.cls-meta.xml")), None);
        assert!(is_metadata_descriptor("/p/objects/X/X.object-meta.xml"));
        assert!(!is_metadata_descriptor("/p/classes/A.cls"));
    }

    #[test]
    fn test_parse_object_fields() {
        let fields = parse_object_fields(OBJECT_XML).unwrap();
        assert_eq!(fields, vec!["Amount__c", "Status__c"]);
    }

    #[test]
    fn test_parse_object_fields_rejects_malformed() {
        assert!(parse_object_fields("<CustomObject><fields></CustomObject>").is_err());
        assert!(parse_object_fields("").is_err());
    }

    #[test]
    fn test_load_all_layouts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_file(root, "objects/Invoice__c.object", OBJECT_XML);
        create_file(
            root,
            "force-app/objects/TestObject__c/TestObject__c.object-meta.xml",
            "<CustomObject/>",
        );
        create_file(
            root,
            "force-app/objects/TestObject__c/fields/CustomField__c.field-meta.xml",
            FIELD_XML,
        );
        create_file(root, "classes/A.cls", "public class A {}");

        let set = DescriptorSet::load(&[root]).unwrap();
        assert_eq!(set.len(), 2);

        let invoice = set.get("invoice__c").unwrap();
        assert!(invoice.file.as_deref().unwrap().ends_with("Invoice__c.object"));
        assert_eq!(invoice.fields.len(), 2);
        assert!(invoice.fields.iter().all(|f| f.file.is_none()));

        let test_object = set.get("TestObject__c").unwrap();
        assert!(test_object.file.as_deref().unwrap().ends_with("TestObject__c.object-meta.xml"));
        assert_eq!(test_object.fields[0].name, "CustomField__c");
        assert!(test_object.fields[0]
            .file
            .as_deref()
            .unwrap()
            .ends_with("CustomField__c.field-meta.xml"));
    }

    #[test]
    fn test_malformed_descriptor_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "Broken__c.object", "<CustomObject><fields>");
        create_file(temp_dir.path(), "Good__c.object", OBJECT_XML);

        let set = DescriptorSet::load(&[temp_dir.path()]).unwrap();
        assert!(set.get("Broken__c").is_none());
        assert!(set.get("Good__c").is_some());
    }

    #[test]
    fn test_field_before_object_keeps_object_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_file(root, "objects/Thing__c/fields/Size__c.field-meta.xml", FIELD_XML);
        create_file(root, "objects/Thing__c/fields/size__C.field-meta.xml", FIELD_XML);

        let mut set = DescriptorSet::new();
        set.add_file(&root.join("objects/Thing__c/fields/Size__c.field-meta.xml")).unwrap();
        assert!(set.get("Thing__c").unwrap().file.is_none());

        create_file(root, "objects/Thing__c/Thing__c.object-meta.xml", "<CustomObject/>");
        set.add_file(&root.join("objects/Thing__c/Thing__c.object-meta.xml")).unwrap();
        set.add_file(&root.join("objects/Thing__c/fields/size__C.field-meta.xml")).unwrap();

        let thing = set.get("thing__c").unwrap();
        assert!(thing.file.is_some());
        assert_eq!(thing.fields.len(), 1);
    }

    #[test]
    fn test_fold_creates_types_and_fields() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "Invoice__c.object", OBJECT_XML);
        let set = DescriptorSet::load(&[temp_dir.path()]).unwrap();

        let graph = set.fold_into(SymbolGraph::new()).unwrap();
        let id = graph.find_top_level_type("INVOICE__C").unwrap();
        let ty = graph.type_by_id(id).unwrap();
        assert_eq!(ty.kind, TypeKind::Class);
        assert!(ty.source_file().unwrap().ends_with("Invoice__c.object"));
        assert_eq!(ty.declaration.as_ref().unwrap().line, 1);

        let names: Vec<&str> = ty
            .fields
            .iter()
            .map(|f| graph.field_by_id(*f).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["Amount__c", "Status__c"]);
    }

    #[test]
    fn test_fold_merges_with_existing_type() {
        let mut builder = GraphBuilder::new();
        let account = builder.add_type(TypeSymbol::new(TypeKind::Class, "Account"));
        let name = builder.add_field(FieldSymbol::new("Name", account));
        let graph = builder.build().unwrap();
        let before = graph.len();

        let mut set = DescriptorSet::new();
        set.object_mut("account", Some("/p/objects/Account/Account.object-meta.xml".into()))
            .add_field("name", Some("/p/objects/Account/fields/Name.field-meta.xml".into()));
        set.object_mut("Account", None).add_field("Rating__c", None);

        let graph = set.fold_into(graph).unwrap();
        assert_eq!(graph.len(), before + 1);
        let ty = graph.type_by_id(account).unwrap();
        assert_eq!(ty.source_file(), Some("/p/objects/Account/Account.object-meta.xml"));
        assert_eq!(ty.fields.len(), 2);
        let field = graph.field_by_id(name).unwrap();
        assert_eq!(
            field.declaration.as_ref().and_then(Declaration::source_file),
            Some("/p/objects/Account/fields/Name.field-meta.xml")
        );
    }

    #[test]
    fn test_fold_fails_when_ids_are_exhausted() {
        let json = r#"{"symbols": [
            {"id": 4294967295, "category": "type", "kind": "class", "qualified_name": "Last"}
        ]}"#;
        let graph: SymbolGraph = serde_json::from_str(json).unwrap();

        let mut set = DescriptorSet::new();
        set.object_mut("Invoice__c", Some("/p/objects/Invoice__c/Invoice__c.object-meta.xml".into()));
        let err = set.fold_into(graph).unwrap_err();
        assert!(matches!(err, IndexerError::InvalidGraph(_)), "{err}");
    }

        #[test]
    fn test_fold_empty_set_is_identity() {
        let mut builder = GraphBuilder::new();
        builder.add_type(TypeSymbol::new(TypeKind::Class, "A"));
        let graph = builder.build().unwrap();
        assert_eq!(DescriptorSet::new().fold_into(graph.clone()).unwrap(), graph);
    }
}
