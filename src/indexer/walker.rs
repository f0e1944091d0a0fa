use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::Result;

use super::objects::DescriptorKind;

/// Finds metadata descriptor files below a source directory.
#[derive(Debug, Default)]
pub struct FileWalker;

impl FileWalker {
    pub fn new() -> Self {
        Self
    }

    /// Descriptor files under `root`, sorted by path. A missing root yields
    /// no files.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && self.is_supported(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        DescriptorKind::of(path).is_some()
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

    #[test]
    fn test_walk_finds_descriptors() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "objects/Invoice__c.object", "<CustomObject/>");
        create_file(temp_dir.path(), "objects/Thing__c/Thing__c.object-meta.xml", "<CustomObject/>");
        create_file(temp_dir.path(), "objects/Thing__c/fields/Size__c.field-meta.xml", "<CustomField/>");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_walk_ignores_code_and_other_metadata() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "classes/A.cls", "public class A {}");
        create_file(temp_dir.path(), "classes/A.cls-meta.xml", "<ApexClass/>");
        create_file(temp_dir.path(), "triggers/T.trigger", "trigger T on Account (before insert) {}");
        create_file(temp_dir.path(), "README.md", "# Readme");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_walk_is_sorted() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "z/Z__c.object", "");
        create_file(temp_dir.path(), "a/A__c.object", "");
        create_file(temp_dir.path(), "m/M__c.object", "");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_walk_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let files = FileWalker::new().walk(&temp_dir.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_walk_respects_gitignore() {
        let temp_dir = TempDir::new().unwrap();

        // .gitignore only applies inside a repository
        std::process::Command::new("git")
            .args(["init"])
            .current_dir(temp_dir.path())
            .output()
            .ok();

        create_file(temp_dir.path(), ".gitignore", ".sfdx/\nlegacy/\n");
        create_file(temp_dir.path(), "objects/Keep__c.object", "");
        create_file(temp_dir.path(), "legacy/Old__c.object", "");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"Keep__c.object".to_string()));
        assert!(!names.contains(&"Old__c.object".to_string()));
    }
}
