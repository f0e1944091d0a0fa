pub mod models;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
pub use models::*;

/// Serializes `index` as JSON into `path`, returning the number of bytes written.
pub fn write_index(index: &Index, path: &Path) -> Result<usize> {
    let data = serde_json::to_vec_pretty(index)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(data.len() + 1)
}

/// Reads an index previously written by [`write_index`].
pub fn read_index(path: &Path) -> Result<Index> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/index.json");

        let mut doc = Document::new("src/A.cls");
        doc.occurrences
            .push(Occurrence::new(0, 13, 14, "scip-apex apex . . A#", SymbolRole::Definition));
        let index = Index {
            documents: vec![doc],
            ..Default::default()
        };

        let written = write_index(&index, &path).unwrap();
        assert_eq!(written as u64, std::fs::metadata(&path).unwrap().len());
        assert_eq!(read_index(&path).unwrap(), index);
    }

    #[test]
    fn test_read_missing_index_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_index(&temp_dir.path().join("nope.json")).is_err());
    }
}
