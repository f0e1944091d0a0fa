use std::collections::HashMap;

use super::symbols::local_symbol;

/// Hands out `local <n>` identifiers, numbered independently per document.
///
/// Numbers start at 1 and are never reused within a run.
#[derive(Debug, Default)]
pub struct LocalAllocator {
    counts: HashMap<String, u32>,
}

impl LocalAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused local identifier for the document at `relative_path`.
    pub fn next(&mut self, relative_path: &str) -> String {
        let count = self.counts.entry(relative_path.to_string()).or_insert(0);
        *count += 1;
        local_symbol(*count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_numbers_are_per_document() {
        let mut locals = LocalAllocator::new();
        assert_eq!(locals.next("A.cls"), "local 1");
        assert_eq!(locals.next("A.cls"), "local 2");
        assert_eq!(locals.next("B.cls"), "local 1");
        assert_eq!(locals.next("C.cls"), "local 1");
    }

    #[test]
    fn test_never_reuses_within_document() {
        let mut locals = LocalAllocator::new();
        let issued: HashSet<String> = (0..100).map(|_| locals.next("A.cls")).collect();
        assert_eq!(issued.len(), 100);
    }
}
