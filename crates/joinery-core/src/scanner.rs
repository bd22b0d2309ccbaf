//! Directory scanner for discovering CSV files

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively discover CSV files under one or more root directories.
///
/// The result is sorted by path so downstream indexing is deterministic.
pub fn discover_files<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in roots {
        for entry in WalkDir::new(root.as_ref()).follow_links(true) {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_only_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.csv"), "y\n2\n").unwrap();

        let files = discover_files(&[dir.path()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));
        assert!(files[1].ends_with("b.csv"));
    }

    #[test]
    fn test_discover_result_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zz.csv"), "x\n").unwrap();
        fs::write(dir.path().join("aa.csv"), "x\n").unwrap();

        let files = discover_files(&[dir.path()]).unwrap();
        assert!(files[0].ends_with("aa.csv"));
        assert!(files[1].ends_with("zz.csv"));
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let files = discover_files(&[dir.path()]).unwrap();
        assert!(files.is_empty());
    }
}
