//! Locating style sources by name.

use std::fs;
use std::io;
use std::path::PathBuf;

use walkdir::WalkDir;

/// Maps a style name (`plain`, not `plain.bst`) to its source text.
///
/// The compiler proper never touches the filesystem; drivers hand it a
/// resolver instead so tests and embedders can supply sources from
/// memory.
pub trait Resolver {
    fn find(&self, name: &str) -> io::Result<String>;
}

/// Searches a list of root directories, recursively, for `<name>.bst`.
/// Roots are searched in order and the first match wins.
pub struct DirResolver {
    roots: Vec<PathBuf>,
}

impl DirResolver {
    pub fn new(roots: Vec<PathBuf>) -> DirResolver {
        DirResolver { roots }
    }
}

impl Resolver for DirResolver {
    fn find(&self, name: &str) -> io::Result<String> {
        let file_name = format!("{name}.bst");
        for root in &self.roots {
            for entry in WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
            {
                if entry.file_type().is_file()
                    && entry.file_name().to_str() == Some(file_name.as_str())
                {
                    return fs::read_to_string(entry.path());
                }
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no '{file_name}' under the search roots"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_a_style_in_a_nested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("styles/classic");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("plain.bst"), "EXECUTE {skip$}").expect("write");

        let resolver = DirResolver::new(vec![dir.path().to_path_buf()]);
        assert_eq!(resolver.find("plain").expect("find"), "EXECUTE {skip$}");
    }

    #[test]
    fn earlier_roots_shadow_later_ones() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        fs::write(first.path().join("plain.bst"), "READ").expect("write");
        fs::write(second.path().join("plain.bst"), "SORT").expect("write");

        let resolver = DirResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(resolver.find("plain").expect("find"), "READ");
    }

    #[test]
    fn reports_not_found_for_a_missing_style() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = DirResolver::new(vec![dir.path().to_path_buf()]);
        let err = resolver.find("nonesuch").expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
