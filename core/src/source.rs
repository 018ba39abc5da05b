use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// `{class}/{file name}`, unique within the collection.
    pub doc_id: String,
    pub class_name: String,
    pub text: String,
}

#[derive(Debug, Clone)]
struct SourceEntry {
    doc_id: String,
    class_name: String,
    path: PathBuf,
}

/// A directory with one sub-directory per class and one file per document.
///
/// Entries are enumerated once, sorted by class then file name, so every
/// pass over the same directory sees documents in the same order. File
/// contents are read lazily by [`TextSource::documents`].
#[derive(Debug, Clone)]
pub struct TextSource {
    entries: Vec<SourceEntry>,
}

impl TextSource {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::open_excluding(root, &[])
    }

    /// Like [`TextSource::open`], but never yields anything at or below one
    /// of `excluded`. Index and run outputs written inside the source tree
    /// are passed here so they are not read back as documents.
    pub fn open_excluding<P: AsRef<Path>>(root: P, excluded: &[PathBuf]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::Input {
                path: root,
                source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }
        let absolute_root = fs::canonicalize(&root).map_err(|source| Error::Input { path: root.clone(), source })?;
        let excluded: HashSet<PathBuf> = excluded
            .iter()
            .filter_map(|path| absolute(path))
            .filter(|path| path.starts_with(&absolute_root) && *path != absolute_root)
            .collect();

        let mut entries = Vec::new();
        let walker = WalkDir::new(&root)
            .min_depth(2)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if entry.file_name().to_string_lossy().starts_with('.') {
                    return false;
                }
                match entry.path().strip_prefix(&root) {
                    Ok(relative) => !excluded.contains(&absolute_root.join(relative)),
                    Err(_) => true,
                }
            });
        for entry in walker {
            let entry = entry.map_err(|e| Error::Input { path: root.clone(), source: e.into() })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let class_name = match entry.path().parent().and_then(|p| p.file_name()) {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            entries.push(SourceEntry {
                doc_id: format!("{class_name}/{file_name}"),
                class_name,
                path: entry.into_path(),
            });
        }
        tracing::debug!(root = %root.display(), documents = entries.len(), "enumerated source");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads documents in enumeration order. Bytes that are not valid UTF-8
    /// are replaced rather than rejected.
    pub fn documents(&self) -> impl Iterator<Item = Result<Document>> + '_ {
        self.entries.iter().map(|entry| {
            let bytes = fs::read(&entry.path).map_err(|source| Error::Input { path: entry.path.clone(), source })?;
            Ok(Document {
                doc_id: entry.doc_id.clone(),
                class_name: entry.class_name.clone(),
                text: String::from_utf8_lossy(&bytes).into_owned(),
            })
        })
    }
}

/// Canonical form of `path`; a path that does not exist yet resolves
/// through its parent.
fn absolute(path: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(path) {
        return Some(path);
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(path.file_name()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn enumerates_sorted_class_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sci.space")).unwrap();
        fs::create_dir_all(dir.path().join("alt.atheism")).unwrap();
        fs::write(dir.path().join("sci.space/2"), "orbit").unwrap();
        fs::write(dir.path().join("sci.space/1"), "rocket").unwrap();
        fs::write(dir.path().join("alt.atheism/9"), b"caf\xe9").unwrap();
        fs::write(dir.path().join("stray.txt"), "ignored").unwrap();

        let source = TextSource::open(dir.path()).unwrap();
        let docs: Vec<Document> = source.documents().collect::<Result<_>>().unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["alt.atheism/9", "sci.space/1", "sci.space/2"]);
        assert_eq!(docs[0].class_name, "alt.atheism");
        assert_eq!(docs[0].text, "caf\u{fffd}");
        assert_eq!(docs[1].text, "rocket");
    }

    #[test]
    fn missing_directory_is_input_error() {
        let dir = tempdir().unwrap();
        let err = TextSource::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
    }

    #[test]
    fn skips_hidden_directories_and_files() {
        let dir = tempdir().unwrap();
        for path in [".git/HEAD", ".cache/x", "news/.hidden", "news/1"] {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "text").unwrap();
        }
        let source = TextSource::open(dir.path()).unwrap();
        let ids: Vec<String> = source.documents().map(|d| d.unwrap().doc_id).collect();
        assert_eq!(ids, vec!["news/1"]);
    }

    #[test]
    fn excluded_outputs_are_not_documents() {
        let dir = tempdir().unwrap();
        for path in ["news/1", "blocks/block0.bin.gz", "out/index.bin.gz", "out/kept"] {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "text").unwrap();
        }
        let excluded = vec![
            dir.path().join("blocks"),
            dir.path().join("out/index.bin.gz"),
            dir.path().join("out/index.meta.json"),
            dir.path().to_path_buf(),
        ];
        let source = TextSource::open_excluding(dir.path(), &excluded).unwrap();
        let ids: Vec<String> = source.documents().map(|d| d.unwrap().doc_id).collect();
        assert_eq!(ids, vec!["news/1", "out/kept"]);
        assert_eq!(source.len(), 2);
    }
}
