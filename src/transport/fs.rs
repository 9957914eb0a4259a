use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::source::{BINARY_SNIFF_BYTES, CORPUS_EXTENSION};
use crate::errors::PipelineError;

/// Filters applied while listing a corpus directory.
#[derive(Clone, Copy, Debug)]
pub struct ListingOptions {
    /// Skip files whose leading bytes look binary.
    pub skip_binary: bool,
    /// Stop after this many corpus files.
    pub max_files: Option<usize>,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            skip_binary: true,
            max_files: None,
        }
    }
}

/// Fail fast unless `root` exists and is a directory.
pub fn ensure_corpus_root(root: &Path) -> Result<(), PipelineError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(PipelineError::SourceNotFound {
            path: root.to_path_buf(),
        })
    }
}

/// List the corpus files directly inside `root`, sorted by file name.
///
/// Sub-directories are not entered. Entries that cannot be inspected are
/// logged and skipped.
pub fn list_corpus_files(
    root: &Path,
    options: ListingOptions,
) -> Result<Vec<PathBuf>, PipelineError> {
    ensure_corpus_root(root)?;
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if !is_corpus_file(&path) {
            continue;
        }
        if options.skip_binary && looks_binary(&path) {
            debug!(path = %path.display(), "skipping binary corpus candidate");
            continue;
        }
        files.push(path);
        if options.max_files.is_some_and(|max| files.len() >= max) {
            break;
        }
    }
    Ok(files)
}

/// True if the path has a `.csv` extension (case-insensitive).
pub fn is_corpus_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(CORPUS_EXTENSION))
        .unwrap_or(false)
}

/// Best-effort binary sniff: a NUL byte among the leading bytes.
///
/// Unreadable files report `false` so the decoder surfaces the real error.
pub fn looks_binary(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut buf = vec![0u8; BINARY_SNIFF_BYTES];
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(_) => return false,
        }
    }
    buf[..filled].contains(&0)
}

/// File name of `path` as UTF-8, or the lossy display form.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_root_is_source_not_found() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            ensure_corpus_root(&missing),
            Err(PipelineError::SourceNotFound { .. })
        ));

        let file = temp.path().join("plain.csv");
        fs::write(&file, "1,male,20,Leo,hi").unwrap();
        assert!(matches!(
            list_corpus_files(&file, ListingOptions::default()),
            Err(PipelineError::SourceNotFound { .. })
        ));
    }

    #[test]
    fn listing_skips_directories_other_extensions_and_binary_files() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested/9.male.30.Leo.csv"), "9,male,30,Leo,deep").unwrap();
        fs::write(root.join("b.csv"), "2,male,20,Leo,hello").unwrap();
        fs::write(root.join("a.CSV"), "1,female,19,Aries,hi").unwrap();
        fs::write(root.join("notes.txt"), "not a corpus file").unwrap();
        fs::write(root.join("blob.csv"), [0u8, 159, 146, 150]).unwrap();

        let files = list_corpus_files(root, ListingOptions::default()).unwrap();
        let names: Vec<String> = files.iter().map(|path| file_name_string(path)).collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);

        let keep_binary = ListingOptions {
            skip_binary: false,
            max_files: None,
        };
        assert_eq!(list_corpus_files(root, keep_binary).unwrap().len(), 3);
    }

    #[test]
    fn listing_honors_max_files() {
        let temp = tempdir().unwrap();
        for idx in 0..4 {
            fs::write(
                temp.path().join(format!("{idx}.male.20.Leo.csv")),
                "x,male,20,Leo,y",
            )
            .unwrap();
        }
        let options = ListingOptions {
            skip_binary: true,
            max_files: Some(2),
        };
        assert_eq!(list_corpus_files(temp.path(), options).unwrap().len(), 2);
    }
}
