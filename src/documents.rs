//! Document discovery and frontmatter loading.

use crate::config::{InputConfig, OnError};
use crate::frontmatter::{self, FrontmatterError};
use crate::log;
use crate::logger::ProgressBar;
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid frontmatter in `{path}`")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

/// Documents read in one run.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    /// Frontmatter maps in path order.
    pub documents: Vec<Value>,
    /// Documents without any frontmatter block.
    pub without_frontmatter: Vec<PathBuf>,
    /// Documents left out under `on_error = "skip"`.
    pub skipped: Vec<PathBuf>,
}

/// All files under `input.dir` with an accepted extension, sorted by path.
pub fn discover(input: &InputConfig) -> Vec<PathBuf> {
    WalkDir::new(&input.dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| input.accepts(path))
        .collect()
}

/// Read one document's frontmatter.
pub fn read_document(path: &Path) -> Result<Option<Value>, DocumentError> {
    let text = fs::read_to_string(path).map_err(|err| DocumentError::Io(path.to_path_buf(), err))?;
    frontmatter::extract(&text).map_err(|source| DocumentError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every file in parallel, then apply the error policy in path order.
///
/// Under `Abort` the first failing document (by path) is returned.
pub fn load(files: &[PathBuf], on_error: OnError) -> Result<LoadedDocuments, DocumentError> {
    let progress = ProgressBar::new("input", files.len());
    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            let result = read_document(path);
            progress.inc();
            result
        })
        .collect();
    progress.finish();

    let mut loaded = LoadedDocuments::default();
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(Some(document)) => loaded.documents.push(document),
            Ok(None) => loaded.without_frontmatter.push(path.clone()),
            Err(err) if on_error == OnError::Skip => {
                log!("warn"; "skipping {}: {}", path.display(), error_chain(&err));
                loaded.skipped.push(path.clone());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(loaded)
}

/// `err: cause: cause` on one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(dir: &Path) -> InputConfig {
        InputConfig {
            dir: dir.to_path_buf(),
            ..InputConfig::default()
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.md", "");
        write(dir.path(), "a/z.markdown", "");
        write(dir.path(), "a/notes.txt", "");
        write(dir.path(), "c.MD", "");

        let names: Vec<_> = discover(&input(dir.path()))
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, ["a/z.markdown", "b.md", "c.MD"]);
    }

    #[test]
    fn test_load_keeps_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<_> = (0..20)
            .map(|i| write(dir.path(), &format!("{i:02}.md"), &format!("---\nn: {i}\n---\n")))
            .collect();
        let loaded = load(&files, OnError::Abort).unwrap();
        let ns: Vec<_> = loaded.documents.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_error_policy() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "a.md", "---\nok: true\n---\n"),
            write(dir.path(), "b.md", "---\n- not\n- a map\n---\n"),
            write(dir.path(), "c.md", "no frontmatter"),
        ];

        assert!(matches!(
            load(&files, OnError::Abort),
            Err(DocumentError::Frontmatter { .. })
        ));

        let loaded = load(&files, OnError::Skip).unwrap();
        assert_eq!(loaded.documents, vec![json!({"ok": true})]);
        assert_eq!(loaded.skipped, vec![files[1].clone()]);
        assert_eq!(loaded.without_frontmatter, vec![files[2].clone()]);
    }
}
