//! Book content resolution: locate the document entry file and the base
//! folder the player serves sibling resources from.
//!
//! Resolution failure must abort session start; the shell shows the error
//! instead of loading a half-configured player.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("book not found: {0}")]
    NotFound(PathBuf),
    #[error("no document entry file in {0}")]
    NoEntryFile(PathBuf),
    #[error("reading book folder {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A resolved book: the entry document and the folder sibling resources are
/// served from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContent {
    pub book_html: PathBuf,
    pub base_dir: PathBuf,
}

/// Resolves a book path into loadable content.
pub trait ContentResolver: Send + Sync {
    fn resolve(&self, book: &Path) -> Result<ResolvedContent, ContentError>;
}

/// Filesystem resolver: accepts a book folder (or the entry file itself) and
/// finds the `.htm`/`.html` entry, preferring one named after the folder.
#[derive(Debug, Default)]
pub struct FsContentResolver;

impl ContentResolver for FsContentResolver {
    fn resolve(&self, book: &Path) -> Result<ResolvedContent, ContentError> {
        if !book.exists() {
            return Err(ContentError::NotFound(book.to_path_buf()));
        }
        if book.is_file() {
            let base_dir = book
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            return Ok(ResolvedContent {
                book_html: book.to_path_buf(),
                base_dir,
            });
        }
        let entry = find_entry_file(book)?;
        log::debug!("resolved book entry {}", entry.display());
        Ok(ResolvedContent {
            book_html: entry,
            base_dir: book.to_path_buf(),
        })
    }
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("htm") | Some("html")
    )
}

/// Pick the entry document in a book folder: a file named after the folder
/// wins; otherwise the first html file in name order.
fn find_entry_file(dir: &Path) -> Result<PathBuf, ContentError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ContentError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_html(&path) {
            candidates.push(path);
        }
    }
    candidates.sort();
    if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
        if let Some(named) = candidates
            .iter()
            .find(|p| p.file_stem().and_then(|s| s.to_str()) == Some(name))
        {
            return Ok(named.clone());
        }
    }
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ContentError::NoEntryFile(dir.to_path_buf()))
}

/// Build the player load URL: the player page with the book entry as the
/// `url` query parameter.
pub fn player_url(player_entry: &Path, book_html: &Path) -> String {
    format!(
        "file://{}?url=file://{}",
        player_entry.display(),
        book_html.display()
    )
}
