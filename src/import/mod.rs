//! Document importers: plain text read directly, PDF and EPUB through
//! external extraction helpers.

pub mod epub;
pub mod helper;
pub mod pdf;
pub mod text;

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::document::Document;

pub use epub::EpubImporter;
pub use helper::HelperScript;
pub use pdf::PdfImporter;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("import helper failed: {stderr}")]
    ScriptFailed { stderr: String },
    #[error("could not parse import helper output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

/// The helper-backed importers, one per supported binary format.
#[derive(Debug, Clone, Default)]
pub struct Importers {
    pub pdf: PdfImporter,
    pub epub: EpubImporter,
}

/// Loads `path` as a [`Document`] whose id is the path string as given.
///
/// `.pdf` and `.epub` (any case) go through their helpers; anything else is
/// read as UTF-8 text.
pub fn load_document(path: &Path, importers: &Importers) -> Result<Document, ImportError> {
    if !path.exists() {
        return Err(ImportError::NotFound(path.to_path_buf()));
    }
    let pages = if has_extension(path, "pdf") {
        importers.pdf.extract_pages(path)?
    } else if has_extension(path, "epub") {
        importers.epub.extract_pages(path)?
    } else {
        vec![text::read_text(path)?]
    };
    let document = Document::from_pages(path.to_string_lossy(), pages);
    info!(
        "Loaded {} with {} page(s) and {} sentence(s)",
        path.display(),
        document.pages().len(),
        document.len()
    );
    Ok(document)
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn loads_text_document_by_path() {
        let temp = assert_fs::TempDir::new().unwrap();
        let book = temp.child("test_book.txt");
        book.write_str("Hello world. This is a test book. Let's read!")
            .unwrap();
        let document = load_document(book.path(), &Importers::default()).unwrap();
        assert_eq!(document.len(), 3);
        assert_eq!(document.id(), book.path().to_string_lossy());
        assert_eq!(document.pages().len(), 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = load_document(&temp.path().join("missing.txt"), &Importers::default());
        assert!(matches!(result, Err(ImportError::NotFound(_))));
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(has_extension(Path::new("book.PDF"), "pdf"));
        assert!(has_extension(Path::new("dir/book.pdf"), "pdf"));
        assert!(has_extension(Path::new("novel.Epub"), "epub"));
        assert!(!has_extension(Path::new("book.txt"), "pdf"));
        assert!(!has_extension(Path::new("pdf"), "pdf"));
    }
}
