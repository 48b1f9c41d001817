use std::{ffi::OsString, path::Path, path::PathBuf};

use log::{info, warn};

use super::{helper::DEFAULT_PYTHON_BIN, HelperScript, ImportError};

pub const DEFAULT_EPUB_SCRIPT: &str = "scripts/py/import_epub.py";
/// Sole page of an EPUB whose spine yields no text.
pub const NO_READABLE_PAGES: &str = "No readable pages found.";

/// Spine-ordered body text of an EPUB, one page per spine document.
#[derive(Debug, Clone)]
pub struct EpubImporter {
    helper: HelperScript,
}

impl Default for EpubImporter {
    fn default() -> Self {
        Self::new(DEFAULT_PYTHON_BIN, DEFAULT_EPUB_SCRIPT)
    }
}

impl EpubImporter {
    pub fn new(python: impl Into<OsString>, script: impl Into<PathBuf>) -> Self {
        Self {
            helper: HelperScript::new(python, script),
        }
    }

    pub fn extract_pages(&self, epub_path: &Path) -> Result<Vec<String>, ImportError> {
        let mut pages: Vec<String> = self
            .helper
            .run(epub_path, "EPUB_PARSE_FAIL")?
            .into_iter()
            .flatten()
            .filter(|text| !text.trim().is_empty())
            .collect();
        if pages.is_empty() {
            warn!("No readable pages in {}", epub_path.display());
            pages.push(NO_READABLE_PAGES.to_string());
        }
        info!("Imported EPUB {} with {} page(s)", epub_path.display(), pages.len());
        Ok(pages)
    }
}
