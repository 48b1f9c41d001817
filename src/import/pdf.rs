use std::{ffi::OsString, path::Path, path::PathBuf};

use log::info;

use super::{helper::DEFAULT_PYTHON_BIN, HelperScript, ImportError};
use crate::document::EMPTY_PAGE;

pub const DEFAULT_PDF_SCRIPT: &str = "scripts/py/pdf_extract.py";

/// Page texts of a PDF, one entry per page, via `scripts/py/pdf_extract.py`.
#[derive(Debug, Clone)]
pub struct PdfImporter {
    helper: HelperScript,
}

impl Default for PdfImporter {
    fn default() -> Self {
        Self::new(DEFAULT_PYTHON_BIN, DEFAULT_PDF_SCRIPT)
    }
}

impl PdfImporter {
    pub fn new(python: impl Into<OsString>, script: impl Into<PathBuf>) -> Self {
        Self {
            helper: HelperScript::new(python, script),
        }
    }

    pub fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<String>, ImportError> {
        let pages: Vec<String> = self
            .helper
            .run(pdf_path, "PDF_PARSE_FAIL")?
            .into_iter()
            .map(|text| match text {
                Some(text) if !text.is_empty() => text,
                _ => EMPTY_PAGE.to_string(),
            })
            .collect();
        info!("Imported PDF {} with {} page(s)", pdf_path.display(), pages.len());
        Ok(pages)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::import::{load_document, Importers};
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn stub_importer(temp: &TempDir, body: &str) -> PdfImporter {
        let script = temp.child("pdf_stub.sh");
        script.write_str(body).unwrap();
        PdfImporter::new("sh", script.path())
    }

    fn touch_pdf(temp: &TempDir) -> PathBuf {
        let pdf = temp.child("demo.pdf");
        pdf.touch().unwrap();
        pdf.path().to_path_buf()
    }

    #[test]
    fn successful_extraction_returns_pages() {
        let temp = TempDir::new().unwrap();
        let importer = stub_importer(
            &temp,
            r#"printf '{"ok": true, "pages": [{"text": "Page one. Still one."}, {"text": ""}, {"text": "Two!"}]}'"#,
        );
        let pdf = touch_pdf(&temp);
        let pages = importer.extract_pages(&pdf).unwrap();
        assert_eq!(pages, vec!["Page one. Still one.", EMPTY_PAGE, "Two!"]);

        let importers = Importers {
            pdf: importer,
            ..Importers::default()
        };
        let document = load_document(&pdf, &importers).unwrap();
        assert_eq!(document.pages().len(), 3);
        // The placeholder has no sentence terminator, so it runs into the next page.
        assert_eq!(
            document.sentences(),
            &["Page one.", "Still one.", "[Empty page]\nTwo!"]
        );
    }

    #[test]
    fn surfaces_script_failure() {
        let temp = TempDir::new().unwrap();
        let importer = stub_importer(&temp, "printf kaput >&2\nexit 1\n");
        let pdf = touch_pdf(&temp);
        match importer.extract_pages(&pdf) {
            Err(ImportError::ScriptFailed { stderr }) => assert_eq!(stderr, "kaput"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn extractor_rejection_keeps_code() {
        let temp = TempDir::new().unwrap();
        let importer = stub_importer(
            &temp,
            r#"printf '{"ok": false, "code": "PDF_ENCRYPTED", "message": "locked"}'"#,
        );
        let pdf = touch_pdf(&temp);
        match importer.extract_pages(&pdf) {
            Err(ImportError::Rejected { code, message }) => {
                assert_eq!(code, "PDF_ENCRYPTED");
                assert_eq!(message, "locked");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejection_without_code_uses_fallback() {
        let temp = TempDir::new().unwrap();
        let importer = stub_importer(&temp, r#"printf '{"ok": false}'"#);
        let pdf = touch_pdf(&temp);
        match importer.extract_pages(&pdf) {
            Err(ImportError::Rejected { code, .. }) => assert_eq!(code, "PDF_PARSE_FAIL"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let importer = stub_importer(&temp, "printf 'not json'");
        let pdf = touch_pdf(&temp);
        assert!(matches!(
            importer.extract_pages(&pdf),
            Err(ImportError::Parse(_))
        ));
    }
}
