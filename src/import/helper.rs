use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use log::error;
use serde::Deserialize;

use super::ImportError;

pub const DEFAULT_PYTHON_BIN: &str = "python";

#[derive(Debug, Deserialize)]
struct HelperOutput {
    ok: bool,
    #[serde(default)]
    pages: Vec<HelperPage>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HelperPage {
    #[serde(default)]
    text: Option<String>,
}

/// An import helper run as `<python> <script> <file>`, printing
/// `{"ok": bool, "pages": [{"text": ..}], "code": .., "message": ..}`.
#[derive(Debug, Clone)]
pub struct HelperScript {
    python: OsString,
    script: PathBuf,
}

impl HelperScript {
    pub fn new(python: impl Into<OsString>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }

    /// Returns the raw page texts; `None` for pages the helper had no text for.
    pub fn run(
        &self,
        path: &Path,
        fallback_code: &str,
    ) -> Result<Vec<Option<String>>, ImportError> {
        let output = Command::new(&self.python)
            .arg(&self.script)
            .arg(path)
            .output()
            .map_err(|err| {
                error!("Could not run import helper {}: {err}", self.script.display());
                ImportError::Io(self.script.clone(), err)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("Import helper {} failed: {stderr}", self.script.display());
            return Err(ImportError::ScriptFailed { stderr });
        }

        let parsed: HelperOutput = serde_json::from_slice(&output.stdout)?;
        if !parsed.ok {
            return Err(ImportError::Rejected {
                code: parsed.code.unwrap_or_else(|| fallback_code.to_string()),
                message: parsed.message.unwrap_or_else(|| "import failed".to_string()),
            });
        }
        Ok(parsed.pages.into_iter().map(|page| page.text).collect())
    }
}
