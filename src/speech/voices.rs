use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice '{0}' not found")]
    NotFound(String),
    #[error("no voices installed under {0}")]
    NoneInstalled(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub id: String,
    pub label: String,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub model_path: PathBuf,
}

/// Piper voices found under a directory: every `*.onnx`, with optional
/// `*.onnx.json` metadata next to it.
pub struct VoiceLibrary {
    base_dir: PathBuf,
    voices: Vec<VoiceInfo>,
}

impl VoiceLibrary {
    pub fn scan(base_dir: PathBuf) -> Self {
        let mut voices: Vec<VoiceInfo> = if base_dir.exists() {
            WalkDir::new(&base_dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry.path().extension().and_then(|ext| ext.to_str()) == Some("onnx")
                })
                .filter_map(|entry| build_voice_info(entry.path()))
                .collect()
        } else {
            Vec::new()
        };
        voices.sort_by(|a, b| a.id.cmp(&b.id));
        log::info!("Found {} voice(s) in {}", voices.len(), base_dir.display());
        Self { base_dir, voices }
    }

    pub fn list(&self) -> &[VoiceInfo] {
        &self.voices
    }

    /// The voice named `id`, or the first one installed when `id` is `None`.
    pub fn select(&self, id: Option<&str>) -> Result<&VoiceInfo, VoiceError> {
        match id {
            Some(id) => self
                .voices
                .iter()
                .find(|voice| voice.id == id)
                .ok_or_else(|| VoiceError::NotFound(id.to_string())),
            None => self
                .voices
                .first()
                .ok_or_else(|| VoiceError::NoneInstalled(self.base_dir.clone())),
        }
    }
}

fn build_voice_info(path: &Path) -> Option<VoiceInfo> {
    let id = path.file_stem()?.to_string_lossy().to_string();
    let metadata = metadata_path_for(path).and_then(|meta| match fs::read_to_string(&meta) {
        Ok(contents) => serde_json::from_str::<Value>(&contents)
            .map_err(|err| log::warn!("Failed to parse metadata {}: {err}", meta.display()))
            .ok(),
        Err(err) => {
            log::warn!("Failed to read metadata {}: {err}", meta.display());
            None
        }
    });
    let language = metadata.as_ref().and_then(|value| value.get("language"));

    let label = language
        .and_then(|lang| lang.get("name_native").or_else(|| lang.get("name")))
        .and_then(Value::as_str)
        .map(|name| format!("{name} · {id}"))
        .unwrap_or_else(|| id.clone());

    Some(VoiceInfo {
        label,
        language: language
            .and_then(|lang| lang.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string),
        quality: metadata
            .as_ref()
            .and_then(|value| value.get("audio"))
            .and_then(|audio| audio.get("quality"))
            .and_then(Value::as_str)
            .map(str::to_string),
        model_path: path.to_path_buf(),
        id,
    })
}

fn metadata_path_for(path: &Path) -> Option<PathBuf> {
    let metadata_path = path.with_extension("onnx.json");
    metadata_path.exists().then_some(metadata_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn discovers_nested_voices_sorted_by_id() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("en/zeta.onnx").touch().unwrap();
        temp.child("alpha.onnx").touch().unwrap();
        temp.child("notes.txt").touch().unwrap();
        let library = VoiceLibrary::scan(temp.path().to_path_buf());
        let ids: Vec<_> = library.list().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(library.select(None).unwrap().id, "alpha");
        assert_eq!(library.select(Some("zeta")).unwrap().id, "zeta");
    }

    #[test]
    fn reads_label_and_quality_from_metadata() {
        let temp = assert_fs::TempDir::new().unwrap();
        let model = temp.child("en_US-amy.onnx");
        model.touch().unwrap();
        temp.child("en_US-amy.onnx.json")
            .write_str(r#"{"language":{"code":"en_US","name_native":"English"},"audio":{"quality":"medium"}}"#)
            .unwrap();
        let info = build_voice_info(model.path()).unwrap();
        assert_eq!(info.label, "English · en_US-amy");
        assert_eq!(info.language.as_deref(), Some("en_US"));
        assert_eq!(info.quality.as_deref(), Some("medium"));
    }

    #[test]
    fn selection_errors() {
        let temp = assert_fs::TempDir::new().unwrap();
        let library = VoiceLibrary::scan(temp.path().join("missing"));
        assert!(matches!(library.select(None), Err(VoiceError::NoneInstalled(_))));
        assert!(matches!(library.select(Some("amy")), Err(VoiceError::NotFound(_))));
    }
}
