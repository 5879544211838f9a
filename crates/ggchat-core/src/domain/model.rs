//! Model descriptors and best-effort filename metadata.
//!
//! Descriptors are rebuilt on every catalog refresh from the local model
//! directory and the remote hub listing; they are never persisted.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Broad capability class of a model, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Instruct,
    Vision,
    Audio,
    Video,
    Multimodal,
    Unknown,
}

/// One entry of the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique logical id used by clients.
    pub name: String,
    /// Remote repository, absent for purely local models.
    pub repo_id: Option<String>,
    /// Artifact filename inside the models directory.
    pub file_name: String,
    /// Whether the artifact exists locally.
    pub installed: bool,
    /// Artifact size, `None` when it could not be determined.
    pub size_bytes: Option<u64>,
    /// Parameter count such as `7B`, parsed from the name.
    pub parameter_count: Option<String>,
    pub modality: Modality,
}

impl ModelDescriptor {
    /// Build a descriptor, filling the best-effort metadata from `name` and `file_name`.
    pub fn new(
        name: impl Into<String>,
        repo_id: Option<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let file_name = file_name.into();
        let parameter_count =
            parse_parameter_count(&name).or_else(|| parse_parameter_count(&file_name));
        let modality = match infer_modality(&name) {
            Modality::Unknown => infer_modality(&file_name),
            known => known,
        };
        Self {
            name,
            repo_id,
            file_name,
            installed: false,
            size_bytes: None,
            parameter_count,
            modality,
        }
    }
}

/// A model that is always offered, whether or not discovery finds it.
#[derive(Debug, Clone, Copy)]
pub struct CuratedModel {
    pub name: &'static str,
    pub repo_id: &'static str,
    pub file_name: &'static str,
    pub size_bytes: u64,
}

impl CuratedModel {
    pub fn descriptor(&self) -> ModelDescriptor {
        let mut descriptor =
            ModelDescriptor::new(self.name, Some(self.repo_id.to_string()), self.file_name);
        descriptor.size_bytes = Some(self.size_bytes);
        descriptor
    }
}

pub const CURATED_MODELS: &[CuratedModel] = &[
    CuratedModel {
        name: "Mistral-7B-Instruct",
        repo_id: "TheBloke/Mistral-7B-Instruct-v0.1-GGUF",
        file_name: "mistral-7b-instruct-v0.1.Q4_K_M.gguf",
        size_bytes: 4_368_438_944,
    },
    CuratedModel {
        name: "Llama-2-7B-Chat",
        repo_id: "TheBloke/Llama-2-7B-Chat-GGUF",
        file_name: "llama-2-7b-chat.Q4_K_M.gguf",
        size_bytes: 4_081_004_224,
    },
];

static PARAM_COUNT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9.])((?:\d+x)?\d+(?:\.\d+)?)([bm])(?:[^a-z0-9]|$)").ok()
});

/// Parse a parameter count such as `7B`, `0.5B`, `8x7B` or `350M` from a name.
///
/// Returns `None` when nothing recognizable is found.
pub fn parse_parameter_count(name: &str) -> Option<String> {
    let re = PARAM_COUNT_RE.as_ref()?;
    let caps = re.captures(name)?;
    let amount = caps.get(1)?.as_str().to_ascii_lowercase();
    let unit = caps.get(2)?.as_str().to_ascii_uppercase();
    Some(format!("{amount}{unit}"))
}

/// Infer the modality from name tokens.
pub fn infer_modality(name: &str) -> Modality {
    let lower = name.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["omni", "multimodal"]) {
        Modality::Multimodal
    } else if has(&["video"]) {
        Modality::Video
    } else if has(&["vision", "llava", "-vl", "_vl", "mmproj"]) {
        Modality::Vision
    } else if has(&["whisper", "audio", "speech", "tts"]) {
        Modality::Audio
    } else if has(&["instruct", "chat", "-it", "_it", "hermes"]) {
        Modality::Instruct
    } else if parse_parameter_count(name).is_some() {
        Modality::Text
    } else {
        Modality::Unknown
    }
}

/// Logical name for a repository, e.g. `TheBloke/Phi-2-GGUF` becomes `Phi-2`.
pub fn name_from_repo_id(repo_id: &str) -> String {
    let last = repo_id.rsplit('/').next().unwrap_or(repo_id);
    let trimmed = last
        .strip_suffix("-GGUF")
        .or_else(|| last.strip_suffix("-gguf"))
        .unwrap_or(last);
    trimmed.to_string()
}

/// Logical name for a local artifact: the filename without `.gguf`.
pub fn name_from_file(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".gguf") {
        file_name[..file_name.len() - ".gguf".len()].to_string()
    } else {
        file_name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameter_count() {
        assert_eq!(
            parse_parameter_count("mistral-7b-instruct-v0.1.Q4_K_M.gguf"),
            Some("7B".to_string())
        );
        assert_eq!(
            parse_parameter_count("Qwen2-0.5B-Instruct"),
            Some("0.5B".to_string())
        );
        assert_eq!(
            parse_parameter_count("mixtral-8x7b-v0.1"),
            Some("8x7B".to_string())
        );
        assert_eq!(parse_parameter_count("gpt2-350m.gguf"), Some("350M".to_string()));
        assert_eq!(parse_parameter_count("tinymodel.gguf"), None);
    }

    #[test]
    fn test_infer_modality() {
        assert_eq!(infer_modality("Mistral-7B-Instruct"), Modality::Instruct);
        assert_eq!(infer_modality("llava-v1.6-mistral-7b"), Modality::Vision);
        assert_eq!(infer_modality("whisper-large-v3"), Modality::Audio);
        assert_eq!(infer_modality("Qwen2.5-Omni-7B"), Modality::Multimodal);
        assert_eq!(infer_modality("llama-2-7b"), Modality::Text);
        assert_eq!(infer_modality("mystery"), Modality::Unknown);
    }

    #[test]
    fn test_curated_descriptor_carries_metadata() {
        let descriptor = CURATED_MODELS[0].descriptor();
        assert_eq!(descriptor.name, "Mistral-7B-Instruct");
        assert_eq!(descriptor.parameter_count.as_deref(), Some("7B"));
        assert_eq!(descriptor.modality, Modality::Instruct);
        assert!(descriptor.size_bytes.is_some());
        assert!(!descriptor.installed);
    }

    #[test]
    fn test_names_from_repo_and_file() {
        assert_eq!(name_from_repo_id("TheBloke/Phi-2-GGUF"), "Phi-2");
        assert_eq!(name_from_repo_id("someone/plain"), "plain");
        assert_eq!(name_from_file("model.Q4_0.GGUF"), "model.Q4_0");
        assert_eq!(name_from_file("notes.txt"), "notes.txt");
    }
}
