//! Internal API response types for the Hugging Face Hub.
//!
//! External consumers use the port DTOs defined in `ggchat-core`.

use serde::Deserialize;

/// One entry of a model search result.
#[derive(Debug, Clone, Deserialize)]
pub struct HfModelSummary {
    pub id: String,
    #[serde(default)]
    pub downloads: u64,
}

/// LFS pointer metadata attached to large files.
#[derive(Debug, Clone, Deserialize)]
pub struct HfLfsInfo {
    pub size: u64,
}

/// One entry of a repository tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct HfTreeEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub lfs: Option<HfLfsInfo>,
}

impl HfTreeEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }

    /// Real file size; for LFS files the pointer's `size` is the stub size.
    pub fn file_size(&self) -> Option<u64> {
        self.lfs.as_ref().map(|l| l.size).or(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tree_entry_prefers_lfs_size() {
        let entry: HfTreeEntry = serde_json::from_value(json!({
            "type": "file",
            "oid": "abc",
            "path": "model.Q4_K_M.gguf",
            "size": 135,
            "lfs": {"oid": "def", "size": 4_368_438_944_u64, "pointerSize": 135}
        }))
        .unwrap();
        assert!(entry.is_file());
        assert_eq!(entry.file_size(), Some(4_368_438_944));
    }

    #[test]
    fn test_summary_tolerates_missing_downloads() {
        let summary: HfModelSummary =
            serde_json::from_value(json!({"id": "org/Repo-GGUF", "likes": 3})).unwrap();
        assert_eq!(summary.downloads, 0);
    }
}
