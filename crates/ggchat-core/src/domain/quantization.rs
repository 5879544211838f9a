//! Quantization-aware artifact selection.

/// Quantization tags in order of preference.
///
/// Higher quality K-quants come first; `Q8_0` is large enough that it is
/// only picked when nothing smaller is published.
pub const QUANT_PREFERENCE: &[&str] = &["Q5_K_M", "Q4_K_M", "Q5_K_S", "Q4_K_S", "Q6_K", "Q8_0"];

/// Whether `file` is a single-file GGUF weight artifact.
///
/// Split shards (`-00001-of-00003.gguf`), vision projectors and files in
/// repository subdirectories are skipped; artifacts are stored flat.
pub fn is_primary_gguf(file: &str) -> bool {
    let lower = file.to_ascii_lowercase();
    lower.ends_with(".gguf")
        && !lower.contains(['/', '\\'])
        && !lower.contains("mmproj")
        && !lower.contains("-of-0")
}

fn has_tag(file: &str, tag: &str) -> bool {
    let upper = file.to_ascii_uppercase();
    upper.match_indices(tag).any(|(idx, _)| {
        let before = upper[..idx].chars().next_back();
        let after = upper[idx + tag.len()..].chars().next();
        matches!(before, Some('.' | '-' | '_')) && matches!(after, Some('.' | '-' | '_'))
    })
}

/// Pick the preferred artifact from a repository listing.
///
/// Returns the first file carrying the most preferred quantization tag, or
/// the first GGUF file when no preferred tag is present.
pub fn select_preferred_artifact<S: AsRef<str>>(files: &[S]) -> Option<&str> {
    let candidates: Vec<&str> = files
        .iter()
        .map(AsRef::as_ref)
        .filter(|f| is_primary_gguf(f))
        .collect();

    QUANT_PREFERENCE
        .iter()
        .find_map(|tag| candidates.iter().copied().find(|f| has_tag(f, tag)))
        .or_else(|| candidates.first().copied())
}
