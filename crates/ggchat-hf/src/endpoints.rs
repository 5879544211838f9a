//! URL construction helpers for the Hugging Face API.

use url::Url;

use crate::error::HfResult;

/// Search URL for repositories carrying `tag`, most downloaded first.
pub fn build_search_url(base: &Url, tag: &str, limit: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("filter", tag)
        .append_pair("sort", "downloads")
        .append_pair("direction", "-1")
        .append_pair("limit", &limit.clamp(1, 100).to_string());
    url
}

/// Tree listing URL for the repository's `main` revision.
pub fn build_tree_url(base: &Url, repo_id: &str) -> Url {
    let mut url = base.clone();
    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}/{repo_id}/tree/main"));
    url.set_query(None);
    url
}

/// Download URL of a file on the `main` revision.
pub fn build_resolve_url(root: &Url, repo_id: &str, file_name: &str) -> HfResult<Url> {
    Ok(root.join(&format!("{repo_id}/resolve/main/{file_name}"))?)
}
