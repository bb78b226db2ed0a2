//! Config-file discovery in a repository tree.

use super::client::GitHubClient;
use super::types::TreeResponse;

/// Path fragments that mark a file as configuration.
pub const CONFIG_FILE_PATTERNS: &[&str] = &[
    ".env",
    ".ini",
    ".cfg",
    ".config",
    ".conf",
    ".yaml",
    ".yml",
    ".json",
    "settings.xml",
    "config.json",
    "config.yaml",
    "settings.py",
    "config.yml",
    "docker-compose.yml",
];

/// Whether a path looks like a configuration file.
#[must_use]
pub fn is_config_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    CONFIG_FILE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Paths of the configuration-looking blobs of a tree, in tree order.
#[must_use]
pub fn config_files(tree: &TreeResponse) -> Vec<String> {
    tree.tree
        .iter()
        .filter(|entry| entry.kind == "blob" && is_config_path(&entry.path))
        .map(|entry| entry.path.clone())
        .collect()
}

/// List the configuration files of `owner/name`.
///
/// Any failure to read the tree is logged and yields an empty list.
pub async fn list_config_files(client: &GitHubClient, full_name: &str) -> Vec<String> {
    match client.tree(full_name).await {
        Ok(tree) => {
            if tree.truncated {
                tracing::warn!(repository = full_name, "Tree listing was truncated by GitHub");
            }
            config_files(&tree)
        }
        Err(e) => {
            tracing::warn!(repository = full_name, error = %e, "Could not read repository tree");
            Vec::new()
        }
    }
}
