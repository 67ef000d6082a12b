//! Persisted virtual filesystem for generated projects.
//!
//! Files live in a remote row store keyed by path. [`FileStore`] fronts that
//! store with an in-memory cache and rebuilds a directory tree on demand;
//! backends implement [`FileBackend`].

pub mod backend;
pub mod store;
pub mod supabase;
pub mod tree;

pub use backend::{FileBackend, MemoryBackend};
pub use store::{FileStore, FileStoreStats};
pub use supabase::SupabaseBackend;
pub use tree::{build_tree, FileSystemNode, NodeKind};

use crate::errors::AgentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Typescript,
    Javascript,
    Json,
    Html,
    Css,
    Markdown,
    Rust,
    Python,
    Yaml,
    Toml,
    Text,
}

impl FileType {
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let extension = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return FileType::Text,
        };

        match extension.as_str() {
            "ts" | "tsx" => FileType::Typescript,
            "js" | "jsx" | "mjs" | "cjs" => FileType::Javascript,
            "json" => FileType::Json,
            "html" | "htm" => FileType::Html,
            "css" | "scss" | "less" => FileType::Css,
            "md" | "mdx" => FileType::Markdown,
            "rs" => FileType::Rust,
            "py" => FileType::Python,
            "yml" | "yaml" => FileType::Yaml,
            "toml" => FileType::Toml,
            _ => FileType::Text,
        }
    }
}

/// One stored file. Field names on the wire match the `project_files` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    #[serde(rename = "file_path")]
    pub path: String,
    pub content: String,
    pub file_type: FileType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let now = Utc::now();
        Self {
            file_type: FileType::from_path(&path),
            path,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Same path, new content; keeps `created_at`.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            path: self.path.clone(),
            content: content.into(),
            file_type: self.file_type,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }
}

/// Canonical form of a project path: leading `/`, single separators, no
/// trailing `/`. Relative segments are rejected rather than resolved.
pub fn normalize_path(path: &str) -> Result<String, AgentError> {
    let mut segments = Vec::new();
    for segment in path.trim().split('/') {
        match segment {
            "" => continue,
            "." | ".." => {
                return Err(AgentError::ValidationError(format!(
                    "Relative segment '{}' not allowed in path '{}'",
                    segment, path
                )))
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(AgentError::ValidationError(format!(
            "Path '{}' does not name a file",
            path
        )));
    }

    Ok(format!("/{}", segments.join("/")))
}
