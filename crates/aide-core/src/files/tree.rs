use crate::files::{FileRecord, FileType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// Directory view over stored paths. Rebuilt on every request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSystemNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<FileSystemNode>,
}

impl FileSystemNode {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Depth-first list of file paths under this node (itself included).
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_file_paths(&mut paths);
        paths
    }

    fn collect_file_paths(&self, out: &mut Vec<String>) {
        if self.is_file() {
            out.push(self.path.clone());
        }
        for child in &self.children {
            child.collect_file_paths(out);
        }
    }
}

#[derive(Default)]
struct DirBuilder<'a> {
    dirs: BTreeMap<&'a str, DirBuilder<'a>>,
    files: BTreeMap<&'a str, &'a FileRecord>,
}

impl<'a> DirBuilder<'a> {
    fn insert(&mut self, segments: &[&'a str], record: &'a FileRecord) {
        match segments {
            [] => {}
            [name] => {
                self.files.insert(*name, record);
            }
            [dir, rest @ ..] => self.dirs.entry(*dir).or_default().insert(rest, record),
        }
    }

    fn into_nodes(self, parent: &str) -> Vec<FileSystemNode> {
        let mut nodes = Vec::with_capacity(self.dirs.len() + self.files.len());

        for (name, dir) in self.dirs {
            let path = join(parent, name);
            let children = dir.into_nodes(&path);
            nodes.push(FileSystemNode {
                name: name.to_string(),
                path,
                kind: NodeKind::Directory,
                file_type: None,
                content: None,
                children,
            });
        }

        for (name, record) in self.files {
            nodes.push(FileSystemNode {
                name: name.to_string(),
                path: join(parent, name),
                kind: NodeKind::File,
                file_type: Some(record.file_type),
                content: Some(record.content.clone()),
                children: Vec::new(),
            });
        }

        nodes
    }
}

fn join(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

/// Group records on `/` into a forest of top-level nodes. Records are expected
/// to carry normalized paths (`/a/b.ts`).
///
/// A path that is both a file and a directory prefix (`/a` and `/a/b`) yields
/// two sibling nodes, so leaves stay content-only and directories stay
/// children-only.
pub fn build_tree(records: &[FileRecord]) -> Vec<FileSystemNode> {
    let mut root = DirBuilder::default();
    for record in records {
        let segments: Vec<&str> = record.path.split('/').filter(|s| !s.is_empty()).collect();
        root.insert(&segments, record);
    }
    root.into_nodes("")
}
