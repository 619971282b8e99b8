//! Nesting a flat list of file references into a single rooted tree.

use crate::file::{FileNode, FileRef};

/// Builds one rooted [`FileNode`] tree from flat [`FileRef`] entries.
///
/// Each entry's path is walked segment by segment from the root. Missing
/// intermediate directories are created on demand and reused by later
/// entries sharing the prefix; the last segment becomes a file leaf.
/// Reuse is by exact name among a directory's existing children, so entry
/// paths must already be scoped to the same folder by the caller.
#[derive(Clone, Debug)]
pub struct FileTreeBuilder {
    root: FileNode,
}

impl FileTreeBuilder {
    /// Start a tree from a directory root.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            root: FileNode::directory(name, path),
        }
    }

    /// Add every entry, in order.
    pub fn add_files<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a FileRef>,
    {
        for entry in entries {
            self.insert(entry);
        }
        self
    }

    /// Add a single entry.
    pub fn add_file(mut self, entry: &FileRef) -> Self {
        self.insert(entry);
        self
    }

    /// The finished tree.
    pub fn build(self) -> FileNode {
        self.root
    }

    fn insert(&mut self, entry: &FileRef) {
        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, dirs)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for (depth, segment) in dirs.iter().enumerate() {
            let pos = match current
                .children
                .iter()
                .position(|c| c.is_dir() && c.name == *segment)
            {
                Some(pos) => pos,
                None => {
                    let dir_path = segments[..=depth].join("/");
                    current.children.push(FileNode::directory(*segment, dir_path));
                    current.children.len() - 1
                }
            };
            current = &mut current.children[pos];
        }

        // First entry wins when two refs land on the same name.
        if current.children.iter().any(|c| c.name == *leaf) {
            return;
        }
        let mut node = FileNode::from(entry);
        node.name = (*leaf).to_string();
        current.children.push(node);
    }
}
