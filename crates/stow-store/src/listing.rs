//! Arena used to nest a flat, recursive listing into directory nodes.
//!
//! Built once per listing call and dropped afterwards. Directory nodes are
//! memoized by their path relative to the listed folder, so each one is
//! created exactly once and attached under its parent in discovery order.

use std::collections::HashMap;

use stow_types::FileNode;

use crate::sanitize::join_path;

struct Slot {
    node: FileNode,
    children: Vec<usize>,
}

pub(crate) struct TreeArena {
    base: String,
    slots: Vec<Slot>,
    dirs: HashMap<String, usize>,
    top: Vec<usize>,
}

impl TreeArena {
    /// An arena for a listing of `base` (a sanitized logical folder).
    pub(crate) fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            slots: Vec::new(),
            dirs: HashMap::new(),
            top: Vec::new(),
        }
    }

    /// Make sure the directory chain for `segments` exists and return the
    /// deepest one, or `None` for the listed folder itself.
    pub(crate) fn ensure_dir(&mut self, segments: &[&str]) -> Option<usize> {
        let mut parent = None;
        for depth in 0..segments.len() {
            let rel = segments[..=depth].join("/");
            let idx = match self.dirs.get(&rel) {
                Some(&idx) => idx,
                None => {
                    let node = FileNode::directory(segments[depth], join_path(&self.base, &rel));
                    let idx = self.push(parent, node);
                    self.dirs.insert(rel, idx);
                    idx
                }
            };
            parent = Some(idx);
        }
        parent
    }

    /// Place a file node at `rel` (relative to the listed folder).
    pub(crate) fn insert_file(&mut self, rel: &str, node: FileNode) {
        let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        let parent = match segments.split_last() {
            Some((_, dirs)) => self.ensure_dir(dirs),
            None => None,
        };
        self.push(parent, node);
    }

    /// Assemble the top-level nodes with their nested children.
    pub(crate) fn into_nodes(self) -> Vec<FileNode> {
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        self.top
            .iter()
            .filter_map(|&idx| assemble(&mut slots, idx))
            .collect()
    }

    fn push(&mut self, parent: Option<usize>, node: FileNode) -> usize {
        let idx = self.slots.len();
        self.slots.push(Slot {
            node,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.slots[p].children.push(idx),
            None => self.top.push(idx),
        }
        idx
    }
}

fn assemble(slots: &mut [Option<Slot>], idx: usize) -> Option<FileNode> {
    let Slot { mut node, children } = slots.get_mut(idx)?.take()?;
    node.children = children
        .into_iter()
        .filter_map(|child| assemble(slots, child))
        .collect();
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(rel: &str) -> FileNode {
        let name = rel.rsplit('/').next().unwrap();
        FileNode::file(name, rel, 1, None)
    }

    #[test]
    fn nests_files_under_directories() {
        let mut arena = TreeArena::new("");
        for rel in ["a.txt", "b/c.txt", "b/d/e.txt"] {
            arena.insert_file(rel, file(rel));
        }
        let top = arena.into_nodes();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "a.txt");
        let b = &top[1];
        assert!(b.is_dir());
        assert_eq!(b.path, "b");
        assert_eq!(b.children.len(), 2);
        assert_eq!(b.children[0].name, "c.txt");
        let d = &b.children[1];
        assert_eq!(d.path, "b/d");
        assert_eq!(d.children.len(), 1);
        assert_eq!(d.children[0].name, "e.txt");
    }

    #[test]
    fn directories_created_once() {
        let mut arena = TreeArena::new("root");
        arena.insert_file("x/y/1", file("root/x/y/1"));
        arena.insert_file("x/2", file("root/x/2"));
        arena.insert_file("x/y/3", file("root/x/y/3"));
        let top = arena.into_nodes();
        assert_eq!(top.len(), 1);
        let x = &top[0];
        assert_eq!(x.path, "root/x");
        assert_eq!(x.children.len(), 2);
        assert_eq!(x.children[0].path, "root/x/y");
        assert_eq!(x.children[0].children.len(), 2);
    }

    #[test]
    fn explicit_empty_directories() {
        let mut arena = TreeArena::new("");
        arena.ensure_dir(&["empty", "deeper"]);
        let top = arena.into_nodes();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].children[0].name, "deeper");
        assert!(top[0].children[0].children.is_empty());
    }

    #[test]
    fn empty_arena() {
        assert!(TreeArena::new("").into_nodes().is_empty());
    }
}
