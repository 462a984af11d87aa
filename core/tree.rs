use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    /// Full paths of the children, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

/// Directory tree rebuilt from flat paths.
///
/// Nodes live in a flat table keyed by their full path; directories refer to
/// their children by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    nodes: HashMap<String, TreeNode>,
    roots: Vec<String>,
}

impl Tree {
    pub fn build<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Tree::default();
        let mut count = 0usize;
        for path in paths {
            tree.insert(path.as_ref());
            count += 1;
        }
        log::debug!(
            "Built tree with {} nodes from {} paths.",
            tree.nodes.len(),
            count
        );
        tree
    }

    fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut parent: Option<String> = None;

        for (i, segment) in segments.iter().enumerate() {
            let is_last = i + 1 == segments.len();
            let key = match &parent {
                Some(prefix) => format!("{}/{}", prefix, segment),
                None => (*segment).to_string(),
            };

            match self.nodes.get(&key) {
                Some(existing) => {
                    if existing.is_directory == is_last {
                        log::debug!(
                            "Tree conflict at '{}': already recorded as {}, keeping first kind.",
                            key,
                            if existing.is_directory { "directory" } else { "file" }
                        );
                        // files never get children
                        if !existing.is_directory {
                            return;
                        }
                    }
                }
                None => {
                    self.nodes.insert(
                        key.clone(),
                        TreeNode {
                            name: (*segment).to_string(),
                            path: key.clone(),
                            is_directory: !is_last,
                            children: Vec::new(),
                        },
                    );
                    let siblings = match &parent {
                        Some(parent_key) => match self.nodes.get_mut(parent_key) {
                            Some(node) => &mut node.children,
                            None => &mut self.roots,
                        },
                        None => &mut self.roots,
                    };
                    siblings.push(key.clone());
                }
            }

            parent = Some(key);
        }
    }

    pub fn roots(&self) -> impl Iterator<Item = &TreeNode> {
        self.roots.iter().filter_map(|key| self.nodes.get(key))
    }

    pub fn get(&self, path: &str) -> Option<&TreeNode> {
        self.nodes.get(path)
    }

    pub fn children<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> {
        node.children.iter().filter_map(|key| self.nodes.get(key))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn directory_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_directory).count()
    }

    pub fn file_count(&self) -> usize {
        self.nodes.values().filter(|n| !n.is_directory).count()
    }

    /// Nested view for structured output, sorted the same way as [`render`].
    pub fn to_nested(&self, order: TreeOrder) -> Vec<NestedNode> {
        let roots: Vec<&TreeNode> = self.roots().collect();
        self.nest(roots, order)
    }

    fn nest(&self, mut level: Vec<&TreeNode>, order: TreeOrder) -> Vec<NestedNode> {
        level.sort_by(|a, b| order.compare(a, b));
        level
            .into_iter()
            .map(|node| NestedNode {
                name: node.name.clone(),
                node_type: if node.is_directory { "directory" } else { "file" },
                children: if node.is_directory {
                    Some(self.nest(self.children(node).collect(), order))
                } else {
                    None
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NestedNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeOrder {
    FoldersFirst,
    #[default]
    FilesFirst,
}

impl TreeOrder {
    pub fn from_folders_first(folders_first: bool) -> Self {
        if folders_first {
            TreeOrder::FoldersFirst
        } else {
            TreeOrder::FilesFirst
        }
    }

    fn compare(self, a: &TreeNode, b: &TreeNode) -> Ordering {
        let kind = match (a.is_directory, b.is_directory) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        };
        let kind = match self {
            TreeOrder::FoldersFirst => kind,
            TreeOrder::FilesFirst => kind.reverse(),
        };
        kind.then_with(|| a.name.cmp(&b.name))
    }
}

impl FromStr for TreeOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "folders-first" | "dirs-first" => Ok(TreeOrder::FoldersFirst),
            "files-first" => Ok(TreeOrder::FilesFirst),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown tree order '{}'. Use 'folders-first' or 'files-first'.",
                other
            ))),
        }
    }
}

/// Renders the tree with `├── ` / `└── ` connectors, one line per node.
pub fn render(tree: &Tree, order: TreeOrder) -> String {
    let mut output = String::new();
    render_level(tree, tree.roots().collect(), order, "", &mut output);
    output
}

fn render_level(
    tree: &Tree,
    mut level: Vec<&TreeNode>,
    order: TreeOrder,
    prefix: &str,
    output: &mut String,
) {
    level.sort_by(|a, b| order.compare(a, b));
    let count = level.len();
    for (i, node) in level.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let marker = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(marker);
        output.push_str(&node.name);
        output.push('\n');

        if node.is_directory {
            let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
            render_level(tree, tree.children(node).collect(), order, &child_prefix, output);
        }
    }
}
