//! Grouped tree construction
//!
//! Every row is placed under the group path returned by a
//! [`GroupingPathProvider`]. Group nodes are looked up by the path prefix
//! joined with [`PATH_SEPARATOR`] in an insertion-ordered index, so sibling
//! groups appear in first-seen order. Leaves keep their input order within a
//! group; when rows sharing a path prefix are contiguous in the input, the
//! depth-first leaf sequence is exactly the input sequence.

use std::panic::{AssertUnwindSafe, catch_unwind};

use indexmap::IndexMap;
use tabula_core::{Result, RowRecord};

use crate::columns::{RenderedColumn, format_cells};
use crate::table_state::TableState;

/// Joins path segments into node keys. Stripped from labels, so it never
/// occurs in data.
pub const PATH_SEPARATOR: char = '\u{1F}';

/// Computes the group path of a row, outermost group first
pub trait GroupingPathProvider: Send + Sync {
    fn group_path(&self, row: &RowRecord) -> Result<Vec<String>>;
}

impl<F> GroupingPathProvider for F
where
    F: Fn(&RowRecord) -> Vec<String> + Send + Sync,
{
    fn group_path(&self, row: &RowRecord) -> Result<Vec<String>> {
        Ok(self(row))
    }
}

/// Puts every row in the single catch-all group
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleGroup;

impl GroupingPathProvider for SingleGroup {
    fn group_path(&self, _row: &RowRecord) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Groups by the values of the given columns, one level per column
#[derive(Debug, Clone)]
pub struct ColumnGrouping {
    columns: Vec<String>,
}

impl ColumnGrouping {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl GroupingPathProvider for ColumnGrouping {
    fn group_path(&self, row: &RowRecord) -> Result<Vec<String>> {
        Ok(self
            .columns
            .iter()
            .map(|column| row.value_or_empty(column).to_string())
            .collect())
    }
}

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    /// Path prefix joined with [`PATH_SEPARATOR`]
    pub key: String,
    pub label: String,
    pub depth: usize,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    /// Index of the row in the slice the tree was built from
    pub row_index: usize,
    pub depth: usize,
    /// Cells formatted against the columns current at build time
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Group(GroupNode),
    Leaf(LeafNode),
}

/// One line of the rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleRow {
    Group {
        key: String,
        label: String,
        depth: usize,
        leaf_count: usize,
        expanded: bool,
    },
    Leaf {
        row_index: usize,
        depth: usize,
        cells: Vec<String>,
    },
}

/// Arena-allocated group tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTree {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
}

impl GroupTree {
    /// Build the tree for `rows`.
    ///
    /// A provider error, panic or empty path puts the row in the
    /// `default_label` group.
    pub fn build(
        rows: &[RowRecord],
        provider: &dyn GroupingPathProvider,
        columns: &[RenderedColumn],
        default_label: &str,
    ) -> Self {
        let mut tree = Self::default();
        let mut index: IndexMap<String, NodeId> = IndexMap::new();

        for (row_index, row) in rows.iter().enumerate() {
            let path = resolve_path(provider, row, row_index, default_label);

            let mut key = String::new();
            let mut parent: Option<NodeId> = None;
            for (depth, segment) in path.into_iter().enumerate() {
                if depth > 0 {
                    key.push(PATH_SEPARATOR);
                }
                key.push_str(&segment);

                let node_id = match index.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = tree.push(TreeNode::Group(GroupNode {
                            key: key.clone(),
                            label: segment,
                            depth,
                            children: Vec::new(),
                        }));
                        tree.attach(parent, id);
                        index.insert(key.clone(), id);
                        id
                    }
                };
                parent = Some(node_id);
            }

            let depth = parent.map_or(0, |id| tree.depth_of(id) + 1);
            let leaf = tree.push(TreeNode::Leaf(LeafNode {
                row_index,
                depth,
                cells: format_cells(row, columns),
            }));
            tree.attach(parent, leaf);
        }

        tracing::debug!(
            rows = rows.len(),
            groups = index.len(),
            "group tree built"
        );
        tree
    }

    fn push(&mut self, node: TreeNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn attach(&mut self, parent: Option<NodeId>, child: NodeId) {
        match parent {
            Some(parent) => {
                if let TreeNode::Group(group) = &mut self.nodes[parent] {
                    group.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
    }

    fn depth_of(&self, id: NodeId) -> usize {
        match &self.nodes[id] {
            TreeNode::Group(g) => g.depth,
            TreeNode::Leaf(l) => l.depth,
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root-level groups in display order
    pub fn root_groups(&self) -> Vec<&GroupNode> {
        self.roots
            .iter()
            .filter_map(|&id| match &self.nodes[id] {
                TreeNode::Group(g) => Some(g),
                TreeNode::Leaf(_) => None,
            })
            .collect()
    }

    /// Every group node in depth-first order
    pub fn groups(&self) -> Vec<&GroupNode> {
        let mut out = Vec::new();
        self.walk(&self.roots, &mut |node| {
            if let TreeNode::Group(g) = node {
                out.push(g);
            }
        });
        out
    }

    pub fn group(&self, key: &str) -> Option<&GroupNode> {
        self.nodes.iter().find_map(|node| match node {
            TreeNode::Group(g) if g.key == key => Some(g),
            _ => None,
        })
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<&LeafNode> {
        let mut out = Vec::new();
        self.walk(&self.roots, &mut |node| {
            if let TreeNode::Leaf(l) = node {
                out.push(l);
            }
        });
        out
    }

    /// Row indices of the leaves in depth-first order
    pub fn leaf_row_indices(&self) -> Vec<usize> {
        self.leaves().into_iter().map(|l| l.row_index).collect()
    }

    /// Number of leaves below a group
    pub fn leaf_count(&self, group: &GroupNode) -> usize {
        let mut count = 0;
        self.walk(&group.children, &mut |node| {
            if matches!(node, TreeNode::Leaf(_)) {
                count += 1;
            }
        });
        count
    }

    fn walk<'a>(&'a self, ids: &[NodeId], visit: &mut impl FnMut(&'a TreeNode)) {
        for &id in ids {
            let node = &self.nodes[id];
            visit(node);
            if let TreeNode::Group(g) = node {
                self.walk(&g.children, visit);
            }
        }
    }

    /// Lines to render: every group, plus the children of expanded groups
    pub fn visible_rows(&self, state: &TableState) -> Vec<VisibleRow> {
        let mut out = Vec::new();
        self.collect_visible(&self.roots, state, &mut out);
        out
    }

    fn collect_visible(&self, ids: &[NodeId], state: &TableState, out: &mut Vec<VisibleRow>) {
        for &id in ids {
            match &self.nodes[id] {
                TreeNode::Group(g) => {
                    let expanded = state.is_expanded(&g.key);
                    out.push(VisibleRow::Group {
                        key: g.key.clone(),
                        label: g.label.clone(),
                        depth: g.depth,
                        leaf_count: self.leaf_count(g),
                        expanded,
                    });
                    if expanded {
                        self.collect_visible(&g.children, state, out);
                    }
                }
                TreeNode::Leaf(l) => out.push(VisibleRow::Leaf {
                    row_index: l.row_index,
                    depth: l.depth,
                    cells: l.cells.clone(),
                }),
            }
        }
    }

    /// Expand or collapse every group
    pub fn set_all_expanded(&self, state: &mut TableState, expanded: bool) {
        for group in self.groups() {
            state.set_expanded(&group.key, expanded);
        }
    }
}

fn resolve_path(
    provider: &dyn GroupingPathProvider,
    row: &RowRecord,
    row_index: usize,
    default_label: &str,
) -> Vec<String> {
    let path = match catch_unwind(AssertUnwindSafe(|| provider.group_path(row))) {
        Ok(Ok(path)) => path,
        Ok(Err(e)) => {
            tracing::warn!(row_index, error = %e, "grouping provider failed, using default group");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(row_index, "grouping provider panicked, using default group");
            Vec::new()
        }
    };

    if path.is_empty() {
        return vec![default_label.to_string()];
    }
    path.into_iter()
        .map(|segment| segment.replace(PATH_SEPARATOR, ""))
        .collect()
}
