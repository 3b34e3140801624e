//! Resident resource index.

use std::collections::BTreeMap;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use serde::Serialize;

use gridiron_cas::ResourceRecord;

type FxHashMap<K, V> = FastHashMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Resource records in scan order with case-insensitive name lookup.
///
/// Scan order puts the patch partition first, so when two records share a
/// name the patched one is found.
#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    records: Vec<ResourceRecord>,
    by_name: FxHashMap<String, usize>,
}

impl ResourceIndex {
    pub fn from_records(records: Vec<ResourceRecord>) -> Self {
        let mut by_name = FxHashMap::default();
        for (i, record) in records.iter().enumerate() {
            by_name.entry(record.name.to_lowercase()).or_insert(i);
        }
        Self { records, by_name }
    }

    /// Find a record by name, ignoring case. The first record wins.
    pub fn find(&self, name: &str) -> Option<&ResourceRecord> {
        self.by_name.get(&name.to_lowercase()).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRecord> + '_ {
        self.records.iter()
    }

    /// Group record names into a `/`-separated folder hierarchy.
    pub fn tree(&self) -> TreeNode {
        let mut root = TreeNode::default();
        for (i, record) in self.records.iter().enumerate() {
            let mut node = &mut root;
            let mut path = String::new();
            for segment in record.name.split('/').filter(|s| !s.is_empty()) {
                if !path.is_empty() {
                    path.push('/');
                }
                path.push_str(segment);
                node = node
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(|| TreeNode {
                        name: segment.to_string(),
                        path: path.clone(),
                        ..TreeNode::default()
                    });
            }
            node.record.get_or_insert(i);
        }
        root
    }
}

/// One folder or resource in [`ResourceIndex::tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Last path segment. Empty for the root.
    pub name: String,
    /// Full path from the root.
    pub path: String,
    /// Index into [`ResourceIndex::records`] when a resource has this path.
    pub record: Option<usize>,
    pub children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    /// Look up a descendant by `/`-separated path.
    pub fn get(&self, path: &str) -> Option<&TreeNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Number of resources at or below this node.
    pub fn resource_count(&self) -> usize {
        usize::from(self.record.is_some()) + self.children.values().map(TreeNode::resource_count).sum::<usize>()
    }
}
