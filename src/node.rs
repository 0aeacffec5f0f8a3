//! Registry of nodes currently known to the panel. Entries are owned here;
//! the panel reads them and requests mutation, daemons remain the source of
//! truth for their own running config.

use std::collections::BTreeMap;

/// One node as last reported: identity metadata plus its config document as
/// an opaque JSON string.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub name: String,
    pub version: String,
    pub log_level: u32,
    pub config: String,
}

/// Address-keyed node map. BTreeMap keeps the selector and apply-to-all
/// iteration order stable.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, NodeEntry>,
}

impl NodeRegistry {
    pub fn insert(&mut self, addr: String, entry: NodeEntry) {
        self.nodes.insert(addr, entry);
    }

    pub fn remove(&mut self, addr: &str) -> Option<NodeEntry> {
        self.nodes.remove(addr)
    }

    #[must_use]
    pub fn entry(&self, addr: &str) -> Option<&NodeEntry> {
        self.nodes.get(addr)
    }

    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node's config document as last known, if the node exists.
    #[must_use]
    pub fn get_node_config(&self, addr: &str) -> Option<String> {
        self.nodes.get(addr).map(|entry| entry.config.clone())
    }

    /// Records a freshly built config document for `addr`. Returns false for
    /// an unknown node.
    pub fn save_node_config(&mut self, addr: &str, config: String) -> bool {
        match self.nodes.get_mut(addr) {
            Some(entry) => {
                entry.config = config;
                true
            }
            None => false,
        }
    }
}
