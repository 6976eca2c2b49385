use std::collections::HashMap;

use crate::Container;

/// Maps a node to the container running it
#[derive(Debug, Clone, Default)]
pub enum ContainerResolver {
    /// Container whose name contains the node's advertised hostname.
    /// When several match, the shortest name wins (`worker-1` over `worker-10`).
    #[default]
    ByHostname,

    /// Fixed node id -> container id table supplied by the fixture
    Explicit(HashMap<u64, String>),
}

impl ContainerResolver {
    pub fn explicit<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        ContainerResolver::Explicit(entries.into_iter().collect())
    }

    /// Whether [`resolve`](Self::resolve) needs the container listing
    pub fn needs_listing(&self) -> bool {
        matches!(self, ContainerResolver::ByHostname)
    }

    pub fn resolve(
        &self,
        node_id: u64,
        hostname: &str,
        containers: &[Container],
    ) -> Option<String> {
        match self {
            ContainerResolver::Explicit(map) => map.get(&node_id).cloned(),
            ContainerResolver::ByHostname => {
                if hostname.is_empty() {
                    return None;
                }
                containers
                    .iter()
                    .filter(|c| c.name.contains(hostname))
                    .min_by_key(|c| c.name.len())
                    .map(|c| c.id.clone())
            }
        }
    }
}
