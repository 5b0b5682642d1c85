/// Tunables owned by the composition layer.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Mutations touching at most this many records update the search index
    /// synchronously; larger batches enqueue a reindex action instead.
    pub index_sync_threshold: usize,

    /// Reference fetch depth used when a read carries no explicit bound.
    pub default_fetch_depth: usize,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            index_sync_threshold: 1,
            default_fetch_depth: 1,
        }
    }

    pub fn index_sync_threshold(mut self, threshold: usize) -> Self {
        self.index_sync_threshold = threshold;
        self
    }

    pub fn default_fetch_depth(mut self, depth: usize) -> Self {
        self.default_fetch_depth = depth;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
