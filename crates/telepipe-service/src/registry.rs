use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::channel::{Channel, ChannelId};
use crate::error::{Result, ServiceError};
#[cfg(unix)]
use crate::pipe::PipeChannel;

/// Channels keyed by id, owned by the process that sets up forking.
///
/// Created before the fork and inherited by every child, which looks its
/// channel up by id when it builds a [`PipeService`](crate::PipeService).
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelId, Arc<dyn Channel>>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a [`PipeChannel`] and register it under `id`.
    #[cfg(unix)]
    pub fn create_pipe(&self, id: ChannelId) -> Result<Arc<PipeChannel>> {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        if channels.contains_key(&id) {
            return Err(ServiceError::ChannelExists(id));
        }

        let pipe = Arc::new(PipeChannel::open()?);
        channels.insert(id, Arc::clone(&pipe) as Arc<dyn Channel>);
        debug!(channel_id = id, "registered pipe channel");
        Ok(pipe)
    }

    /// Register any channel implementation, replacing and returning a previous one.
    pub fn insert(&self, id: ChannelId, channel: Arc<dyn Channel>) -> Option<Arc<dyn Channel>> {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, channel)
    }

    /// Look up the channel registered under `id`.
    pub fn lookup(&self, id: ChannelId) -> Option<Arc<dyn Channel>> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Unregister and return the channel under `id`.
    pub fn remove(&self, id: ChannelId) -> Option<Arc<dyn Channel>> {
        let removed = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            debug!(channel_id = id, "unregistered channel");
        }
        removed
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullChannel;

    impl Channel for NullChannel {
        fn write(&self, _bytes: &[u8]) -> Result<()> {
            Ok(())
        }

        fn close(&self) {}

        fn parent_pid(&self) -> u32 {
            1
        }

        fn after_fork_in_child(&self) {}
    }

    #[test]
    fn lookup_missing_is_none() {
        let registry = ChannelRegistry::new();
        assert!(registry.lookup(7).is_none());
        assert!(registry.ids().is_empty());
    }

    #[test]
    fn insert_lookup_remove() {
        let registry = ChannelRegistry::new();
        assert!(registry.insert(3, Arc::new(NullChannel)).is_none());
        assert!(registry.insert(1, Arc::new(NullChannel)).is_none());

        assert_eq!(registry.ids(), vec![1, 3]);
        assert_eq!(registry.lookup(3).map(|c| c.parent_pid()), Some(1));

        assert!(registry.remove(3).is_some());
        assert!(registry.remove(3).is_none());
        assert!(registry.lookup(3).is_none());
        assert_eq!(registry.ids(), vec![1]);
    }

    #[test]
    fn insert_replaces_previous() {
        let registry = ChannelRegistry::new();
        registry.insert(9, Arc::new(NullChannel));
        assert!(registry.insert(9, Arc::new(NullChannel)).is_some());
        assert_eq!(registry.ids(), vec![9]);
    }

    #[test]
    #[cfg(unix)]
    fn create_pipe_registers_once() {
        let registry = ChannelRegistry::new();
        let pipe = registry.create_pipe(42).unwrap();
        assert_eq!(pipe.parent_pid(), std::process::id());

        let looked_up = registry.lookup(42).unwrap();
        assert_eq!(looked_up.parent_pid(), pipe.parent_pid());

        let err = registry.create_pipe(42).unwrap_err();
        assert!(matches!(err, ServiceError::ChannelExists(42)));
    }
}
