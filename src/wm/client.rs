//! Client Module
//!
//! Registry of every managed client window and its scheduling metadata.
//! Rendering resources stay with the display server; only identity, group
//! membership, and arrival order live here.

use std::collections::HashMap;

use tracing::debug;

/// Scheduling metadata for one client window.
#[derive(Debug, Clone)]
pub struct Client {
    /// Display-layer handle, stable and unique for the window's lifetime.
    pub window: u32,

    /// Label reported by the display layer at map time.
    pub name: String,

    /// Index of the owning group.
    pub group: usize,

    /// Monotonic arrival number, assigned at registration.
    pub seq: u64,
}

/// Handle → client lookup for all tracked windows across all groups.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<u32, Client>,
    next_seq: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new window. Returns the arrival number it was assigned.
    pub fn register(&mut self, window: u32, name: String, group: usize) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        debug!("Registered window {} ('{}'), seq {}", window, name, seq);
        self.clients.insert(
            window,
            Client {
                window,
                name,
                group,
                seq,
            },
        );
        seq
    }

    /// Stop tracking a window, returning its final metadata.
    pub fn unregister(&mut self, window: u32) -> Option<Client> {
        let client = self.clients.remove(&window);
        if let Some(ref client) = client {
            debug!("Unregistered window {} ('{}')", window, client.name);
        }
        client
    }

    pub fn get(&self, window: u32) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn contains(&self, window: u32) -> bool {
        self.clients.contains_key(&window)
    }

    /// Total tracked windows across all groups.
    pub fn len(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_numbers_are_monotonic() {
        let mut registry = ClientRegistry::new();
        let first = registry.register(100, "one".into(), 0);
        let second = registry.register(101, "two".into(), 0);
        registry.unregister(100);
        let third = registry.register(102, "three".into(), 1);

        assert!(first < second && second < third);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unregister_unknown_returns_none() {
        let mut registry = ClientRegistry::new();
        assert!(registry.unregister(42).is_none());
        assert!(!registry.contains(42));
    }

    #[test]
    fn lookup_reports_group_and_name() {
        let mut registry = ClientRegistry::new();
        registry.register(7, "editor".into(), 2);

        let client = registry.get(7).unwrap();
        assert_eq!(client.window, 7);
        assert_eq!(client.name, "editor");
        assert_eq!(client.group, 2);
        assert_eq!(client.seq, 0);
    }
}
