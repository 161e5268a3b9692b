// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UI resources: bitmaps the producer hands to the consumer by id.
//!
//! The producer keeps every live bitmap in a [`UiResourceRegistry`] and
//! queues create/delete requests that travel with the next commit. The
//! consumer applies them through a [`ResourceManager`] and keeps the
//! resulting keys in a [`UiResourceTable`]. When the consumer loses its
//! resources (output surface loss), it reports the eviction and the producer
//! re-issues a create for every live resource.

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_core::layer::UiResourceId;
use strata_render::ResourceKey;

/// Pixel data for a UI resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiResourceBitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixels, row-major.
    pub pixels: Arc<[u8]>,
}

/// A resource change travelling from the producer to the consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiResourceRequest {
    /// Upload `bitmap` under `id`, replacing any previous upload.
    Create {
        /// The resource.
        id: UiResourceId,
        /// Its pixels.
        bitmap: UiResourceBitmap,
    },
    /// Release the upload for `id`.
    Delete {
        /// The resource.
        id: UiResourceId,
    },
}

/// Uploads and releases resources on behalf of the consumer.
pub trait ResourceManager {
    /// Uploads a bitmap and returns its key.
    fn create(&mut self, id: UiResourceId, bitmap: &UiResourceBitmap) -> ResourceKey;

    /// Releases an upload.
    fn delete(&mut self, key: ResourceKey);
}

/// Producer-side record of live UI resources and queued requests.
#[derive(Debug, Default)]
pub struct UiResourceRegistry {
    next_id: u32,
    live: BTreeMap<UiResourceId, UiResourceBitmap>,
    requests: Vec<UiResourceRequest>,
}

impl UiResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bitmap and queues its upload.
    pub fn create(&mut self, bitmap: UiResourceBitmap) -> UiResourceId {
        self.next_id += 1;
        let id = UiResourceId(self.next_id);
        self.live.insert(id, bitmap.clone());
        self.requests.push(UiResourceRequest::Create { id, bitmap });
        id
    }

    /// Forgets a resource and queues its release. Unknown ids are ignored.
    pub fn delete(&mut self, id: UiResourceId) {
        if self.live.remove(&id).is_some() {
            self.requests.push(UiResourceRequest::Delete { id });
        }
    }

    /// Returns `true` if `id` is live.
    #[must_use]
    pub fn contains(&self, id: UiResourceId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no resource is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Queues a create for every live resource, after the consumer lost
    /// its uploads. Requests already queued are superseded.
    pub fn recreate_all(&mut self) {
        self.requests.clear();
        for (&id, bitmap) in &self.live {
            self.requests.push(UiResourceRequest::Create {
                id,
                bitmap: bitmap.clone(),
            });
        }
    }

    /// Takes the queued requests for a commit.
    pub fn take_requests(&mut self) -> Vec<UiResourceRequest> {
        core::mem::take(&mut self.requests)
    }
}

/// Consumer-side map from UI resource ids to uploaded keys.
#[derive(Debug, Default)]
pub struct UiResourceTable {
    keys: BTreeMap<UiResourceId, ResourceKey>,
}

impl UiResourceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a commit's requests. Deleting an unknown id does nothing.
    pub fn process(&mut self, requests: &[UiResourceRequest], manager: &mut dyn ResourceManager) {
        for request in requests {
            match request {
                UiResourceRequest::Create { id, bitmap } => {
                    let key = manager.create(*id, bitmap);
                    if let Some(old) = self.keys.insert(*id, key) {
                        manager.delete(old);
                    }
                }
                UiResourceRequest::Delete { id } => {
                    if let Some(key) = self.keys.remove(id) {
                        manager.delete(key);
                    }
                }
            }
        }
    }

    /// The key uploaded for `id`.
    #[must_use]
    pub fn resolve(&self, id: UiResourceId) -> Option<ResourceKey> {
        self.keys.get(&id).copied()
    }

    /// Number of uploaded resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if nothing is uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Forgets every key without releasing it; the uploads are already gone.
    ///
    /// Returns `true` if anything was evicted.
    pub fn evict_all(&mut self) -> bool {
        let evicted = !self.keys.is_empty();
        self.keys.clear();
        evicted
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use strata_core::layer::UiResourceId;
    use strata_render::ResourceKey;

    use super::{ResourceManager, UiResourceBitmap};

    /// Hands out sequential keys and records releases.
    #[derive(Debug, Default)]
    pub(crate) struct CountingManager {
        pub(crate) next: u64,
        pub(crate) created: Vec<UiResourceId>,
        pub(crate) deleted: Vec<ResourceKey>,
    }

    impl ResourceManager for CountingManager {
        fn create(&mut self, id: UiResourceId, _bitmap: &UiResourceBitmap) -> ResourceKey {
            self.next += 1;
            self.created.push(id);
            ResourceKey(self.next)
        }

        fn delete(&mut self, key: ResourceKey) {
            self.deleted.push(key);
        }
    }

    pub(crate) fn bitmap(width: u32, height: u32) -> UiResourceBitmap {
        UiResourceBitmap {
            width,
            height,
            pixels: vec![0_u8; (width * height * 4) as usize].into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{CountingManager, bitmap};
    use super::*;

    #[test]
    fn requests_round_trip_through_the_table() {
        let mut registry = UiResourceRegistry::new();
        let a = registry.create(bitmap(2, 2));
        let b = registry.create(bitmap(4, 4));
        registry.delete(a);
        registry.delete(a);

        let requests = registry.take_requests();
        assert_eq!(requests.len(), 3, "second delete is a no-op");
        assert!(registry.take_requests().is_empty());

        let mut manager = CountingManager::default();
        let mut table = UiResourceTable::new();
        table.process(&requests, &mut manager);
        assert_eq!(table.resolve(a), None);
        assert_eq!(table.resolve(b), Some(ResourceKey(2)));
        assert_eq!(manager.deleted, [ResourceKey(1)]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deleting_unknown_id_is_harmless() {
        let mut manager = CountingManager::default();
        let mut table = UiResourceTable::new();
        table.process(&[UiResourceRequest::Delete { id: UiResourceId(9) }], &mut manager);
        assert!(table.is_empty());
        assert!(manager.deleted.is_empty());
    }

    #[test]
    fn eviction_recreates_every_live_resource() {
        let mut registry = UiResourceRegistry::new();
        let a = registry.create(bitmap(1, 1));
        let b = registry.create(bitmap(1, 1));
        let mut manager = CountingManager::default();
        let mut table = UiResourceTable::new();
        table.process(&registry.take_requests(), &mut manager);

        assert!(table.evict_all());
        assert!(!table.evict_all(), "already empty");
        assert_eq!(table.resolve(a), None);

        registry.recreate_all();
        table.process(&registry.take_requests(), &mut manager);
        assert_eq!(manager.created, [a, b, a, b]);
        assert_eq!(table.len(), 2);
        assert!(manager.deleted.is_empty(), "evicted keys are not released twice");
    }

    #[test]
    fn recreate_replaces_the_previous_upload() {
        let mut registry = UiResourceRegistry::new();
        let a = registry.create(bitmap(1, 1));
        let mut manager = CountingManager::default();
        let mut table = UiResourceTable::new();
        table.process(&registry.take_requests(), &mut manager);
        registry.recreate_all();
        table.process(&registry.take_requests(), &mut manager);
        assert_eq!(table.resolve(a), Some(ResourceKey(2)));
        assert_eq!(manager.deleted, [ResourceKey(1)]);
    }
}
