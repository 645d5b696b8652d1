//! Per-operation identity caches
//!
//! Both engines carry a cache for the duration of one operation so that a
//! bean (or resource) visited twice maps to the same counterpart, which is
//! what keeps cyclic graphs from recursing forever. Caches are created per
//! operation and dropped with it.

use crate::model::{Resource, SharedBean};
use rustc_hash::FxHashMap;

/// Bean handle -> resource map for one marshalling pass.
///
/// Keys are bean handle addresses; the handle itself is retained alongside
/// the resource so an address cannot be recycled while the pass is running.
#[derive(Default)]
pub(crate) struct MarshalCache {
    entries: FxHashMap<usize, (SharedBean, Resource)>,
}

impl MarshalCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, bean: &SharedBean) -> Option<&Resource> {
        self.entries.get(&bean.addr()).map(|(_, resource)| resource)
    }

    pub(crate) fn put(&mut self, bean: &SharedBean, resource: Resource) {
        self.entries.insert(bean.addr(), (bean.clone(), resource));
    }
}

/// Resource -> bean handle map for one unmarshalling pass.
///
/// Entries are inserted before a bean's properties are filled, so a cycle
/// in the statement graph resolves to the handle already under
/// construction.
#[derive(Default)]
pub(crate) struct UnmarshalCache {
    entries: FxHashMap<Resource, SharedBean>,
}

impl UnmarshalCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, resource: &Resource) -> Option<SharedBean> {
        self.entries.get(resource).cloned()
    }

    pub(crate) fn put(&mut self, resource: Resource, bean: SharedBean) {
        self.entries.insert(resource, bean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::NamedNode;

    #[test]
    fn test_marshal_cache_keys_by_handle_identity() {
        let mut cache = MarshalCache::new();
        let a = SharedBean::new("Person");
        let b = SharedBean::new("Person");
        let resource = Resource::new_blank();

        cache.put(&a, resource.clone());
        assert_eq!(cache.get(&a), Some(&resource));
        assert_eq!(cache.get(&a.clone()), Some(&resource));
        assert!(cache.get(&b).is_none());
    }

    #[test]
    fn test_unmarshal_cache_roundtrip() {
        let mut cache = UnmarshalCache::new();
        let resource = Resource::Named(NamedNode::new("http://example.org/a").unwrap());
        let bean = SharedBean::new("Person");

        assert!(cache.get(&resource).is_none());
        cache.put(resource.clone(), bean.clone());
        assert!(cache.get(&resource).unwrap().ptr_eq(&bean));
    }
}
