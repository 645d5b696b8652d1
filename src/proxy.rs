//! Lazy resource proxies
//!
//! An [`RdfProxy`] is a live handle over one resource: property reads hit
//! the store when called, property writes replace that property's
//! statements in place. No bean state is held in memory, so two proxies for
//! the same resource always observe each other's writes.
//!
//! The [`ProxyPool`] keeps at most one live proxy per (resource, type) pair
//! and hands the same instance back while somebody still holds it.

use crate::error::{BindError, BindResult};
use crate::manager::ManagerCore;
use crate::marshal::Marshaler;
use crate::model::{BeanValue, Resource};
use crate::schema::{BeanDescriptor, PropertyDescriptor};
use crate::store::TripleStore;
use crate::unmarshal::Unmarshaler;
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub(crate) struct ProxyInner<S: TripleStore> {
    core: Arc<ManagerCore<S>>,
    resource: Resource,
    descriptor: Arc<BeanDescriptor>,
}

/// Identity-stable lazy handle over one resource
pub struct RdfProxy<S: TripleStore> {
    inner: Arc<ProxyInner<S>>,
}

impl<S: TripleStore> RdfProxy<S> {
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub fn type_name(&self) -> &str {
        self.inner.descriptor.type_name()
    }

    /// Whether two handles share the same pooled instance (equality only
    /// compares resource and type)
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read one property from the store. The identifier property answers
    /// from the resource itself without touching the store.
    pub fn get(&self, property: &str) -> BindResult<Option<BeanValue>> {
        let inner = &self.inner;
        if let Some(spec) = inner.descriptor.subject() {
            if spec.property() == property {
                return Ok(match &inner.resource {
                    Resource::Named(subject) => {
                        Some(BeanValue::String(spec.extract_id(subject)))
                    }
                    Resource::Blank(_) => None,
                });
            }
        }
        let descriptor = self.mapped_property(property)?;
        let codec = inner.core.codec_handle();
        let mut unmarshaler =
            Unmarshaler::new(&inner.core.store, &inner.core.schema, codec.as_ref());
        unmarshaler.read_property(&inner.resource, descriptor)
    }

    /// Replace the property's statements with the given value
    pub fn set(&self, property: &str, value: impl Into<BeanValue>) -> BindResult<()> {
        self.write(property, Some(value.into()))
    }

    /// Remove the property's statements
    pub fn clear(&self, property: &str) -> BindResult<()> {
        self.write(property, None)
    }

    fn write(&self, property: &str, value: Option<BeanValue>) -> BindResult<()> {
        let inner = &self.inner;
        if let Some(spec) = inner.descriptor.subject() {
            if spec.property() == property {
                return Err(BindError::validation(format!(
                    "identifier property '{}' cannot be changed through a proxy",
                    property
                )));
            }
        }
        let descriptor = self.mapped_property(property)?;

        let _ops = inner.core.lock_ops();
        let codec = inner.core.codec_handle();
        inner.core.transactional(|| {
            if !descriptor.is_inverse() {
                inner.core.store.remove(
                    Some(&inner.resource),
                    Some(descriptor.predicate()),
                    None,
                )?;
            }
            let mut marshaler =
                Marshaler::new(&inner.core.store, &inner.core.schema, codec.as_ref());
            marshaler.write_property_value(&inner.resource, descriptor, value.as_ref())
        })
    }

    fn mapped_property(&self, property: &str) -> BindResult<&PropertyDescriptor> {
        self.inner.descriptor.property(property).ok_or_else(|| {
            BindError::validation(format!(
                "property '{}' is not mapped for type '{}'",
                property,
                self.inner.descriptor.type_name()
            ))
        })
    }
}

impl<S: TripleStore> Clone for RdfProxy<S> {
    fn clone(&self) -> Self {
        RdfProxy {
            inner: self.inner.clone(),
        }
    }
}

impl<S: TripleStore> PartialEq for RdfProxy<S> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.resource == other.inner.resource
            && self.inner.descriptor.type_name() == other.inner.descriptor.type_name()
    }
}

impl<S: TripleStore> Eq for RdfProxy<S> {}

impl<S: TripleStore> Hash for RdfProxy<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.resource.hash(state);
        self.inner.descriptor.type_name().hash(state);
    }
}

impl<S: TripleStore> fmt::Debug for RdfProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdfProxy")
            .field("resource", &self.inner.resource)
            .field("type_name", &self.inner.descriptor.type_name())
            .finish()
    }
}

/// Listener notified when a create operation writes a new resource
pub trait ProxyListener<S: TripleStore>: Send + Sync {
    fn resource_created(&self, proxy: &RdfProxy<S>, resource: &Resource);
}

type PoolKey = (Resource, String);

/// Weak-valued pool of live proxies, keyed by (resource, type name)
pub(crate) struct ProxyPool<S: TripleStore> {
    instances: Mutex<FxHashMap<PoolKey, Weak<ProxyInner<S>>>>,
}

impl<S: TripleStore> ProxyPool<S> {
    pub(crate) fn new() -> Self {
        ProxyPool {
            instances: Mutex::new(FxHashMap::default()),
        }
    }

    /// Hand out the live proxy for (resource, type) or build one. Entries
    /// whose proxies were dropped are swept on the way.
    pub(crate) fn instance(
        &self,
        core: &Arc<ManagerCore<S>>,
        resource: Resource,
        descriptor: Arc<BeanDescriptor>,
    ) -> RdfProxy<S> {
        let mut instances = self.lock();
        instances.retain(|_, weak| weak.strong_count() > 0);

        let key = (resource.clone(), descriptor.type_name().to_string());
        if let Some(live) = instances.get(&key).and_then(Weak::upgrade) {
            return RdfProxy { inner: live };
        }
        let inner = Arc::new(ProxyInner {
            core: core.clone(),
            resource,
            descriptor,
        });
        instances.insert(key, Arc::downgrade(&inner));
        RdfProxy { inner }
    }

    /// Forget pool entries for a resource so later lookups build fresh
    /// instances
    pub(crate) fn purge(&self, resource: &Resource) {
        self.lock().retain(|(pooled, _), _| pooled != resource);
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<PoolKey, Weak<ProxyInner<S>>>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
