//! Bean manager
//!
//! [`BeanManager`] is the operational surface of the crate: it owns the
//! store, the binding registry and the codec, orchestrates transactions
//! around every write, and hands out proxies through the shared pool.
//!
//! With autocommit on (the default) each write operation runs in its own
//! transaction and rolls back on error. With autocommit off, operations
//! write into the caller's transaction, driven through
//! [`begin`](BeanManager::begin) / [`commit`](BeanManager::commit) /
//! [`rollback`](BeanManager::rollback).

use crate::codec::{DefaultCodec, LiteralCodec};
use crate::error::{BindError, BindResult};
use crate::marshal::Marshaler;
use crate::model::{Resource, SharedBean, Statement, Term};
use crate::proxy::{ProxyListener, ProxyPool, RdfProxy};
use crate::schema::{self, BeanDescriptor, SchemaRegistry};
use crate::store::{StoreResult, TripleStore};
use crate::unmarshal::Unmarshaler;
use oxrdf::vocab::rdf;
use oxrdf::NamedNode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, error};

/// Shared state behind a manager and every proxy it hands out
pub(crate) struct ManagerCore<S: TripleStore> {
    pub(crate) store: S,
    pub(crate) schema: SchemaRegistry,
    codec: RwLock<Arc<dyn LiteralCodec>>,
    autocommit: AtomicBool,
    proxies: ProxyPool<S>,
    listeners: RwLock<Vec<Arc<dyn ProxyListener<S>>>>,
    ops: Mutex<()>,
}

impl<S: TripleStore> ManagerCore<S> {
    pub(crate) fn codec_handle(&self) -> Arc<dyn LiteralCodec> {
        self.codec
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Serialize write operations; reads run lock-free
    pub(crate) fn lock_ops(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn autocommit(&self) -> bool {
        self.autocommit.load(Ordering::SeqCst)
    }

    /// Run `op` in its own transaction when autocommit is on, rolling back
    /// on error and re-raising the original failure
    pub(crate) fn transactional<T>(&self, op: impl FnOnce() -> BindResult<T>) -> BindResult<T> {
        let autocommit = self.autocommit();
        if autocommit {
            self.store.begin()?;
        }
        match op() {
            Ok(value) => {
                if autocommit {
                    self.store.commit()?;
                }
                Ok(value)
            }
            Err(err) => {
                if autocommit {
                    if let Err(rollback_err) = self.store.rollback() {
                        error!(error = %rollback_err, "rollback failed after operation error");
                    }
                }
                Err(err)
            }
        }
    }

    fn fire_resource_created(&self, proxy: &RdfProxy<S>, resource: &Resource) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.resource_created(proxy, resource);
        }
    }
}

/// Object-graph to statement-graph mapper over one triple store.
///
/// Cloning a manager is cheap and yields a handle to the same store, schema
/// and proxy pool.
pub struct BeanManager<S: TripleStore> {
    core: Arc<ManagerCore<S>>,
}

impl<S: TripleStore> Clone for BeanManager<S> {
    fn clone(&self) -> Self {
        BeanManager {
            core: self.core.clone(),
        }
    }
}

impl<S: TripleStore> BeanManager<S> {
    /// Create a manager over `store` with the default codec and autocommit on
    pub fn new(store: S) -> Self {
        BeanManager {
            core: Arc::new(ManagerCore {
                store,
                schema: SchemaRegistry::new(),
                codec: RwLock::new(Arc::new(DefaultCodec)),
                autocommit: AtomicBool::new(true),
                proxies: ProxyPool::new(),
                listeners: RwLock::new(Vec::new()),
                ops: Mutex::new(()),
            }),
        }
    }

    /// The binding registry; register descriptors here before use
    pub fn schema(&self) -> &SchemaRegistry {
        &self.core.schema
    }

    pub fn store(&self) -> &S {
        &self.core.store
    }

    pub fn codec(&self) -> Arc<dyn LiteralCodec> {
        self.core.codec_handle()
    }

    pub fn set_codec(&self, codec: Arc<dyn LiteralCodec>) {
        *self
            .core
            .codec
            .write()
            .unwrap_or_else(PoisonError::into_inner) = codec;
    }

    pub fn autocommit(&self) -> bool {
        self.core.autocommit()
    }

    pub fn set_autocommit(&self, autocommit: bool) {
        self.core.autocommit.store(autocommit, Ordering::SeqCst);
    }

    /// Start a caller-managed transaction on the store
    pub fn begin(&self) -> BindResult<()> {
        Ok(self.core.store.begin()?)
    }

    pub fn commit(&self) -> BindResult<()> {
        Ok(self.core.store.commit()?)
    }

    pub fn rollback(&self) -> BindResult<()> {
        Ok(self.core.store.rollback()?)
    }

    /// Marshal a bean graph into the store. A named resource that already
    /// exists is left as it is; the root's resource is returned either way.
    pub fn add(&self, bean: &SharedBean) -> BindResult<Resource> {
        self.add_or_update(bean, false)
    }

    /// Marshal a bean graph, replacing the statements of a root resource
    /// that already exists
    pub fn update(&self, bean: &SharedBean) -> BindResult<Resource> {
        self.add_or_update(bean, true)
    }

    fn add_or_update(&self, bean: &SharedBean, update: bool) -> BindResult<Resource> {
        let _ops = self.core.lock_ops();
        let codec = self.core.codec_handle();
        debug!(type_name = %bean.type_name(), update, "marshalling bean graph");
        self.core.transactional(|| {
            Marshaler::new(&self.core.store, &self.core.schema, codec.as_ref())
                .marshal(bean, update)
        })
    }

    /// Unmarshal `resource` as the given type, or `None` when the store has
    /// no statements about it
    pub fn get(&self, resource: &Resource, type_name: &str) -> BindResult<Option<SharedBean>> {
        if !self.exists(resource)? {
            return Ok(None);
        }
        let descriptor = self.core.schema.describe(type_name)?;
        let codec = self.core.codec_handle();
        let mut unmarshaler =
            Unmarshaler::new(&self.core.store, &self.core.schema, codec.as_ref());
        unmarshaler.unmarshal(resource, &descriptor).map(Some)
    }

    /// Unmarshal `resource`, detecting its type from rdf:type statements
    /// and recorded type bindings
    pub fn get_detect(&self, resource: &Resource) -> BindResult<Option<SharedBean>> {
        if !self.exists(resource)? {
            return Ok(None);
        }
        let codec = self.core.codec_handle();
        let mut unmarshaler =
            Unmarshaler::new(&self.core.store, &self.core.schema, codec.as_ref());
        let descriptor = unmarshaler.detect_descriptor(resource)?;
        unmarshaler.unmarshal(resource, &descriptor).map(Some)
    }

    /// Unmarshal the bean whose identifier is `id`
    pub fn get_by_id(&self, id: &str, type_name: &str) -> BindResult<Option<SharedBean>> {
        match self.resource(id, type_name)? {
            Some(resource) => self.get(&resource, type_name),
            None => Ok(None),
        }
    }

    /// Resolve an identifier to the resource it names, when that resource
    /// exists in the store
    pub fn resource(&self, id: &str, type_name: &str) -> BindResult<Option<Resource>> {
        let descriptor = self.core.schema.describe(type_name)?;
        let Some(spec) = descriptor.subject() else {
            return Ok(None);
        };
        let resource = Resource::Named(spec.resolve(id)?);
        Ok(self.exists(&resource)?.then_some(resource))
    }

    /// Iterate over all beans of a type. Each `next()` unmarshals one bean
    /// against the current store state.
    pub fn get_all(&self, type_name: &str) -> BindResult<BeanIter<S>> {
        let descriptor = self.core.schema.describe(type_name)?;
        let type_predicate = NamedNode::from(rdf::TYPE);
        let object = Term::Resource(Resource::Named(descriptor.type_uri().clone()));
        let cursor = self
            .core
            .store
            .statements(None, Some(&type_predicate), Some(&object))?;
        Ok(BeanIter {
            cursor: Some(cursor),
            core: self.core.clone(),
            descriptor,
        })
    }

    /// Whether the store has any statement about `resource`
    pub fn exists(&self, resource: &Resource) -> BindResult<bool> {
        Ok(self.core.store.contains(Some(resource), None, None)?)
    }

    /// Whether `resource` carries the rdf:type of the given bean type
    pub fn exists_typed(&self, resource: &Resource, type_name: &str) -> BindResult<bool> {
        let descriptor = self.core.schema.describe(type_name)?;
        let type_predicate = NamedNode::from(rdf::TYPE);
        let object = Term::Resource(Resource::Named(descriptor.type_uri().clone()));
        Ok(self
            .core
            .store
            .contains(Some(resource), Some(&type_predicate), Some(&object))?)
    }

    /// Remove every statement where `resource` is the subject or the
    /// object, and purge its pooled proxies. Returns whether anything was
    /// there to delete.
    pub fn delete(&self, resource: &Resource) -> BindResult<bool> {
        let _ops = self.core.lock_ops();
        if !self.exists(resource)? {
            return Ok(false);
        }
        debug!(resource = %resource, "deleting resource");
        self.core.transactional(|| {
            self.core.store.remove(Some(resource), None, None)?;
            let target = Term::Resource(resource.clone());
            self.core.store.remove(None, None, Some(&target))?;
            self.core.proxies.purge(resource);
            Ok(())
        })?;
        Ok(true)
    }

    pub fn delete_by_id(&self, id: &str, type_name: &str) -> BindResult<bool> {
        match self.resource(id, type_name)? {
            Some(resource) => self.delete(&resource),
            None => Ok(false),
        }
    }

    /// Proxy for the resource named by `id`, writing its type statement
    /// first when the resource is new
    pub fn create(&self, id: &str, type_name: &str) -> BindResult<RdfProxy<S>> {
        let descriptor = self.core.schema.describe(type_name)?;
        let uri = match descriptor.subject() {
            Some(spec) => spec.resolve(id)?,
            None => schema::absolute_uri(id).ok_or_else(|| {
                BindError::validation(format!(
                    "cannot resolve identifier '{}': type '{}' declares no identifier property",
                    id, type_name
                ))
            })?,
        };
        self.create_internal(Resource::Named(uri), descriptor)
    }

    /// Proxy for an explicit resource
    pub fn create_at(&self, resource: Resource, type_name: &str) -> BindResult<RdfProxy<S>> {
        let descriptor = self.core.schema.describe(type_name)?;
        self.create_internal(resource, descriptor)
    }

    /// Proxies for every existing resource of a type; no new resources are
    /// written
    pub fn create_all(&self, type_name: &str) -> BindResult<Vec<RdfProxy<S>>> {
        let descriptor = self.core.schema.describe(type_name)?;
        let type_predicate = NamedNode::from(rdf::TYPE);
        let object = Term::Resource(Resource::Named(descriptor.type_uri().clone()));
        let subjects: Vec<Resource> = self
            .core
            .store
            .statements(None, Some(&type_predicate), Some(&object))?
            .map(|statement| statement.map(|statement| statement.subject))
            .collect::<StoreResult<_>>()?;

        let mut proxies = Vec::with_capacity(subjects.len());
        for subject in subjects {
            proxies.push(self.create_internal(subject, descriptor.clone())?);
        }
        Ok(proxies)
    }

    fn create_internal(
        &self,
        resource: Resource,
        descriptor: Arc<BeanDescriptor>,
    ) -> BindResult<RdfProxy<S>> {
        let _ops = self.core.lock_ops();
        let is_new = !self.core.store.contains(Some(&resource), None, None)?;
        if is_new {
            self.core.transactional(|| {
                self.core.store.add(Statement::new(
                    resource.clone(),
                    rdf::TYPE,
                    descriptor.type_uri().clone(),
                ))?;
                Ok(())
            })?;
        }
        let proxy = self
            .core
            .proxies
            .instance(&self.core, resource.clone(), descriptor);
        // release the operation lock before notifying, so listeners can
        // call back into the manager
        drop(_ops);
        if is_new {
            debug!(resource = %resource, "created new resource for proxy");
            self.core.fire_resource_created(&proxy, &resource);
        }
        Ok(proxy)
    }

    pub fn add_listener(&self, listener: Arc<dyn ProxyListener<S>>) {
        self.core
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ProxyListener<S>>) {
        self.core
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|known| !Arc::ptr_eq(known, listener));
    }
}

/// Lazy iterator over the beans of one type; each step unmarshals against
/// the live store
pub struct BeanIter<S: TripleStore> {
    cursor: Option<S::Cursor>,
    core: Arc<ManagerCore<S>>,
    descriptor: Arc<BeanDescriptor>,
}

impl<S: TripleStore> BeanIter<S> {
    /// Stop iterating and release the underlying cursor
    pub fn close(&mut self) {
        self.cursor = None;
    }
}

impl<S: TripleStore> Iterator for BeanIter<S> {
    type Item = BindResult<SharedBean>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        let statement = match cursor.next()? {
            Ok(statement) => statement,
            Err(err) => return Some(Err(err.into())),
        };
        let codec = self.core.codec_handle();
        let mut unmarshaler =
            Unmarshaler::new(&self.core.store, &self.core.schema, codec.as_ref());
        Some(unmarshaler.unmarshal(&statement.subject, &self.descriptor))
    }
}
