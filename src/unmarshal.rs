//! Unmarshalling engine
//!
//! Rebuilds bean graphs from statements. One [`Unmarshaler`] lives for one
//! operation; its identity cache is filled before a bean's properties are,
//! so reference cycles in the data resolve to the handle already under
//! construction instead of recursing.

use crate::cache::UnmarshalCache;
use crate::codec::LiteralCodec;
use crate::error::{BindError, BindResult};
use crate::model::{normalize_collection, BeanValue, Resource, SharedBean, Term};
use crate::schema::{BeanDescriptor, PropertyDescriptor, PropertyKind, SchemaRegistry};
use crate::store::TripleStore;
use crate::vocab;
use oxrdf::vocab::rdf;
use oxrdf::NamedNode;
use std::sync::Arc;
use tracing::warn;

pub(crate) struct Unmarshaler<'a, S: TripleStore> {
    store: &'a S,
    schema: &'a SchemaRegistry,
    codec: &'a dyn LiteralCodec,
    cache: UnmarshalCache,
}

impl<'a, S: TripleStore> Unmarshaler<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        schema: &'a SchemaRegistry,
        codec: &'a dyn LiteralCodec,
    ) -> Self {
        Unmarshaler {
            store,
            schema,
            codec,
            cache: UnmarshalCache::new(),
        }
    }

    /// Rebuild the bean for `resource` using the given binding
    pub(crate) fn unmarshal(
        &mut self,
        resource: &Resource,
        descriptor: &Arc<BeanDescriptor>,
    ) -> BindResult<SharedBean> {
        if let Some(bean) = self.cache.get(resource) {
            return Ok(bean);
        }

        let bean = SharedBean::new(descriptor.type_name());
        // Cache before filling properties so cycles close on this handle
        self.cache.put(resource.clone(), bean.clone());

        if let (Some(spec), Resource::Named(subject)) = (descriptor.subject(), resource) {
            bean.set(spec.property(), spec.extract_id(subject));
        }

        for property in descriptor.properties() {
            if let Some(value) = self.read_property(resource, property)? {
                bean.set(property.name(), value);
            }
        }
        Ok(bean)
    }

    /// Read one property of `resource`. Returns `None` when no statements
    /// match or nothing they carry is usable.
    pub(crate) fn read_property(
        &mut self,
        resource: &Resource,
        property: &PropertyDescriptor,
    ) -> BindResult<Option<BeanValue>> {
        let terms = self.gather_terms(resource, property)?;
        if terms.is_empty() {
            return Ok(None);
        }

        match property.kind() {
            PropertyKind::Collection(flavor) => {
                let mut items = Vec::new();
                for term in &terms {
                    match self.from_term(term)? {
                        // container contents splice into the outer collection
                        Some(BeanValue::Collection(nested)) => items.extend(nested),
                        Some(value) => items.push(value),
                        None => {}
                    }
                }
                Ok(Some(BeanValue::Collection(normalize_collection(
                    items, flavor,
                ))))
            }
            PropertyKind::Scalar => match self.from_term(&terms[0])? {
                // a container read through a scalar collapses to its head
                Some(BeanValue::Collection(items)) => Ok(items.into_iter().next()),
                Some(value) => Ok(Some(value)),
                None => Ok(None),
            },
        }
    }

    /// Candidate terms for a property: statement objects, or statement
    /// subjects for inverse properties (falling back to container-mediated
    /// links when no direct statement points here)
    fn gather_terms(
        &self,
        resource: &Resource,
        property: &PropertyDescriptor,
    ) -> BindResult<Vec<Term>> {
        let predicate = property.predicate();
        if property.is_inverse() {
            let target = Term::Resource(resource.clone());
            let mut subjects = Vec::new();
            for statement in self.store.statements(None, Some(predicate), Some(&target))? {
                subjects.push(Term::Resource(statement?.subject));
            }
            if subjects.is_empty() {
                for statement in self.store.container_backlinks(predicate, resource)? {
                    subjects.push(Term::Resource(statement.subject));
                }
            }
            Ok(subjects)
        } else {
            let mut objects = Vec::new();
            for statement in self.store.statements(Some(resource), Some(predicate), None)? {
                objects.push(statement?.object);
            }
            Ok(objects)
        }
    }

    /// Map one term back to a value: literals through the codec, container
    /// nodes to collections, resources to nested beans when a binding is
    /// detectable and to bare URIs when not
    fn from_term(&mut self, term: &Term) -> BindResult<Option<BeanValue>> {
        match term {
            Term::Literal(literal) => match self.codec.from_literal(literal) {
                Some(value) => Ok(Some(value)),
                None => {
                    warn!(literal = %literal, "codec declined literal, skipping value");
                    Ok(None)
                }
            },
            Term::Resource(resource) => {
                if resource.is_blank() && self.is_container(resource)? {
                    let items = self.read_container(resource)?;
                    return Ok(Some(BeanValue::Collection(items)));
                }
                match self.detect(resource)? {
                    Some(descriptor) => {
                        Ok(Some(BeanValue::Ref(self.unmarshal(resource, &descriptor)?)))
                    }
                    None => match resource {
                        Resource::Named(node) => Ok(Some(BeanValue::Uri(node.clone()))),
                        Resource::Blank(_) => {
                            warn!(resource = %resource, "blank node with no detectable binding, skipping value");
                            Ok(None)
                        }
                    },
                }
            }
        }
    }

    /// Walk `rdf:_1`, `rdf:_2`, ... members of a container node until the
    /// first missing index
    fn read_container(&mut self, container: &Resource) -> BindResult<Vec<BeanValue>> {
        let mut items = Vec::new();
        let mut index = 1;
        loop {
            let member = vocab::member(index);
            let mut cursor = self.store.statements(Some(container), Some(&member), None)?;
            let Some(statement) = cursor.next().transpose()? else {
                break;
            };
            drop(cursor);
            if let Some(item) = self.from_term(&statement.object)? {
                items.push(item);
            }
            index += 1;
        }
        Ok(items)
    }

    fn is_container(&self, resource: &Resource) -> BindResult<bool> {
        let type_predicate = NamedNode::from(rdf::TYPE);
        for container_type in [rdf::BAG, rdf::SEQ, rdf::ALT] {
            let object = Term::Resource(Resource::Named(container_type.into()));
            if self
                .store
                .contains(Some(resource), Some(&type_predicate), Some(&object))?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Detect the binding for `resource` from its rdf:type statements:
    /// a type URI registered directly wins, otherwise a recorded type
    /// binding statement is followed by name. Bridged URIs are remembered
    /// on the registry so later detections skip the store lookup.
    pub(crate) fn detect(&self, resource: &Resource) -> BindResult<Option<Arc<BeanDescriptor>>> {
        let type_predicate = NamedNode::from(rdf::TYPE);
        for statement in self
            .store
            .statements(Some(resource), Some(&type_predicate), None)?
        {
            let statement = statement?;
            let type_uri = match &statement.object {
                Term::Resource(Resource::Named(uri)) => uri.clone(),
                _ => continue,
            };
            if let Some(descriptor) = self.schema.descriptor_for_uri(&type_uri) {
                return Ok(Some(descriptor));
            }
            if let Some(descriptor) = self.schema.alias_for_uri(&type_uri) {
                return Ok(Some(descriptor));
            }
            if let Some(descriptor) = self.bound_descriptor(&type_uri)? {
                self.schema.record_uri_alias(type_uri, descriptor.clone());
                return Ok(Some(descriptor));
            }
        }
        Ok(None)
    }

    /// Like [`detect`](Self::detect) but failing with a type detection error
    /// instead of `None`
    pub(crate) fn detect_descriptor(
        &self,
        resource: &Resource,
    ) -> BindResult<Arc<BeanDescriptor>> {
        self.detect(resource)?
            .ok_or_else(|| BindError::TypeDetection(resource.to_string()))
    }

    /// Follow a recorded type binding statement from a type URI to a
    /// registered binding with that name
    fn bound_descriptor(&self, type_uri: &NamedNode) -> BindResult<Option<Arc<BeanDescriptor>>> {
        let subject = Resource::Named(type_uri.clone());
        let predicate = NamedNode::from(vocab::BOUND_TYPE);
        for statement in self
            .store
            .statements(Some(&subject), Some(&predicate), None)?
        {
            let statement = statement?;
            if let Term::Literal(name) = &statement.object {
                if self.schema.is_registered(name.value()) {
                    return Ok(Some(self.schema.describe(name.value())?));
                }
                warn!(
                    type_name = name.value(),
                    "recorded type binding names an unregistered type"
                );
            }
        }
        Ok(None)
    }
}
