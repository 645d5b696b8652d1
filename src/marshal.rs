//! Marshalling engine
//!
//! Walks a bean graph and writes it out as statements. One [`Marshaler`]
//! lives for exactly one operation; its identity cache maps every bean
//! visited to the resource it became, so shared references converge and
//! cycles terminate.

use crate::cache::MarshalCache;
use crate::codec::LiteralCodec;
use crate::error::{BindError, BindResult};
use crate::model::{BeanValue, Resource, SharedBean, Statement, Term};
use crate::schema::{BeanDescriptor, PropertyDescriptor, SchemaRegistry};
use crate::store::TripleStore;
use crate::vocab;
use oxrdf::vocab::rdf;
use oxrdf::{Literal, NamedNode};
use std::sync::Arc;
use tracing::debug;

pub(crate) struct Marshaler<'a, S: TripleStore> {
    store: &'a S,
    schema: &'a SchemaRegistry,
    codec: &'a dyn LiteralCodec,
    cache: MarshalCache,
}

impl<'a, S: TripleStore> Marshaler<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        schema: &'a SchemaRegistry,
        codec: &'a dyn LiteralCodec,
    ) -> Self {
        Marshaler {
            store,
            schema,
            codec,
            cache: MarshalCache::new(),
        }
    }

    /// Marshal the graph rooted at `bean` and return the root's resource.
    ///
    /// A named resource that already has statements is left untouched unless
    /// `update` is set, in which case its subject-side statements are
    /// replaced. Nested beans are always marshalled in non-update mode.
    pub(crate) fn marshal(&mut self, bean: &SharedBean, update: bool) -> BindResult<Resource> {
        if let Some(resource) = self.cache.get(bean) {
            return Ok(resource.clone());
        }

        let descriptor = self.schema.describe(&bean.type_name())?;

        // Record the type binding so readers can recover the bean type
        self.store.add(Statement::new(
            descriptor.type_uri().clone(),
            vocab::BOUND_TYPE,
            Literal::new_simple_literal(descriptor.type_name()),
        ))?;

        let subject = match self.subject_from_identifier(bean, &descriptor)? {
            Some(named) => {
                let resource = Resource::Named(named);
                if self.store.contains(Some(&resource), None, None)? {
                    if update {
                        self.store.remove(Some(&resource), None, None)?;
                    } else {
                        debug!(subject = %resource, "resource already present, not marshalled");
                        return Ok(resource);
                    }
                }
                resource
            }
            None => Resource::new_blank(),
        };

        // Cache before filling properties: cycles back to this bean must
        // resolve to the subject under construction
        self.cache.put(bean, subject.clone());

        self.store.add(Statement::new(
            subject.clone(),
            rdf::TYPE,
            descriptor.type_uri().clone(),
        ))?;

        for property in descriptor.properties() {
            self.marshal_property(bean, &subject, property)?;
        }
        Ok(subject)
    }

    /// Subject for a bean: its identifier property resolved to a URI, or
    /// `None` when the binding has no identifier or the bean leaves it unset
    fn subject_from_identifier(
        &self,
        bean: &SharedBean,
        descriptor: &Arc<BeanDescriptor>,
    ) -> BindResult<Option<NamedNode>> {
        let Some(spec) = descriptor.subject() else {
            return Ok(None);
        };
        match bean.get(spec.property()) {
            None => Ok(None),
            Some(BeanValue::String(id)) => spec.resolve(&id).map(Some),
            Some(BeanValue::Uri(uri)) => Ok(Some(uri)),
            Some(other) => Err(BindError::validation(format!(
                "identifier property '{}' of '{}' must hold a string or URI, found {}",
                spec.property(),
                descriptor.type_name(),
                other.kind_name()
            ))),
        }
    }

    fn marshal_property(
        &mut self,
        bean: &SharedBean,
        subject: &Resource,
        property: &PropertyDescriptor,
    ) -> BindResult<()> {
        let value = bean.get(property.name());
        self.write_property_value(subject, property, value.as_ref())
    }

    /// Write the statements for one property value. Inverse properties are
    /// pruned first so stale links to this subject go away even when the
    /// value is absent; whatever `value` holds is then written back.
    pub(crate) fn write_property_value(
        &mut self,
        subject: &Resource,
        property: &PropertyDescriptor,
        value: Option<&BeanValue>,
    ) -> BindResult<()> {
        let predicate = property.predicate().clone();

        if property.is_inverse() {
            let target = Term::Resource(subject.clone());
            self.store.remove(None, Some(&predicate), Some(&target))?;
        }

        let Some(value) = value else {
            return Ok(());
        };

        match value {
            BeanValue::Collection(items) => {
                if let Some(container_type) = property.container().type_uri() {
                    let container = Resource::new_blank();
                    self.store.add(Statement::new(
                        container.clone(),
                        rdf::TYPE,
                        NamedNode::from(container_type),
                    ))?;
                    let mut index = 1;
                    for item in items {
                        let object = self.to_term(item)?;
                        self.store.add(Statement::new(
                            container.clone(),
                            vocab::member(index),
                            object,
                        ))?;
                        index += 1;
                    }
                    self.store
                        .add(Statement::new(subject.clone(), predicate, container))?;
                } else {
                    for item in items {
                        let object = self.to_term(item)?;
                        self.link(subject, &predicate, object, property)?;
                    }
                }
            }
            single => {
                let object = self.to_term(single)?;
                self.link(subject, &predicate, object, property)?;
            }
        }
        Ok(())
    }

    /// Write one statement for a property value, reversed when the property
    /// is inverse
    fn link(
        &self,
        subject: &Resource,
        predicate: &NamedNode,
        object: Term,
        property: &PropertyDescriptor,
    ) -> BindResult<()> {
        if property.is_inverse() {
            match object {
                Term::Resource(resource) => {
                    self.store.add(Statement::new(
                        resource,
                        predicate.clone(),
                        subject.clone(),
                    ))?;
                }
                Term::Literal(_) => {
                    return Err(BindError::validation(format!(
                        "value of inverse property '{}' must be a resource",
                        property.name()
                    )));
                }
            }
        } else {
            self.store
                .add(Statement::new(subject.clone(), predicate.clone(), object))?;
        }
        Ok(())
    }

    /// Map one value to an RDF term: codec first, then nested beans, then
    /// bare URIs
    fn to_term(&mut self, value: &BeanValue) -> BindResult<Term> {
        if let Some(literal) = self.codec.to_literal(value) {
            return Ok(Term::Literal(literal));
        }
        match value {
            BeanValue::Ref(bean) => Ok(Term::Resource(self.marshal(bean, false)?)),
            BeanValue::Uri(uri) => Ok(Term::Resource(Resource::Named(uri.clone()))),
            other => Err(BindError::unsupported(format!(
                "cannot map {} value to an RDF term",
                other.kind_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DefaultCodec;
    use crate::schema::{CollectionFlavor, ContainerKind};
    use crate::store::MemoryStore;

    fn person_registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .register(
                BeanDescriptor::new("Person", "http://example.org/Person")
                    .unwrap()
                    .with_subject("id", Some("urn:people:"))
                    .with_property(
                        PropertyDescriptor::scalar("name", "http://xmlns.com/foaf/0.1/name")
                            .unwrap(),
                    )
                    .with_property(
                        PropertyDescriptor::scalar("spouse", "http://example.org/spouse")
                            .unwrap(),
                    )
                    .with_property(
                        PropertyDescriptor::collection(
                            "nicknames",
                            "http://example.org/nickname",
                            CollectionFlavor::Set,
                        )
                        .unwrap(),
                    ),
            )
            .unwrap();
        registry
    }

    fn marshal_one(
        store: &MemoryStore,
        registry: &SchemaRegistry,
        bean: &SharedBean,
        update: bool,
    ) -> BindResult<Resource> {
        Marshaler::new(store, registry, &DefaultCodec).marshal(bean, update)
    }

    #[test]
    fn test_named_bean_statements() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let bean = SharedBean::new("Person");
        bean.set("id", "alice");
        bean.set("name", "Alice");

        let subject = marshal_one(&store, &registry, &bean, false).unwrap();
        assert_eq!(subject.as_str(), "urn:people:alice");

        let type_uri = NamedNode::new("http://example.org/Person").unwrap();
        // binding statement, rdf:type, one property
        assert!(store
            .contains(
                Some(&Resource::Named(type_uri.clone())),
                Some(&NamedNode::from(vocab::BOUND_TYPE)),
                Some(&Term::Literal(Literal::new_simple_literal("Person")))
            )
            .unwrap());
        assert!(store
            .contains(
                Some(&subject),
                Some(&NamedNode::from(rdf::TYPE)),
                Some(&Term::Resource(Resource::Named(type_uri)))
            )
            .unwrap());
        let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
        assert!(store
            .contains(
                Some(&subject),
                Some(&name),
                Some(&Term::Literal(Literal::new_simple_literal("Alice")))
            )
            .unwrap());
    }

    #[test]
    fn test_bean_without_identifier_gets_blank_subject() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let bean = SharedBean::new("Person");
        bean.set("name", "Nobody");

        let subject = marshal_one(&store, &registry, &bean, false).unwrap();
        assert!(subject.is_blank());
    }

    #[test]
    fn test_existing_resource_is_not_overwritten_without_update() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let first = SharedBean::new("Person");
        first.set("id", "alice");
        first.set("name", "Alice");
        marshal_one(&store, &registry, &first, false).unwrap();
        let before = store.len().unwrap();

        let second = SharedBean::new("Person");
        second.set("id", "alice");
        second.set("name", "Impostor");
        let subject = marshal_one(&store, &registry, &second, false).unwrap();

        assert_eq!(subject.as_str(), "urn:people:alice");
        assert_eq!(store.len().unwrap(), before);
        let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
        assert!(store
            .contains(
                Some(&subject),
                Some(&name),
                Some(&Term::Literal(Literal::new_simple_literal("Alice")))
            )
            .unwrap());
    }

    #[test]
    fn test_update_replaces_subject_side_statements() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let bean = SharedBean::new("Person");
        bean.set("id", "alice");
        bean.set("name", "Alice");
        bean.set("nicknames", vec![BeanValue::from("Al"), BeanValue::from("Ali")]);
        let subject = marshal_one(&store, &registry, &bean, false).unwrap();

        bean.set("name", "Alicia");
        bean.remove("nicknames");
        marshal_one(&store, &registry, &bean, true).unwrap();

        let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
        let names: Vec<_> = store
            .statements(Some(&subject), Some(&name), None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(
            names[0].object,
            Term::Literal(Literal::new_simple_literal("Alicia"))
        );

        let nickname = NamedNode::new("http://example.org/nickname").unwrap();
        assert!(!store.contains(Some(&subject), Some(&nickname), None).unwrap());
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let alice = SharedBean::new("Person");
        alice.set("id", "alice");
        let bob = SharedBean::new("Person");
        bob.set("id", "bob");
        alice.set("spouse", bob.clone());
        bob.set("spouse", alice.clone());

        let subject = marshal_one(&store, &registry, &alice, false).unwrap();

        let spouse = NamedNode::new("http://example.org/spouse").unwrap();
        let bob_subject = Resource::Named(NamedNode::new("urn:people:bob").unwrap());
        assert!(store
            .contains(
                Some(&subject),
                Some(&spouse),
                Some(&Term::Resource(bob_subject.clone()))
            )
            .unwrap());
        assert!(store
            .contains(
                Some(&bob_subject),
                Some(&spouse),
                Some(&Term::Resource(subject))
            )
            .unwrap());
    }

    #[test]
    fn test_shared_reference_marshals_once() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let child = SharedBean::new("Person");
        let parent = SharedBean::new("Person");
        parent.set("id", "parent");
        parent.set(
            "nicknames",
            vec![BeanValue::Ref(child.clone()), BeanValue::Ref(child.clone())],
        );

        marshal_one(&store, &registry, &parent, false).unwrap();

        // one rdf:type statement for the child, not two
        let type_predicate = NamedNode::from(rdf::TYPE);
        let person_type = Term::Resource(Resource::Named(
            NamedNode::new("http://example.org/Person").unwrap(),
        ));
        let typed: Vec<_> = store
            .statements(None, Some(&type_predicate), Some(&person_type))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(typed.len(), 2);
    }

    #[test]
    fn test_container_encoding() {
        let store = MemoryStore::new();
        let registry = SchemaRegistry::new();
        registry
            .register(
                BeanDescriptor::new("Playlist", "http://example.org/Playlist")
                    .unwrap()
                    .with_subject("id", Some("urn:list:"))
                    .with_property(
                        PropertyDescriptor::collection(
                            "tracks",
                            "http://example.org/track",
                            CollectionFlavor::List,
                        )
                        .unwrap()
                        .with_container(ContainerKind::Seq),
                    ),
            )
            .unwrap();

        let list = SharedBean::new("Playlist");
        list.set("id", "mix");
        list.set(
            "tracks",
            vec![BeanValue::from("one"), BeanValue::from("two")],
        );
        let subject = marshal_one(&store, &registry, &list, false).unwrap();

        let track = NamedNode::new("http://example.org/track").unwrap();
        let links: Vec<_> = store
            .statements(Some(&subject), Some(&track), None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(links.len(), 1);
        let container = links[0].object.as_resource().unwrap().clone();
        assert!(container.is_blank());

        assert!(store
            .contains(
                Some(&container),
                Some(&NamedNode::from(rdf::TYPE)),
                Some(&Term::Resource(Resource::Named(NamedNode::from(rdf::SEQ))))
            )
            .unwrap());
        assert!(store
            .contains(
                Some(&container),
                Some(&vocab::member(1)),
                Some(&Term::Literal(Literal::new_simple_literal("one")))
            )
            .unwrap());
        assert!(store
            .contains(
                Some(&container),
                Some(&vocab::member(2)),
                Some(&Term::Literal(Literal::new_simple_literal("two")))
            )
            .unwrap());
        assert!(!store.contains(Some(&container), Some(&vocab::member(3)), None).unwrap());
    }

    #[test]
    fn test_inverse_property_writes_reversed_and_prunes() {
        let store = MemoryStore::new();
        let registry = SchemaRegistry::new();
        registry
            .register(
                BeanDescriptor::new("Person", "http://example.org/Person")
                    .unwrap()
                    .with_subject("id", Some("urn:people:"))
                    .with_property(
                        PropertyDescriptor::scalar("knownBy", "http://example.org/knows")
                            .unwrap()
                            .inverse(),
                    ),
            )
            .unwrap();

        let knows = NamedNode::new("http://example.org/knows").unwrap();
        let alice = Resource::Named(NamedNode::new("urn:people:alice").unwrap());
        let stale = NamedNode::new("urn:people:old-friend").unwrap();
        store
            .add(Statement::new(stale, knows.clone(), alice.clone()))
            .unwrap();

        let bean = SharedBean::new("Person");
        bean.set("id", "alice");
        bean.set(
            "knownBy",
            BeanValue::Uri(NamedNode::new("urn:people:bob").unwrap()),
        );
        marshal_one(&store, &registry, &bean, false).unwrap();

        let pointing: Vec<_> = store
            .statements(None, Some(&knows), Some(&Term::Resource(alice)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pointing.len(), 1);
        assert_eq!(
            pointing[0].subject,
            Resource::Named(NamedNode::new("urn:people:bob").unwrap())
        );
    }

    #[test]
    fn test_inverse_literal_value_is_rejected() {
        let store = MemoryStore::new();
        let registry = SchemaRegistry::new();
        registry
            .register(
                BeanDescriptor::new("Person", "http://example.org/Person")
                    .unwrap()
                    .with_property(
                        PropertyDescriptor::scalar("knownBy", "http://example.org/knows")
                            .unwrap()
                            .inverse(),
                    ),
            )
            .unwrap();

        let bean = SharedBean::new("Person");
        bean.set("knownBy", "not-a-resource");
        let err = marshal_one(&store, &registry, &bean, false).unwrap_err();
        assert!(err.to_string().contains("must be a resource"));
    }

    #[test]
    fn test_nested_collection_is_unsupported() {
        let store = MemoryStore::new();
        let registry = person_registry();

        let bean = SharedBean::new("Person");
        bean.set(
            "nicknames",
            vec![BeanValue::Collection(vec![BeanValue::from("x")])],
        );
        let err = marshal_one(&store, &registry, &bean, false).unwrap_err();
        assert!(matches!(err, BindError::UnsupportedValue(_)));
    }

    #[test]
    fn test_unregistered_type_fails() {
        let store = MemoryStore::new();
        let registry = person_registry();
        let bean = SharedBean::new("Ghost");
        assert!(marshal_one(&store, &registry, &bean, false).is_err());
    }
}
