//! Bean type bindings
//!
//! A [`BeanDescriptor`] declares how one bean type maps onto RDF: its type
//! URI, how subjects are named, and one [`PropertyDescriptor`] per mapped
//! property. Descriptors live in a [`SchemaRegistry`] shared by the engines.

use crate::error::{BindError, BindResult};
use oxiri::Iri;
use oxrdf::vocab::rdf;
use oxrdf::{NamedNode, NamedNodeRef};
use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// RDF container layout for a collection property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// No container: one statement per element, all sharing the predicate
    None,
    /// rdf:Bag (unordered)
    Bag,
    /// rdf:Seq (ordered)
    Seq,
    /// rdf:Alt (alternatives)
    Alt,
}

impl ContainerKind {
    /// Container class URI, if this kind uses a container node
    pub fn type_uri(&self) -> Option<NamedNodeRef<'static>> {
        match self {
            ContainerKind::None => None,
            ContainerKind::Bag => Some(rdf::BAG),
            ContainerKind::Seq => Some(rdf::SEQ),
            ContainerKind::Alt => Some(rdf::ALT),
        }
    }
}

/// In-memory shape a collection property unmarshals into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFlavor {
    /// Keep gathered order and duplicates
    List,
    /// Deduplicate, keep first-encounter order
    Set,
    /// Deduplicate and sort canonically
    SortedSet,
}

/// Scalar or collection property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar,
    Collection(CollectionFlavor),
}

/// How one bean property maps onto statements
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    predicate: NamedNode,
    kind: PropertyKind,
    container: ContainerKind,
    inverse: bool,
}

impl PropertyDescriptor {
    /// Scalar property mapped to `predicate_uri`
    pub fn scalar(name: impl Into<String>, predicate_uri: &str) -> BindResult<Self> {
        Ok(PropertyDescriptor {
            name: name.into(),
            predicate: parse_uri(predicate_uri)?,
            kind: PropertyKind::Scalar,
            container: ContainerKind::None,
            inverse: false,
        })
    }

    /// Collection property mapped to `predicate_uri`
    pub fn collection(
        name: impl Into<String>,
        predicate_uri: &str,
        flavor: CollectionFlavor,
    ) -> BindResult<Self> {
        Ok(PropertyDescriptor {
            name: name.into(),
            predicate: parse_uri(predicate_uri)?,
            kind: PropertyKind::Collection(flavor),
            container: ContainerKind::None,
            inverse: false,
        })
    }

    /// Store the collection through an RDF container node of the given kind
    pub fn with_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    /// Mark the property as inverse: statements point at this bean's subject
    /// instead of away from it
    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> &NamedNode {
        &self.predicate
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    pub(crate) fn is_collection(&self) -> bool {
        matches!(self.kind, PropertyKind::Collection(_))
    }
}

/// Subject naming rule: which bean property carries the identifier and the
/// optional namespace prefix it expands under
#[derive(Debug, Clone)]
pub struct SubjectSpec {
    property: String,
    prefix: Option<String>,
}

impl SubjectSpec {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Turn an identifier value into a subject URI. An identifier that is
    /// already an absolute URI is used as-is; otherwise it is expanded under
    /// the prefix.
    pub fn resolve(&self, id: &str) -> BindResult<NamedNode> {
        if let Some(uri) = absolute_uri(id) {
            return Ok(uri);
        }
        match &self.prefix {
            Some(prefix) => parse_uri(&format!("{}{}", prefix, id)),
            None => Err(BindError::validation(format!(
                "identifier '{}' is not an absolute URI and the binding declares no prefix",
                id
            ))),
        }
    }

    /// Recover the identifier value from a subject URI: the prefix is
    /// stripped when it matches, otherwise the full URI string is kept
    pub fn extract_id(&self, subject: &NamedNode) -> String {
        let uri = subject.as_str();
        match &self.prefix {
            Some(prefix) => uri.strip_prefix(prefix.as_str()).unwrap_or(uri).to_string(),
            None => uri.to_string(),
        }
    }
}

/// Binding between one bean type and its RDF representation
#[derive(Debug, Clone)]
pub struct BeanDescriptor {
    type_name: String,
    type_uri: NamedNode,
    subject: Option<SubjectSpec>,
    properties: Vec<PropertyDescriptor>,
}

impl BeanDescriptor {
    pub fn new(type_name: impl Into<String>, type_uri: &str) -> BindResult<Self> {
        Ok(BeanDescriptor {
            type_name: type_name.into(),
            type_uri: parse_uri(type_uri)?,
            subject: None,
            properties: Vec::new(),
        })
    }

    /// Declare the identifier property; beans carrying it marshal to named
    /// resources, beans without it stay anonymous
    pub fn with_subject(mut self, property: impl Into<String>, prefix: Option<&str>) -> Self {
        self.subject = Some(SubjectSpec {
            property: property.into(),
            prefix: prefix.map(|p| p.to_string()),
        });
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_uri(&self) -> &NamedNode {
        &self.type_uri
    }

    pub fn subject(&self) -> Option<&SubjectSpec> {
        self.subject.as_ref()
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn validate(&self) -> BindResult<()> {
        let mut seen: Vec<&str> = Vec::new();
        for property in &self.properties {
            if seen.contains(&property.name.as_str()) {
                return Err(BindError::validation(format!(
                    "duplicate property '{}' in binding for '{}'",
                    property.name, self.type_name
                )));
            }
            seen.push(&property.name);

            if property.inverse && property.container != ContainerKind::None {
                return Err(BindError::validation(format!(
                    "property '{}' of '{}' cannot be both inverse and container-backed",
                    property.name, self.type_name
                )));
            }
            if property.container != ContainerKind::None && !property.is_collection() {
                return Err(BindError::validation(format!(
                    "scalar property '{}' of '{}' cannot use an RDF container",
                    property.name, self.type_name
                )));
            }
        }
        if let Some(subject) = &self.subject {
            if self.property(&subject.property).is_some() {
                return Err(BindError::validation(format!(
                    "identifier property '{}' of '{}' is also mapped as a regular property",
                    subject.property, self.type_name
                )));
            }
        }
        Ok(())
    }
}

fn parse_uri(uri: &str) -> BindResult<NamedNode> {
    NamedNode::new(uri)
        .map_err(|e| BindError::validation(format!("invalid URI '{}': {}", uri, e)))
}

/// Parse `id` as an absolute URI, or `None` if it is a plain identifier
pub(crate) fn absolute_uri(id: &str) -> Option<NamedNode> {
    if Iri::parse(id).is_ok() {
        NamedNode::new(id).ok()
    } else {
        None
    }
}

#[derive(Default)]
struct Bindings {
    by_name: FxHashMap<String, Arc<BeanDescriptor>>,
    by_uri: FxHashMap<NamedNode, Arc<BeanDescriptor>>,
    /// Type URIs resolved through recorded binding statements, kept so
    /// repeated detection skips the store lookup
    aliases: FxHashMap<NamedNode, Arc<BeanDescriptor>>,
}

/// Registry of bean type bindings, shared across engines and threads
#[derive(Default)]
pub struct SchemaRegistry {
    bindings: RwLock<Bindings>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding, validating its internal consistency and checking
    /// for name or type-URI clashes with earlier registrations
    pub fn register(&self, descriptor: BeanDescriptor) -> BindResult<()> {
        descriptor.validate()?;
        let mut bindings = self.write();
        if bindings.by_name.contains_key(descriptor.type_name()) {
            return Err(BindError::validation(format!(
                "binding for type '{}' already registered",
                descriptor.type_name()
            )));
        }
        if bindings.by_uri.contains_key(descriptor.type_uri()) {
            return Err(BindError::validation(format!(
                "type URI <{}> already bound to another type",
                descriptor.type_uri().as_str()
            )));
        }
        let descriptor = Arc::new(descriptor);
        bindings
            .by_name
            .insert(descriptor.type_name().to_string(), descriptor.clone());
        bindings
            .by_uri
            .insert(descriptor.type_uri().clone(), descriptor);
        Ok(())
    }

    /// Look up the binding for a bean type name
    pub fn describe(&self, type_name: &str) -> BindResult<Arc<BeanDescriptor>> {
        self.read().by_name.get(type_name).cloned().ok_or_else(|| {
            BindError::validation(format!("no binding registered for type '{}'", type_name))
        })
    }

    /// Look up the binding declaring the given type URI
    pub fn descriptor_for_uri(&self, type_uri: &NamedNode) -> Option<Arc<BeanDescriptor>> {
        self.read().by_uri.get(type_uri).cloned()
    }

    pub(crate) fn alias_for_uri(&self, type_uri: &NamedNode) -> Option<Arc<BeanDescriptor>> {
        self.read().aliases.get(type_uri).cloned()
    }

    /// Remember that `type_uri` resolves to `descriptor` through a recorded
    /// binding statement
    pub(crate) fn record_uri_alias(&self, type_uri: NamedNode, descriptor: Arc<BeanDescriptor>) {
        self.write().aliases.insert(type_uri, descriptor);
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.read().by_name.contains_key(type_name)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Bindings> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Bindings> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> BeanDescriptor {
        BeanDescriptor::new("Person", "http://example.org/Person")
            .unwrap()
            .with_subject("id", Some("urn:ex:"))
            .with_property(
                PropertyDescriptor::scalar("name", "http://xmlns.com/foaf/0.1/name").unwrap(),
            )
    }

    #[test]
    fn test_register_and_describe() {
        let registry = SchemaRegistry::new();
        registry.register(person()).unwrap();

        let descriptor = registry.describe("Person").unwrap();
        assert_eq!(descriptor.type_name(), "Person");
        assert_eq!(descriptor.type_uri().as_str(), "http://example.org/Person");
        assert!(descriptor.property("name").is_some());
        assert!(registry.is_registered("Person"));
    }

    #[test]
    fn test_describe_unregistered_type_fails() {
        let registry = SchemaRegistry::new();
        let err = registry.describe("Ghost").unwrap_err();
        assert!(err.to_string().contains("no binding registered"));
    }

    #[test]
    fn test_duplicate_type_name_rejected() {
        let registry = SchemaRegistry::new();
        registry.register(person()).unwrap();
        assert!(registry.register(person()).is_err());
    }

    #[test]
    fn test_duplicate_type_uri_rejected() {
        let registry = SchemaRegistry::new();
        registry.register(person()).unwrap();
        let clone = BeanDescriptor::new("Human", "http://example.org/Person").unwrap();
        assert!(registry.register(clone).is_err());
    }

    #[test]
    fn test_inverse_container_conflict_rejected() {
        let registry = SchemaRegistry::new();
        let descriptor = BeanDescriptor::new("Thing", "http://example.org/Thing")
            .unwrap()
            .with_property(
                PropertyDescriptor::collection(
                    "parts",
                    "http://example.org/parts",
                    CollectionFlavor::List,
                )
                .unwrap()
                .with_container(ContainerKind::Seq)
                .inverse(),
            );
        assert!(registry.register(descriptor).is_err());
    }

    #[test]
    fn test_container_on_scalar_rejected() {
        let registry = SchemaRegistry::new();
        let descriptor = BeanDescriptor::new("Thing", "http://example.org/Thing")
            .unwrap()
            .with_property(
                PropertyDescriptor::scalar("label", "http://example.org/label")
                    .unwrap()
                    .with_container(ContainerKind::Bag),
            );
        assert!(registry.register(descriptor).is_err());
    }

    #[test]
    fn test_subject_resolution() {
        let descriptor = person();
        let subject = descriptor.subject().unwrap();

        let minted = subject.resolve("42").unwrap();
        assert_eq!(minted.as_str(), "urn:ex:42");
        assert_eq!(subject.extract_id(&minted), "42");

        let absolute = subject.resolve("http://example.org/alice").unwrap();
        assert_eq!(absolute.as_str(), "http://example.org/alice");
        assert_eq!(subject.extract_id(&absolute), "http://example.org/alice");
    }

    #[test]
    fn test_relative_id_without_prefix_fails() {
        let descriptor = BeanDescriptor::new("Thing", "http://example.org/Thing")
            .unwrap()
            .with_subject("id", None);
        let err = descriptor.subject().unwrap().resolve("42").unwrap_err();
        assert!(err.to_string().contains("not an absolute URI"));
    }
}
