//! rdfbind
//!
//! Bidirectional mapping between in-memory object graphs and RDF triple
//! stores: typed beans marshal into subject-predicate-object statements and
//! unmarshal back, without losing shared references or choking on cycles.
//!
//! # Features
//!
//! - Declarative type bindings: type URI, subject identity rule, one
//!   predicate per property
//! - Cycle-safe marshalling and unmarshalling through per-operation
//!   identity caches
//! - Collections as repeated statements or as RDF containers (rdf:Bag,
//!   rdf:Seq, rdf:Alt)
//! - Inverse properties, stored pointing at the bean instead of away
//!   from it
//! - Lazy, identity-stable proxies backed by a weak-valued pool
//! - Pluggable storage behind the [`TripleStore`] trait and pluggable
//!   scalar encoding behind [`LiteralCodec`]
//! - Per-operation transactions with rollback on error (autocommit), or
//!   caller-managed transaction scopes
//!
//! # Example Usage
//!
//! ```rust
//! use rdfbind::{BeanDescriptor, BeanManager, MemoryStore, PropertyDescriptor, SharedBean};
//!
//! let manager = BeanManager::new(MemoryStore::new());
//! manager
//!     .schema()
//!     .register(
//!         BeanDescriptor::new("Person", "http://xmlns.com/foaf/0.1/Person")
//!             .unwrap()
//!             .with_subject("id", Some("urn:people:"))
//!             .with_property(
//!                 PropertyDescriptor::scalar("name", "http://xmlns.com/foaf/0.1/name").unwrap(),
//!             ),
//!     )
//!     .unwrap();
//!
//! // Marshal a bean into statements
//! let person = SharedBean::new("Person");
//! person.set("id", "alice");
//! person.set("name", "Alice");
//! let resource = manager.add(&person).unwrap();
//!
//! // ... and back into a bean
//! let rebuilt = manager.get(&resource, "Person").unwrap().unwrap();
//! assert_eq!(rebuilt.get("name").unwrap().as_str(), Some("Alice"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod manager;
pub mod model;
pub mod proxy;
pub mod schema;
pub mod store;
pub mod vocab;

mod cache;
mod marshal;
mod unmarshal;

// Re-export main types for convenience
pub use codec::{DefaultCodec, LiteralCodec};

pub use error::{BindError, BindResult};

pub use manager::{BeanIter, BeanManager};

pub use model::{Bean, BeanValue, Resource, SharedBean, Statement, Term};

pub use proxy::{ProxyListener, RdfProxy};

pub use schema::{
    BeanDescriptor, CollectionFlavor, ContainerKind, PropertyDescriptor, PropertyKind,
    SchemaRegistry, SubjectSpec,
};

pub use store::{MemoryStore, StoreError, StoreResult, TripleStore};

pub use oxrdf::{BlankNode, Literal, NamedNode};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
