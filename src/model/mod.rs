//! Data model shared by the marshalling and unmarshalling engines
//!
//! Two worlds meet here:
//! - RDF terms: [`Resource`], [`Term`] and [`Statement`] (thin wrappers over
//!   `oxrdf` node types)
//! - Beans: [`Bean`], [`SharedBean`] and [`BeanValue`], the in-memory object
//!   graph side of the mapping
//!
//! # Example
//!
//! ```rust
//! use rdfbind::model::{BeanValue, SharedBean};
//!
//! let person = SharedBean::new("Person");
//! person.set("name", "Alice");
//! person.set("age", 30i64);
//!
//! assert_eq!(person.get("name").unwrap().as_str(), Some("Alice"));
//! assert_eq!(person.get("age"), Some(BeanValue::Int(30)));
//! ```

mod bean;
mod term;
mod value;

pub use bean::{Bean, SharedBean};
pub use term::{Resource, Statement, Term};
pub use value::BeanValue;

pub(crate) use value::normalize_collection;
