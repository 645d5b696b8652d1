//! RDF term types
//!
//! Crate-local wrappers around the oxrdf primitives: a [`Resource`] names an
//! RDF node (URI or blank node), a [`Term`] is anything a statement object
//! can hold, and a [`Statement`] is one (subject, predicate, object) fact.

use oxrdf::{BlankNode, Literal, NamedNode};
use std::fmt;
use uuid::Uuid;

/// RDF node identifier: a named resource (stable URI) or a blank node
/// (process-generated opaque identifier with no external name).
///
/// Resources are never renamed after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Named node (IRI)
    Named(NamedNode),
    /// Blank node
    Blank(BlankNode),
}

impl Resource {
    /// Allocate a fresh blank node with a process-unique label.
    pub fn new_blank() -> Self {
        Resource::Blank(BlankNode::new_unchecked(format!(
            "bn{}",
            Uuid::new_v4().simple()
        )))
    }

    /// Check if this is a named resource
    pub fn is_named(&self) -> bool {
        matches!(self, Resource::Named(_))
    }

    /// Check if this is a blank node
    pub fn is_blank(&self) -> bool {
        matches!(self, Resource::Blank(_))
    }

    /// Get the named node if this is a named resource
    pub fn as_named(&self) -> Option<&NamedNode> {
        match self {
            Resource::Named(n) => Some(n),
            Resource::Blank(_) => None,
        }
    }

    /// External string form: the IRI for named resources, the local label
    /// for blank nodes.
    pub fn as_str(&self) -> &str {
        match self {
            Resource::Named(n) => n.as_str(),
            Resource::Blank(b) => b.as_str(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Named(n) => write!(f, "<{}>", n.as_str()),
            Resource::Blank(b) => write!(f, "_:{}", b.as_str()),
        }
    }
}

impl From<NamedNode> for Resource {
    fn from(node: NamedNode) -> Self {
        Resource::Named(node)
    }
}

impl From<BlankNode> for Resource {
    fn from(node: BlankNode) -> Self {
        Resource::Blank(node)
    }
}

/// Statement object: a resource or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Named or blank node
    Resource(Resource),
    /// Literal value
    Literal(Literal),
}

impl Term {
    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Check if this is a resource
    pub fn is_resource(&self) -> bool {
        matches!(self, Term::Resource(_))
    }

    /// Get the resource if this term is one
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Term::Resource(r) => Some(r),
            Term::Literal(_) => None,
        }
    }

    /// Get the literal if this term is one
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            Term::Resource(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Resource(r) => write!(f, "{}", r),
            Term::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<Resource> for Term {
    fn from(resource: Resource) -> Self {
        Term::Resource(resource)
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::Resource(Resource::Named(node))
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::Resource(Resource::Blank(node))
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

/// RDF statement (subject, predicate, object)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    /// Subject
    pub subject: Resource,
    /// Predicate
    pub predicate: NamedNode,
    /// Object
    pub object: Term,
}

impl Statement {
    /// Create a new statement
    pub fn new(
        subject: impl Into<Resource>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate.as_str(), self.object)
    }
}
