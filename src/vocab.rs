//! Reserved vocabulary
//!
//! The binding predicate recording type-name bindings, plus helpers for the
//! RDF container vocabulary (`rdf:Bag`/`rdf:Seq`/`rdf:Alt` markers and the
//! `rdf:_1, rdf:_2, …` ordinal membership predicates). The standard rdf:
//! terms themselves come from [`oxrdf::vocab::rdf`].

use oxrdf::{NamedNode, NamedNodeRef};

/// The RDF syntax namespace
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Predicate recording which bean type an RDF type URI is bound to:
/// `(type_uri, BOUND_TYPE, literal(type_name))`, written whenever the type
/// marshals (the store's set semantics keep it single) and consulted during
/// type-less unmarshal.
pub const BOUND_TYPE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://rdfbind.org/ns/1.0/boundType");

/// Mint the ordinal container membership predicate `rdf:_index`
/// (1-based, per the RDF container model).
pub fn member(index: usize) -> NamedNode {
    NamedNode::new_unchecked(format!("{}_{}", RDF_NS, index))
}

/// Parse an ordinal membership predicate back to its 1-based index.
///
/// Returns `None` for predicates outside the `rdf:_N` family (including
/// `rdf:_0`, which the container model does not use).
pub fn member_index(predicate: &NamedNode) -> Option<usize> {
    let rest = predicate.as_str().strip_prefix(RDF_NS)?;
    let digits = rest.strip_prefix('_')?;
    match digits.parse::<usize>() {
        Ok(i) if i >= 1 => Some(i),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::rdf;

    #[test]
    fn test_member_roundtrip() {
        let p = member(1);
        assert_eq!(
            p.as_str(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#_1"
        );
        assert_eq!(member_index(&p), Some(1));

        let p = member(42);
        assert_eq!(member_index(&p), Some(42));
    }

    #[test]
    fn test_member_index_rejects_foreign_predicates() {
        let p = NamedNode::new_unchecked("http://example.org/_1");
        assert_eq!(member_index(&p), None);

        // rdf:type is in the namespace but not a membership predicate
        assert_eq!(member_index(&rdf::TYPE.into_owned()), None);

        // rdf:_0 is outside the 1-based container model
        let p = NamedNode::new_unchecked(format!("{}_0", RDF_NS));
        assert_eq!(member_index(&p), None);

        let p = NamedNode::new_unchecked(format!("{}_x", RDF_NS));
        assert_eq!(member_index(&p), None);
    }

    #[test]
    fn test_bound_type_is_stable() {
        assert_eq!(BOUND_TYPE.as_str(), "http://rdfbind.org/ns/1.0/boundType");
    }
}
