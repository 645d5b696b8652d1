//! In-memory triple store
//!
//! Reference [`TripleStore`] backend: an insertion-ordered statement set
//! behind a read-write lock, with copy-on-begin transactions.

use super::{StoreError, StoreResult, TripleStore};
use crate::model::{Resource, Statement, Term};
use indexmap::IndexSet;
use oxrdf::NamedNode;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct Inner {
    /// Statements in first-insertion order; doubles as the set index
    statements: IndexSet<Statement>,
    /// Pre-transaction image, present while a transaction is active
    snapshot: Option<IndexSet<Statement>>,
}

/// In-memory statement store with flat transactions
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn pattern_matches(
    statement: &Statement,
    subject: Option<&Resource>,
    predicate: Option<&NamedNode>,
    object: Option<&Term>,
) -> bool {
    subject.map_or(true, |s| statement.subject == *s)
        && predicate.map_or(true, |p| statement.predicate == *p)
        && object.map_or(true, |o| statement.object == *o)
}

/// Cursor over an owned result snapshot; never blocks the store
pub struct MemoryCursor {
    items: std::vec::IntoIter<Statement>,
}

impl Iterator for MemoryCursor {
    type Item = StoreResult<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(Ok)
    }
}

impl TripleStore for MemoryStore {
    type Cursor = MemoryCursor;

    fn statements(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> StoreResult<Self::Cursor> {
        let inner = self.read();
        let items: Vec<Statement> = inner
            .statements
            .iter()
            .filter(|st| pattern_matches(st, subject, predicate, object))
            .cloned()
            .collect();
        Ok(MemoryCursor {
            items: items.into_iter(),
        })
    }

    fn add(&self, statement: Statement) -> StoreResult<()> {
        self.write().statements.insert(statement);
        Ok(())
    }

    fn remove(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> StoreResult<usize> {
        let mut inner = self.write();
        let before = inner.statements.len();
        inner
            .statements
            .retain(|st| !pattern_matches(st, subject, predicate, object));
        Ok(before - inner.statements.len())
    }

    fn begin(&self) -> StoreResult<()> {
        let mut inner = self.write();
        if inner.snapshot.is_some() {
            return Err(StoreError::Transaction(
                "transaction already active".to_string(),
            ));
        }
        inner.snapshot = Some(inner.statements.clone());
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut inner = self.write();
        if inner.snapshot.take().is_none() {
            return Err(StoreError::Transaction("no transaction active".to_string()));
        }
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut inner = self.write();
        match inner.snapshot.take() {
            Some(snapshot) => {
                inner.statements = snapshot;
                Ok(())
            }
            None => Err(StoreError::Transaction("no transaction active".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab;
    use oxrdf::Literal;

    fn named(uri: &str) -> Resource {
        Resource::Named(NamedNode::new(uri).unwrap())
    }

    fn statement(s: &str, p: &str, o: &str) -> Statement {
        Statement::new(
            NamedNode::new(s).unwrap(),
            NamedNode::new(p).unwrap(),
            Literal::new_simple_literal(o),
        )
    }

    #[test]
    fn test_add_is_idempotent() {
        let store = MemoryStore::new();
        let st = statement("http://example.org/a", "http://example.org/p", "v");
        store.add(st.clone()).unwrap();
        store.add(st).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_pattern_matching() {
        let store = MemoryStore::new();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "1"))
            .unwrap();
        store
            .add(statement("http://example.org/a", "http://example.org/q", "2"))
            .unwrap();
        store
            .add(statement("http://example.org/b", "http://example.org/p", "3"))
            .unwrap();

        let subject = named("http://example.org/a");
        let matched: Vec<_> = store
            .statements(Some(&subject), None, None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(matched.len(), 2);

        let predicate = NamedNode::new("http://example.org/p").unwrap();
        let matched: Vec<_> = store
            .statements(None, Some(&predicate), None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(matched.len(), 2);

        let object = Term::Literal(Literal::new_simple_literal("2"));
        assert!(store.contains(None, None, Some(&object)).unwrap());
        assert!(!store
            .contains(Some(&named("http://example.org/b")), None, Some(&object))
            .unwrap());
    }

    #[test]
    fn test_results_keep_insertion_order() {
        let store = MemoryStore::new();
        for value in ["first", "second", "third"] {
            store
                .add(statement("http://example.org/a", "http://example.org/p", value))
                .unwrap();
        }
        let subject = named("http://example.org/a");
        let values: Vec<String> = store
            .statements(Some(&subject), None, None)
            .unwrap()
            .map(|st| st.unwrap().object.as_literal().unwrap().value().to_string())
            .collect();
        assert_eq!(values, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove_with_wildcards() {
        let store = MemoryStore::new();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "1"))
            .unwrap();
        store
            .add(statement("http://example.org/a", "http://example.org/q", "2"))
            .unwrap();
        store
            .add(statement("http://example.org/b", "http://example.org/p", "3"))
            .unwrap();

        let subject = named("http://example.org/a");
        let removed = store.remove(Some(&subject), None, None).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().unwrap(), 1);

        let removed = store.remove(None, None, None).unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_cursor_does_not_block_writes() {
        let store = MemoryStore::new();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "1"))
            .unwrap();

        let mut cursor = store.statements(None, None, None).unwrap();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "2"))
            .unwrap();

        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_begin_twice_is_an_error() {
        let store = MemoryStore::new();
        store.begin().unwrap();
        assert!(matches!(store.begin(), Err(StoreError::Transaction(_))));
    }

    #[test]
    fn test_commit_without_transaction_is_an_error() {
        let store = MemoryStore::new();
        assert!(matches!(store.commit(), Err(StoreError::Transaction(_))));
        assert!(matches!(store.rollback(), Err(StoreError::Transaction(_))));
    }

    #[test]
    fn test_rollback_restores_previous_state() {
        let store = MemoryStore::new();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "keep"))
            .unwrap();

        store.begin().unwrap();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "drop"))
            .unwrap();
        store.remove(None, None, None).unwrap();
        store.rollback().unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let object = Term::Literal(Literal::new_simple_literal("keep"));
        assert!(store.contains(None, None, Some(&object)).unwrap());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let store = MemoryStore::new();
        store.begin().unwrap();
        store
            .add(statement("http://example.org/a", "http://example.org/p", "v"))
            .unwrap();
        store.commit().unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_container_backlinks() {
        let store = MemoryStore::new();
        let owner = NamedNode::new("http://example.org/owner").unwrap();
        let predicate = NamedNode::new("http://example.org/items").unwrap();
        let member = NamedNode::new("http://example.org/member").unwrap();
        let container = Resource::new_blank();

        store
            .add(Statement::new(owner.clone(), predicate.clone(), container.clone()))
            .unwrap();
        store
            .add(Statement::new(container, vocab::member(1), member.clone()))
            .unwrap();

        let member_resource = Resource::Named(member.clone());
        let links = store.container_backlinks(&predicate, &member_resource).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].subject, Resource::Named(owner));
        assert_eq!(links[0].predicate, predicate);
        assert_eq!(links[0].object, Term::Resource(member_resource));
    }
}
