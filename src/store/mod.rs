//! Triple store abstraction
//!
//! The binding engines talk to storage through the [`TripleStore`] trait:
//! pattern-matched statement reads, idempotent writes, wildcard removal and
//! flat (non-nested) transactions. [`MemoryStore`] is the bundled
//! implementation; any backend exposing the same contract plugs in.

mod memory;

pub use memory::{MemoryCursor, MemoryStore};

use crate::model::{Resource, Statement, Term};
use crate::vocab;
use oxrdf::NamedNode;
use thiserror::Error;

/// Triple store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transaction state violation (begin while active, commit/rollback
    /// without one)
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Backend failure reported by the store implementation
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Statement-level storage contract used by the binding engines.
///
/// Implementations take `&self` and synchronize internally. Writes use set
/// semantics: adding a statement twice leaves a single copy. Transactions
/// are flat; [`begin`](TripleStore::begin) while one is active is an error,
/// as is committing or rolling back without one.
pub trait TripleStore: Send + Sync {
    /// Cursor over matching statements. Cursors own the statements they
    /// yield, so the store stays free for reads and writes while a cursor
    /// is being drained.
    type Cursor: Iterator<Item = StoreResult<Statement>>;

    /// Match statements against a pattern; `None` positions are wildcards
    fn statements(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> StoreResult<Self::Cursor>;

    /// Add a statement (no-op if already present)
    fn add(&self, statement: Statement) -> StoreResult<()>;

    /// Remove all statements matching the pattern, returning how many went
    fn remove(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> StoreResult<usize>;

    /// Start a transaction
    fn begin(&self) -> StoreResult<()>;

    /// Commit the active transaction
    fn commit(&self) -> StoreResult<()>;

    /// Discard the active transaction's changes
    fn rollback(&self) -> StoreResult<()>;

    /// Whether any statement matches the pattern
    fn contains(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> StoreResult<bool> {
        Ok(self.statements(subject, predicate, object)?.next().transpose()?.is_some())
    }

    /// Number of statements in the store
    fn len(&self) -> StoreResult<usize> {
        let mut count = 0;
        for statement in self.statements(None, None, None)? {
            statement?;
            count += 1;
        }
        Ok(count)
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Find `(?s, predicate, object)` links that run through a container:
    /// statements where `?s` points via `predicate` at a container node
    /// holding `object` as a member. Yielded statements carry `object`
    /// directly, with the container node elided.
    fn container_backlinks(
        &self,
        predicate: &NamedNode,
        object: &Resource,
    ) -> StoreResult<Vec<Statement>> {
        let member_term = Term::Resource(object.clone());
        let mut containers: Vec<Resource> = Vec::new();
        for statement in self.statements(None, None, Some(&member_term))? {
            let statement = statement?;
            if vocab::member_index(&statement.predicate).is_some()
                && !containers.contains(&statement.subject)
            {
                containers.push(statement.subject);
            }
        }

        let mut links = Vec::new();
        for container in containers {
            let container_term = Term::Resource(container);
            for statement in self.statements(None, Some(predicate), Some(&container_term))? {
                let statement = statement?;
                links.push(Statement::new(
                    statement.subject,
                    predicate.clone(),
                    member_term.clone(),
                ));
            }
        }
        Ok(links)
    }
}
