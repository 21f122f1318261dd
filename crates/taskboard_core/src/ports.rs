//! crates/taskboard_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store and token signer.

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::cmp::Ordering;
use std::pin::Pin;

use crate::domain::{
    Collection, DeleteOutcome, Document, DocumentId, InsertOutcome, IssuedToken, SessionIdentity,
    UpdateOutcome, ID_FIELD,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, signer).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid reorder payload: {0}")]
    InvalidReorderPayload(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A lazily produced sequence of documents.
pub type DocumentStream = Pin<Box<dyn Stream<Item = PortResult<Document>> + Send>>;

//=========================================================================================
// Queries and Updates
//=========================================================================================

/// A conjunction of field-equality conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: DocumentId) -> Self {
        Self::all().eq(ID_FIELD, id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// The filter as a JSON object, suitable for containment queries.
    pub fn to_json(&self) -> Value {
        Value::Object(self.conditions.iter().cloned().collect())
    }
}

/// A single-document mutation. Adapters must apply it atomically per document.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrites the given fields, leaving every other field untouched.
    Set(Document),
    /// Adds `by` to an integer field, treating a missing field as zero.
    Increment { field: String, by: i64 },
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Document::new();
        fields.insert(field.into(), value.into());
        Update::Set(fields)
    }

    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        Update::Increment {
            field: field.into(),
            by,
        }
    }

    /// Applies the update in place and reports whether the document changed.
    /// The `_id` field is never written.
    pub fn apply(&self, document: &mut Document) -> bool {
        match self {
            Update::Set(fields) => {
                let mut changed = false;
                for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != ID_FIELD) {
                    if document.get(key) != Some(value) {
                        document.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
                changed
            }
            Update::Increment { field, by } => {
                let current = document.get(field).and_then(Value::as_i64).unwrap_or(0);
                document.insert(field.clone(), Value::from(current + by));
                *by != 0
            }
        }
    }

    /// Builds the document an upsert inserts when the filter matched nothing:
    /// the filter's equality fields with the update applied on top.
    pub fn seed(&self, filter: &Filter) -> Document {
        let mut document: Document = filter
            .conditions()
            .iter()
            .filter(|(field, _)| field.as_str() != ID_FIELD)
            .cloned()
            .collect();
        self.apply(&mut document);
        document
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Orders a `find` by one field. Ties keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Compares two documents on the sort field. Missing fields sort first,
    /// numbers compare numerically and strings lexically.
    pub fn compare(&self, left: &Document, right: &Document) -> Ordering {
        let ordering = compare_values(left.get(&self.field), right.get(&self.field));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The document store gateway. Every operation is scoped to one collection and
/// atomic only at the single-document level; there are no cross-document
/// transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and assigns it a fresh `_id`.
    async fn insert_one(&self, collection: Collection, document: Document)
        -> PortResult<InsertOutcome>;

    async fn find_one(&self, collection: Collection, filter: &Filter)
        -> PortResult<Option<Document>>;

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<Sort>,
    ) -> PortResult<DocumentStream>;

    /// Updates the first matching document, or inserts [`Update::seed`] when
    /// nothing matched and `upsert` is set.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> PortResult<UpdateOutcome>;

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> PortResult<UpdateOutcome>;

    /// Updates the first matching document and returns it as it is after the update.
    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> PortResult<Option<Document>>;

    async fn delete_one(&self, collection: Collection, filter: &Filter)
        -> PortResult<DeleteOutcome>;
}

/// Issues and verifies the signed session tokens carried in the session cookie.
pub trait SessionTokenService: Send + Sync {
    fn issue(&self, identity: &SessionIdentity) -> PortResult<IssuedToken>;

    /// Fails with [`PortError::Unauthorized`] on malformed, expired or forged tokens.
    fn verify(&self, token: &str) -> PortResult<SessionIdentity>;
}
