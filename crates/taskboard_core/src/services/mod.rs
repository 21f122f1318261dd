//! crates/taskboard_core/src/services/mod.rs
//!
//! Application services. Each one is constructed around the injected
//! [`DocumentStore`](crate::ports::DocumentStore) and holds no state of its own
//! between requests.

pub mod identity;
pub mod tasks;
pub mod tutoring;

pub use identity::IdentityRegistry;
pub use tasks::TaskBoard;
pub use tutoring::TutoringDesk;

use futures::TryStreamExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::domain::Document;
use crate::ports::{DocumentStream, PortError, PortResult};

fn to_document<T: Serialize>(value: &T) -> PortResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(PortError::Unexpected(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(PortError::Unexpected(e.to_string())),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> PortResult<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| PortError::Unexpected(format!("stored document is malformed: {}", e)))
}

async fn collect_documents<T: DeserializeOwned>(stream: DocumentStream) -> PortResult<Vec<T>> {
    let documents: Vec<Document> = stream.try_collect().await?;
    documents.into_iter().map(from_document).collect()
}

/// Trims a required text field and rejects it when blank.
fn required(field: &str, value: &str) -> PortResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortError::InvalidPayload(format!("`{}` must not be empty", field)));
    }
    Ok(trimmed.to_string())
}
