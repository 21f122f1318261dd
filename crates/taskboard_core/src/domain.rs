//! crates/taskboard_core/src/domain.rs
//!
//! Defines the core data structures for the application: document identifiers,
//! collection names, the typed documents held in each collection, and the
//! result shapes reported back by the document store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

/// A raw document as the store holds it: a JSON object carrying its `_id`.
pub type Document = Map<String, Value>;

/// The identifier field carried by every stored document.
pub const ID_FIELD: &str = "_id";

/// The category a task lands in when the client does not name one.
pub const DEFAULT_CATEGORY: &str = "To-Do";

//=========================================================================================
// Identifiers and Collections
//=========================================================================================

/// The store-generated identifier of a document.
///
/// Clients only ever see it as an opaque string; [`DocumentId::parse`] is the one
/// place that turns such a string back into an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a fresh identifier. Only store adapters should call this.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier supplied by a client.
    pub fn parse(raw: &str) -> Result<Self, PortError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| PortError::InvalidIdentifier(raw.to_string()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for DocumentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for DocumentId {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.to_string())
    }
}

/// The named collections owned by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Tasks,
    Tutorials,
    Bookings,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Tasks,
        Collection::Tutorials,
        Collection::Bookings,
    ];

    /// The collection name as stored.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Tasks => "tasks",
            Collection::Tutorials => "tutorials",
            Collection::Bookings => "booked-tutor",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// A user, keyed by the email of the identity that first signed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub email: String,
    /// Everything else the client sent on first sight of this identity.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// The outcome of an identity upsert: the record that already existed, or the
/// one that was just inserted.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Existing(UserRecord),
    Created(UserRecord),
}

impl UpsertOutcome {
    pub fn was_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }

    pub fn into_record(self) -> UserRecord {
        match self {
            UpsertOutcome::Existing(record) | UpsertOutcome::Created(record) => record,
        }
    }
}

//=========================================================================================
// Tasks
//=========================================================================================

/// A single task on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub order: i64,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// The fields a client supplies when creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// A partial edit of a task's mutable fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.category.is_none()
    }
}

//=========================================================================================
// Tutoring
//=========================================================================================

/// A tutoring listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub owner_email: String,
    pub category: String,
    #[serde(default)]
    pub review_count: u64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// The fields a tutor supplies when publishing a listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTutorial {
    pub owner_email: String,
    pub category: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// The review counter of a listing, as it stands after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTally {
    #[serde(rename = "_id")]
    pub tutorial_id: DocumentId,
    pub review_count: u64,
}

/// A booking of a tutorial. Bookings are never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub user_email: String,
    pub tutorial_ref: DocumentId,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// The fields a student supplies when booking. `tutorial_ref` is still the raw
/// client string here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user_email: String,
    pub tutorial_ref: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

//=========================================================================================
// Sessions
//=========================================================================================

/// The identity payload carried inside a session token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIdentity(Map<String, Value>);

impl SessionIdentity {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_claims(self) -> Map<String, Value> {
        self.0
    }
}

/// A freshly signed session token and its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub ttl: Duration,
}

//=========================================================================================
// Store Outcomes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

impl InsertOutcome {
    pub fn new(inserted_id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<DocumentId>,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
        }
    }

    pub fn upserted(id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("not-an-id")]
    #[case("")]
    #[case("1234")]
    fn parse_rejects_malformed_identifiers(#[case] raw: &str) {
        assert!(matches!(
            DocumentId::parse(raw),
            Err(PortError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn parse_accepts_what_display_produces() {
        let id = DocumentId::generate();
        assert_eq!(DocumentId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(format!(" {} ", id).parse::<DocumentId>().unwrap(), id);
    }

    #[test]
    fn task_defaults_description_and_category() {
        let id = DocumentId::generate();
        let task: Task = serde_json::from_value(json!({
            "_id": id.to_string(),
            "title": "Write report",
            "createdAt": "2024-05-01T10:00:00Z",
            "order": 1714557600000i64,
        }))
        .unwrap();

        assert_eq!(task.id, id);
        assert_eq!(task.description, "");
        assert_eq!(task.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn user_record_keeps_unknown_fields_in_profile() {
        let id = DocumentId::generate();
        let user: UserRecord = serde_json::from_value(json!({
            "_id": id.to_string(),
            "email": "ada@example.com",
            "name": "Ada",
            "photo": "https://example.com/ada.png",
        }))
        .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.profile.len(), 2);
        assert_eq!(user.profile["name"], "Ada");

        let round = serde_json::to_value(&user).unwrap();
        assert_eq!(round["_id"], id.to_string());
        assert_eq!(round["name"], "Ada");
    }

    #[test]
    fn collection_names_match_the_store() {
        let names: Vec<_> = Collection::ALL.iter().map(Collection::name).collect();
        assert_eq!(names, ["users", "tasks", "tutorials", "booked-tutor"]);
    }

    #[test]
    fn outcomes_serialize_in_camel_case() {
        let id = DocumentId::generate();
        let value = serde_json::to_value(UpdateOutcome::upserted(id)).unwrap();
        assert_eq!(
            value,
            json!({
                "acknowledged": true,
                "matchedCount": 0,
                "modifiedCount": 0,
                "upsertedId": id.to_string(),
            })
        );
        let value = serde_json::to_value(DeleteOutcome::new(1)).unwrap();
        assert_eq!(value["deletedCount"], 1);
    }

    #[test]
    fn session_identity_exposes_email() {
        let mut claims = Map::new();
        claims.insert("email".into(), json!("ada@example.com"));
        let identity = SessionIdentity::new(claims);
        assert_eq!(identity.email(), Some("ada@example.com"));
        assert_eq!(SessionIdentity::default().email(), None);
    }
}
