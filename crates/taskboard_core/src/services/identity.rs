//! crates/taskboard_core/src/services/identity.rs
//!
//! First-write-wins registration of users keyed by email.

use std::sync::Arc;
use tracing::{debug, info};

use super::{from_document, required};
use crate::domain::{Collection, Document, UpsertOutcome, UserRecord, ID_FIELD};
use crate::ports::{DocumentStore, Filter, PortError, PortResult};

const IDENTITY_FIELD: &str = "email";

#[derive(Clone)]
pub struct IdentityRegistry {
    store: Arc<dyn DocumentStore>,
}

impl IdentityRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_identity(&self, email: &str) -> PortResult<Option<UserRecord>> {
        self.store
            .find_one(Collection::Users, &Filter::all().eq(IDENTITY_FIELD, email))
            .await?
            .map(from_document)
            .transpose()
    }

    /// Returns the user already registered under `email`, or inserts `profile`
    /// as a new one.
    ///
    /// An existing record is returned as stored; nothing from `profile` is
    /// merged into it. Two concurrent first registrations are settled by the
    /// store's uniqueness constraint on `email`: the loser's insert conflicts
    /// and it returns the winner's record instead.
    pub async fn upsert_by_identity(
        &self,
        email: &str,
        mut profile: Document,
    ) -> PortResult<UpsertOutcome> {
        let email = required(IDENTITY_FIELD, email)?;

        if let Some(existing) = self.find_by_identity(&email).await? {
            debug!(%email, "User already registered");
            return Ok(UpsertOutcome::Existing(existing));
        }

        profile.remove(ID_FIELD);
        profile.insert(IDENTITY_FIELD.into(), email.clone().into());

        match self
            .store
            .insert_one(Collection::Users, profile.clone())
            .await
        {
            Ok(outcome) => {
                info!(%email, user_id = %outcome.inserted_id, "Registered new user");
                profile.insert(ID_FIELD.into(), outcome.inserted_id.into());
                Ok(UpsertOutcome::Created(from_document(profile)?))
            }
            Err(PortError::Conflict(reason)) => {
                debug!(%email, %reason, "Lost registration race, returning existing user");
                self.find_by_identity(&email)
                    .await?
                    .map(UpsertOutcome::Existing)
                    .ok_or(PortError::Conflict(reason))
            }
            Err(e) => Err(e),
        }
    }
}
