//! crates/taskboard_core/src/services/tutoring.rs
//!
//! Tutoring listings and their bookings.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{collect_documents, from_document, required};
use crate::domain::{
    Booking, Collection, DeleteOutcome, Document, DocumentId, InsertOutcome, NewBooking,
    NewTutorial, ReviewTally, Tutorial, UpdateOutcome, ID_FIELD,
};
use crate::ports::{DocumentStore, Filter, PortError, PortResult, Update};

const REVIEW_COUNT_FIELD: &str = "reviewCount";
const OWNER_EMAIL_FIELD: &str = "ownerEmail";
const CATEGORY_FIELD: &str = "category";

#[derive(Clone)]
pub struct TutoringDesk {
    store: Arc<dyn DocumentStore>,
}

impl TutoringDesk {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    //=====================================================================================
    // Listings
    //=====================================================================================

    /// Publishes a listing. Its review count always starts at zero.
    pub async fn publish(&self, listing: NewTutorial) -> PortResult<InsertOutcome> {
        let owner_email = required(OWNER_EMAIL_FIELD, &listing.owner_email)?;
        let category = required(CATEGORY_FIELD, &listing.category)?;

        let mut document = listing.details;
        document.remove(ID_FIELD);
        document.insert(OWNER_EMAIL_FIELD.into(), owner_email.into());
        document.insert(CATEGORY_FIELD.into(), category.into());
        document.insert(REVIEW_COUNT_FIELD.into(), Value::from(0u64));

        self.store.insert_one(Collection::Tutorials, document).await
    }

    pub async fn list(&self, category: Option<&str>) -> PortResult<Vec<Tutorial>> {
        let filter = match category {
            Some(category) => Filter::all().eq(CATEGORY_FIELD, category),
            None => Filter::all(),
        };
        let stream = self
            .store
            .find(Collection::Tutorials, &filter, None)
            .await?;
        collect_documents(stream).await
    }

    pub async fn listings_of(&self, owner_email: &str) -> PortResult<Vec<Tutorial>> {
        let stream = self
            .store
            .find(
                Collection::Tutorials,
                &Filter::all().eq(OWNER_EMAIL_FIELD, owner_email),
                None,
            )
            .await?;
        collect_documents(stream).await
    }

    pub async fn get(&self, id: DocumentId) -> PortResult<Tutorial> {
        self.store
            .find_one(Collection::Tutorials, &Filter::by_id(id))
            .await?
            .map(from_document)
            .transpose()?
            .ok_or_else(|| PortError::NotFound(format!("Tutorial {} not found", id)))
    }

    /// Overwrites the supplied listing fields. The review count only moves
    /// through [`TutoringDesk::record_review`]; `ownerEmail` and `category`
    /// follow the same rules as on [`TutoringDesk::publish`].
    pub async fn revise(&self, id: DocumentId, mut fields: Document) -> PortResult<UpdateOutcome> {
        fields.remove(ID_FIELD);
        fields.remove(REVIEW_COUNT_FIELD);
        if fields.is_empty() {
            return Err(PortError::InvalidPayload(
                "no updatable fields supplied".to_string(),
            ));
        }
        for field in [OWNER_EMAIL_FIELD, CATEGORY_FIELD] {
            if let Some(value) = fields.get_mut(field) {
                let text = value.as_str().ok_or_else(|| {
                    PortError::InvalidPayload(format!("`{}` must be a string", field))
                })?;
                *value = required(field, text)?.into();
            }
        }

        let outcome = self
            .store
            .update_one(
                Collection::Tutorials,
                &Filter::by_id(id),
                &Update::Set(fields),
                false,
            )
            .await?;
        if outcome.matched_count == 0 {
            return Err(PortError::NotFound(format!("Tutorial {} not found", id)));
        }
        Ok(outcome)
    }

    pub async fn withdraw(&self, id: DocumentId) -> PortResult<DeleteOutcome> {
        let outcome = self
            .store
            .delete_one(Collection::Tutorials, &Filter::by_id(id))
            .await?;
        if outcome.deleted_count == 0 {
            return Err(PortError::NotFound(format!("Tutorial {} not found", id)));
        }
        Ok(outcome)
    }

    /// Adds one review to a listing with a single atomic store call.
    pub async fn record_review(&self, id: DocumentId) -> PortResult<ReviewTally> {
        let updated = self
            .store
            .find_one_and_update(
                Collection::Tutorials,
                &Filter::by_id(id),
                &Update::increment(REVIEW_COUNT_FIELD, 1),
            )
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Tutorial {} not found", id)))?;

        let review_count = updated
            .get(REVIEW_COUNT_FIELD)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                PortError::Unexpected(format!("tutorial {} has no usable review count", id))
            })?;
        debug!(tutorial_id = %id, review_count, "Review recorded");
        Ok(ReviewTally {
            tutorial_id: id,
            review_count,
        })
    }

    //=====================================================================================
    // Bookings
    //=====================================================================================

    /// Books a tutorial. The referenced listing must exist at booking time.
    pub async fn book(&self, booking: NewBooking) -> PortResult<InsertOutcome> {
        let user_email = required("userEmail", &booking.user_email)?;
        let tutorial_id = DocumentId::parse(&booking.tutorial_ref)?;
        self.get(tutorial_id).await?;

        let mut document = booking.details;
        document.remove(ID_FIELD);
        document.insert("userEmail".into(), user_email.into());
        document.insert("tutorialRef".into(), tutorial_id.into());

        self.store
            .insert_one(Collection::Bookings, document)
            .await
    }

    pub async fn bookings_of(&self, user_email: &str) -> PortResult<Vec<Booking>> {
        let stream = self
            .store
            .find(
                Collection::Bookings,
                &Filter::all().eq("userEmail", user_email),
                None,
            )
            .await?;
        collect_documents(stream).await
    }
}
