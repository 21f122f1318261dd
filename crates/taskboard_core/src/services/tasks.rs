//! crates/taskboard_core/src/services/tasks.rs
//!
//! The task board: create, list, edit, move, reorder and delete tasks while
//! keeping the `order` field a usable total order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{collect_documents, required, to_document};
use crate::domain::{
    Collection, DeleteOutcome, Document, DocumentId, InsertOutcome, NewTask, Task, TaskEdit,
    UpdateOutcome, DEFAULT_CATEGORY,
};
use crate::ordering::{plan_reorder, CreationClock, ReorderReport};
use crate::ports::{DocumentStore, Filter, PortError, PortResult, Sort, Update};

const ORDER_FIELD: &str = "order";
const CATEGORY_FIELD: &str = "category";

/// A task as written on creation, before the store has assigned its `_id`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskDraft<'a> {
    title: &'a str,
    description: &'a str,
    category: &'a str,
    created_at: DateTime<Utc>,
    order: i64,
}

#[derive(Clone)]
pub struct TaskBoard {
    store: Arc<dyn DocumentStore>,
    clock: Arc<CreationClock>,
}

impl TaskBoard {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(CreationClock::new()),
        }
    }

    /// All tasks, ascending by `order`.
    pub async fn list(&self) -> PortResult<Vec<Task>> {
        let stream = self
            .store
            .find(Collection::Tasks, &Filter::all(), Some(Sort::ascending(ORDER_FIELD)))
            .await?;
        collect_documents(stream).await
    }

    /// Creates a task positioned after every task created before it.
    pub async fn create(&self, new_task: NewTask) -> PortResult<InsertOutcome> {
        let title = required("title", &new_task.title)?;
        let category = match new_task.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category,
            _ => DEFAULT_CATEGORY,
        };
        let draft = TaskDraft {
            title: &title,
            description: new_task.description.as_deref().unwrap_or_default(),
            category,
            created_at: Utc::now(),
            order: self.clock.next(),
        };

        let outcome = self
            .store
            .insert_one(Collection::Tasks, to_document(&draft)?)
            .await?;
        debug!(task_id = %outcome.inserted_id, order = draft.order, "Task created");
        Ok(outcome)
    }

    /// Overwrites the supplied mutable fields. `order` is never touched here.
    pub async fn edit(&self, id: DocumentId, edit: TaskEdit) -> PortResult<UpdateOutcome> {
        if edit.is_empty() {
            return Err(PortError::InvalidPayload(
                "at least one of `title`, `description` or `category` is required".to_string(),
            ));
        }

        let mut fields = Document::new();
        if let Some(title) = &edit.title {
            fields.insert("title".into(), required("title", title)?.into());
        }
        if let Some(description) = edit.description {
            fields.insert("description".into(), description.into());
        }
        if let Some(category) = &edit.category {
            fields.insert(CATEGORY_FIELD.into(), required("category", category)?.into());
        }

        self.update_task(id, Update::Set(fields)).await
    }

    /// Moves one task into another category without changing its position.
    pub async fn move_to(&self, id: DocumentId, category: &str) -> PortResult<UpdateOutcome> {
        let category = required("category", category)?;
        self.update_task(id, Update::set(CATEGORY_FIELD, category))
            .await
    }

    /// Moves every task of one category into another.
    pub async fn move_category(&self, from: &str, to: &str) -> PortResult<UpdateOutcome> {
        let from = required("from", from)?;
        let to = required("category", to)?;
        self.store
            .update_many(
                Collection::Tasks,
                &Filter::all().eq(CATEGORY_FIELD, from),
                &Update::set(CATEGORY_FIELD, to),
            )
            .await
    }

    /// Persists a client-side arrangement of the whole board.
    ///
    /// The submission is validated against the stored tasks first; after that
    /// each task's new position is written on its own, so a failure part way
    /// through leaves the earlier writes in place. The report says which
    /// writes landed.
    pub async fn reorder(&self, submitted: &[DocumentId]) -> PortResult<ReorderReport> {
        let current: Vec<DocumentId> = self.list().await?.into_iter().map(|task| task.id).collect();
        let plan = plan_reorder(&current, submitted)?;

        let mut report = ReorderReport::default();
        for (id, order) in plan {
            let outcome = self
                .store
                .update_one(
                    Collection::Tasks,
                    &Filter::by_id(id),
                    &Update::set(ORDER_FIELD, order),
                    false,
                )
                .await;
            if let Err(e) = &outcome {
                warn!(task_id = %id, error = %e, "Failed to write task position");
            }
            report.record(id, order, outcome);
        }
        Ok(report)
    }

    /// Deletes a task. Remaining positions are left as they are.
    pub async fn delete(&self, id: DocumentId) -> PortResult<DeleteOutcome> {
        let outcome = self
            .store
            .delete_one(Collection::Tasks, &Filter::by_id(id))
            .await?;
        if outcome.deleted_count == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", id)));
        }
        Ok(outcome)
    }

    async fn update_task(&self, id: DocumentId, update: Update) -> PortResult<UpdateOutcome> {
        let outcome = self
            .store
            .update_one(Collection::Tasks, &Filter::by_id(id), &update, false)
            .await?;
        if outcome.matched_count == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", id)));
        }
        Ok(outcome)
    }
}
