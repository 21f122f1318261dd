pub mod domain;
pub mod ordering;
pub mod ports;
pub mod services;

pub use domain::{
    Booking, Collection, DeleteOutcome, Document, DocumentId, InsertOutcome, IssuedToken,
    NewBooking, NewTask, NewTutorial, ReviewTally, SessionIdentity, Task, TaskEdit, Tutorial,
    UpdateOutcome, UpsertOutcome, UserRecord,
};
pub use ordering::{ReorderReport, ReorderStatus};
pub use ports::{
    DocumentStore, DocumentStream, Filter, PortError, PortResult, SessionTokenService, Sort,
    SortDirection, Update,
};
pub use services::{IdentityRegistry, TaskBoard, TutoringDesk};
