//! Data models for caresync

mod consultation;
mod mutation;
mod sync_result;

pub use consultation::{ConsultationDraft, DEFAULT_SYMPTOMS};
pub use mutation::{ClientId, NewMutation, QueuedMutation};
pub use sync_result::{SyncBatchRequest, SyncBatchResponse, SyncResult, SyncStatus};
