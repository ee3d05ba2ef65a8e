//! Domain model, ports and services for the offline todo client.
//!
//! Purpose: keep sync semantics (queue order, batch atomicity, table
//! dispatch) independent of SQLite, HTTP and the command line. Adapters live
//! in `crate::outbound` and `crate::inbound` and only meet the domain through
//! the traits in [`ports`].

mod batch;
mod error;
mod mutation;
pub mod ports;
mod record;
pub mod sync_loop;
mod table_map;
mod todo_service;
pub mod uploader;

pub use self::batch::{BatchError, BatchState, UploadBatch};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::mutation::{
    LISTS_TABLE, LocalWrite, MutationDraft, MutationKind, ParseMutationKindError,
    PendingMutation, RecordPayload, TODOS_TABLE, TodoChanges,
};
pub use self::record::{
    RecordId, RecordValidationError, TEXT_MAX_CHARS, Todo, TodoList, format_timestamp,
    parse_timestamp, validate_text,
};
pub use self::sync_loop::{
    BackoffJitter, BatchJitter, SyncLoop, SyncLoopConfig, SyncLoopRuntime, SyncSleeper,
    SyncStatus, SyncStep, SyncTrigger, TokioSleeper,
};
pub use self::table_map::{
    LISTS_RESOURCE, MappingError, ParseUnmappedTablePolicyError, RemoteOperation,
    RemoteResource, TODOS_RESOURCE, TableMap, UnmappedTablePolicy,
};
pub use self::todo_service::TodoService;
pub use self::uploader::{
    ApplyFailure, ApplyFailureReason, ApplyReport, DrainReport, MAX_BATCH_SIZE, UploadError,
    UploadOutcome, WriteQueueUploader, WriteQueueUploaderConfig, WriteQueueUploaderPorts,
};
