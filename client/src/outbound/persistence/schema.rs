//! Diesel table definitions for the SQLite cache.
//!
//! These definitions must match `migrations/` exactly. Timestamps are stored
//! as RFC 3339 text and `completed` as a 0/1 integer.

diesel::table! {
    /// Todo lists.
    lists (id) {
        /// Primary key, shared with the remote store.
        id -> Text,
        /// Display name.
        name -> Text,
        /// Creation timestamp.
        created_at -> Text,
        /// Last modification timestamp.
        updated_at -> Text,
    }
}

diesel::table! {
    /// Todo items. Deleting a list cascades to its todos.
    todos (id) {
        /// Primary key, shared with the remote store.
        id -> Text,
        /// Owning list.
        list_id -> Text,
        /// Description text.
        description -> Text,
        /// Completion flag, 0 or 1.
        completed -> Integer,
        /// Creation timestamp.
        created_at -> Text,
        /// Last modification timestamp.
        updated_at -> Text,
    }
}

diesel::table! {
    /// Local writes waiting for remote confirmation, oldest first.
    pending_mutations (op_id) {
        /// Strictly increasing queue position.
        op_id -> BigInt,
        /// `put`, `patch` or `delete`.
        kind -> Text,
        /// Local table the write targets.
        table_name -> Text,
        /// Target record id.
        record_id -> Text,
        /// JSON object of column values; null for deletes.
        payload -> Nullable<Text>,
        /// When the write was queued.
        queued_at -> Text,
    }
}

diesel::joinable!(todos -> lists (list_id));

diesel::allow_tables_to_appear_in_same_query!(lists, todos, pending_mutations);
