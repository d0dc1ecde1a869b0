//! Error types for the data layer.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A PostgreSQL operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A catalog row holds a kind string no [`DeviceKind`] variant
    /// matches (e.g. written by an older schema).
    ///
    /// [`DeviceKind`]: fleetsim_types::DeviceKind
    #[error("corrupt catalog row for device {device_id}: {source}")]
    CorruptKind {
        /// The device whose row is unreadable.
        device_id: String,
        /// The parse failure.
        source: fleetsim_types::UnknownKindError,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
