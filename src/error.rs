use ulid::Ulid;

/// Crate-wide error taxonomy. Every variant maps to a stable machine-readable
/// kind and status code on the HTTP boundary.
#[derive(Debug)]
pub enum CoreError {
    /// Malformed, missing, or contradictory input.
    Validation(&'static str),
    /// The requested interval overlaps an existing appointment.
    SlotUnavailable(Ulid),
    /// Presented password does not match the stored credential.
    InvalidCredentials,
    /// Missing or expired session on a gated operation.
    Unauthorized,
    /// No appointment with this id.
    NotFound(Ulid),
    /// Durable-medium failure. Surfaced, never swallowed.
    Storage(String),
}

impl CoreError {
    /// Stable machine-readable kind, as emitted in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "ValidationError",
            CoreError::SlotUnavailable(_) => "SlotUnavailable",
            CoreError::InvalidCredentials => "InvalidCredentials",
            CoreError::Unauthorized => "Unauthorized",
            CoreError::NotFound(_) => "NotFound",
            CoreError::Storage(_) => "StorageError",
        }
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Validation(msg) => write!(f, "{msg}"),
            CoreError::SlotUnavailable(id) => {
                write!(f, "slot conflicts with appointment {id}")
            }
            CoreError::InvalidCredentials => write!(f, "incorrect password"),
            CoreError::Unauthorized => write!(f, "unauthorized"),
            CoreError::NotFound(id) => write!(f, "appointment not found: {id}"),
            CoreError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for CoreError {}
