use thiserror::Error;

/// Crate-wide error type. Hot paths (raycast, pathfinding) report "not found"
/// through their own result structs instead of going through here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FabricError {
    #[error("buffer overrun: {0}")]
    BufferOverrun(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("connection reset: {0}")]
    ConnectionReset(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FabricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = FabricError::BufferOverrun("requested 4 at offset 2".into());
        assert_eq!(err.to_string(), "buffer overrun: requested 4 at offset 2");
    }
}
