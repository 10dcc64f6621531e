//! Errors reported by a share client.

use crate::status::Status;

/// Failure of a single protocol call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// The server answered with a non-success status.
    #[error("{0}")]
    Status(Status),

    /// The session ran out of request credits. Only a new session clears it.
    #[error("not enough credits")]
    InsufficientCredits,

    #[error("transport error: {0}")]
    Transport(String),
}

impl ShareError {
    /// Returns the server status, if this error carries one.
    pub fn status(&self) -> Option<Status> {
        match self {
            ShareError::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// `true` when the target object already exists.
    pub fn is_collision(&self) -> bool {
        self.status() == Some(Status::ObjectNameCollision)
    }

    /// `true` when the whole session is out of capacity.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, ShareError::InsufficientCredits)
    }
}

impl From<Status> for ShareError {
    fn from(status: Status) -> Self {
        ShareError::Status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_is_detected_only_for_collision_status() {
        assert!(ShareError::Status(Status::ObjectNameCollision).is_collision());
        assert!(!ShareError::Status(Status::AccessDenied).is_collision());
        assert!(!ShareError::InsufficientCredits.is_collision());
    }

    #[test]
    fn resource_exhaustion_is_distinguished() {
        assert!(ShareError::InsufficientCredits.is_resource_exhausted());
        assert!(!ShareError::Transport("reset".into()).is_resource_exhausted());
        assert_eq!(ShareError::InsufficientCredits.status(), None);
    }
}
