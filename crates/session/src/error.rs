//! Session error types.

use sharecopy_protocol::{ConnectStage, ShareError};

/// Errors produced while establishing or using a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to connect to {address}: {source}")]
    Connect { address: String, source: ShareError },

    #[error("login to domain {domain} failed: {source}")]
    Login { domain: String, source: ShareError },

    #[error("failed to attach share {share}: {source}")]
    TreeConnect { share: String, source: ShareError },

    #[error("session is not connected")]
    NotConnected,
}

impl SessionError {
    /// Stage of the connect sequence that failed, if any.
    pub fn stage(&self) -> Option<ConnectStage> {
        match self {
            SessionError::Connect { .. } => Some(ConnectStage::Connect),
            SessionError::Login { .. } => Some(ConnectStage::Login),
            SessionError::TreeConnect { .. } => Some(ConnectStage::TreeConnect),
            SessionError::NotConnected => None,
        }
    }
}
