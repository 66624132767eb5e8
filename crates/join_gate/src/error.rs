use thiserror::Error;
use tracing::{error, warn};

/// Failure raised by the backing lobby directory service itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryCallError {
    #[error("call shape not exposed by this host build")]
    NotExposed,
    #[error("directory rejected the call: {0}")]
    Rejected(String),
}

/// Everything that can go wrong while gating joins.
///
/// None of these are fatal. Each one is absorbed where it happens and turned
/// into a log entry via [`JoinGateError::report`]; the level transition the
/// coordinator rides along with always proceeds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinGateError {
    #[error("join policy is not configured: {0}")]
    ConfigurationMissing(String),

    #[error("lobby directory API shape could not be resolved")]
    ApiVariantUnresolved,

    #[error("lobby directory service is not available")]
    DirectoryUnavailable,

    #[error("no active session room")]
    RoomUnavailable,

    #[error("lobby directory call `{call}` failed: {source}")]
    InvocationFailure {
        call: &'static str,
        #[source]
        source: DirectoryCallError,
    },
}

impl JoinGateError {
    pub(crate) fn invocation(call: &'static str, source: DirectoryCallError) -> Self {
        Self::InvocationFailure { call, source }
    }

    /// Log the error at the level its kind deserves.
    pub fn report(&self) {
        match self {
            JoinGateError::ConfigurationMissing(_) | JoinGateError::InvocationFailure { .. } => {
                error!(target = "join_gate", "{self}");
            }
            JoinGateError::ApiVariantUnresolved
            | JoinGateError::DirectoryUnavailable
            | JoinGateError::RoomUnavailable => {
                warn!(target = "join_gate", "{self}");
            }
        }
    }
}
