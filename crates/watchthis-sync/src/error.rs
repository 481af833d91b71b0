use thiserror::Error;

/// Failures of the synchronization layer.  None of them is fatal to the
/// session: callers log, keep prior state and surface an affordance.
///
/// An empty result is not an error; feeds report it as an empty `Vec`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Push channel could not be opened or dropped mid-session.
    #[error("push channel: {0}")]
    Transport(String),

    /// A request/response call did not complete.
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The call completed with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// An inbound push frame that does not match the protocol.
    #[error("malformed push message: {0}")]
    Malformed(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
