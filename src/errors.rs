/// All error types that can occur when talking to a Hue bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize a request body to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A UDP socket operation failed during discovery.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// The HTTP transport failed to reach the bridge or read its reply.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A resource request was issued before the session had an API key and bridge.
    #[error("not authenticated to bridge, cannot request {path}")]
    NotAuthenticated { path: String },

    /// User creation was requested before any bridge was accepted.
    #[error("no bridge has been found yet")]
    NoBridge,

    /// The discovery socket could not be bound on any of the attempted ports.
    #[error("failed to bind discovery socket after {attempts} attempts: {err:?}")]
    DiscoveryBind { attempts: u32, err: std::io::Error },

    /// Failed to parse a [`crate::Color`] from a string.
    #[error("invalid color string: {0}")]
    InvalidColorString(String),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new not authenticated error
    pub fn not_authenticated(path: &str) -> Self {
        Error::NotAuthenticated {
            path: path.to_string(),
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
