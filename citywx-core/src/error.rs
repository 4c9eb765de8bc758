/// Every way a weather, geocoding or icon request can fail.
///
/// The variants are kept cheap to clone so an outcome can be handed to the
/// observable state and to logs without re-creating it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server returned an empty response")]
    EmptyBody,

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("city name is empty")]
    EmptyInput,

    #[error("no place found near {latitude}, {longitude}")]
    NoResult { latitude: f64, longitude: f64 },

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("coordinates out of range: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

/// Result of a single request, produced once and never mutated afterwards.
pub type FetchOutcome<T> = Result<T, FetchError>;

/// Prefix of every message surfaced to the error slot.
pub const ERROR_PREFIX: &str = "Error fetching weather:";

impl FetchError {
    /// Human-readable form published to observers.
    pub fn user_message(&self) -> String {
        format!("{ERROR_PREFIX} {self}")
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl From<image::ImageError> for FetchError {
    fn from(err: image::ImageError) -> Self {
        FetchError::Decode(err.to_string())
    }
}
