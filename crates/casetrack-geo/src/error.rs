use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[cfg(feature = "kakao")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("malformed coordinates for {query:?}: {detail}")]
    Malformed { query: String, detail: String },

    #[error("{0}")]
    Other(String),
}
