use thiserror::Error;

/// Why a load task ended without producing a resource
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request for {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("unsupported URL scheme in {0}")]
    UnsupportedScheme(String),

    #[error("could not decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("load worker unavailable: {0}")]
    Worker(String),
}

/// Rejected resize parameters
#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    #[error("invalid viewport dimensions {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },

    #[error("invalid device pixel ratio {0}")]
    InvalidPixelRatio(f32),
}
