use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid size '{0}', expected like 400x500")]
    InvalidSize(String),

    #[error("Incompatible flags: {0}")]
    IncompatibleFlags(String),

    #[error("Backend API error: {0}")]
    Api(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("Source object missing or empty: {0}")]
    EmptyObject(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ThumbError>;
