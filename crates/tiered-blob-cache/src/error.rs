//! Error types for the tiered blob cache
//!
//! Byte-level cache operations never surface I/O failures; those are logged
//! and degrade to a miss. Only codec adapters and instance construction
//! return errors to the caller.

use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    Io(Box<std::io::Error>),
    Json(String),
    Image(Box<image::ImageError>),
    Runtime(String),
    Config(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Json(msg) => write!(f, "JSON codec error: {}", msg),
            CacheError::Image(err) => write!(f, "Image codec error: {}", err),
            CacheError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err.as_ref()),
            CacheError::Image(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Json(err.to_string())
    }
}

impl From<image::ImageError> for CacheError {
    fn from(err: image::ImageError) -> Self {
        CacheError::Image(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
