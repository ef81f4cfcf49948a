// src/error.rs
use std::io;

use thiserror::Error;

use crate::json::JsonError;
use crate::parser::ParseError;

/// Central error type for the server engine.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),
}

pub type ServerResult<T> = Result<T, ServerError>;
