use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;
use tuple::TupleError;

/// Errors returned by the JSON emitter.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The tuple failed validation or could not be decoded.
    #[error("tuple error: {0}")]
    Tuple(#[from] TupleError),

    /// The output writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A string payload is not UTF-8, so the text cannot be returned as a
    /// `String`. The byte-oriented entry points pass such bytes through.
    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}
