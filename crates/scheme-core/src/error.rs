//! Error types shared across the board crates.
//!
//! Structural problems (a line whose card was deleted, a move on a missing
//! card) are never errors: the engine cascades or ignores them. Only input
//! validation, file loading, history encoding and the verification service
//! surface typed errors.

use thiserror::Error;

/// Why a project file could not be loaded. The board is untouched.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("file is an HTML export, not a project file")]
    HtmlExport,
    #[error("project file has no `cards`/`lines` arrays")]
    BadStructure,
    #[error("project file is not valid JSON: {0}")]
    Malformed(String),
}

/// Failure encoding or decoding a history snapshot.
#[derive(Debug, Error)]
pub enum SnapshotCodecError {
    #[error("snapshot encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Rejected user input. Nothing changes when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("username is empty")]
    EmptyUsername,
    #[error("code is empty")]
    EmptyCode,
    #[error("invalid print size `{0}`, expected e.g. 150x120")]
    PrintSize(String),
    #[error("invalid color `{0}`")]
    Color(String),
    #[error("no card `{0}`")]
    UnknownCard(String),
    #[error("no line `{0}`")]
    UnknownLine(String),
}
