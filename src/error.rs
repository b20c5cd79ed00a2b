//! # Error Handling
//!
//! This module defines the centralized error type for `vmtmpl`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! mode of locator resolution, fetching, decoding and composition.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants that concern a specific template
//!   carry the offending locator so callers can report it without extra
//!   bookkeeping.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Not every variant is fatal. `UnknownFields` is produced by the strict
//! decode pass and is only ever surfaced as a warning; the size ceiling on
//! fetched content is not an error at all (content is silently truncated).

use thiserror::Error;

/// Main error type for vmtmpl operations
#[derive(Error, Debug)]
pub enum Error {
    /// The locator uses an unrecognized scheme, or a `file://` URL whose
    /// path is not absolute.
    #[error("Invalid locator {locator:?}: {message}")]
    InvalidLocator { locator: String, message: String },

    /// A relative locator was resolved against a template read from STDIN.
    #[error("Can't use relative path {locator:?} when reading template from STDIN")]
    NoRelativeFromStdin { locator: String },

    /// A relative locator tried to escape its base with a `../` segment.
    #[error("Relative locator path {locator:?} must not contain '../' segments")]
    ContainmentViolation { locator: String },

    /// Opening, reading, or downloading a locator failed.
    #[error("Failed to fetch {locator:?}: {message}")]
    Fetch { locator: String, message: String },

    /// A template filename does not yield a valid instance name.
    #[error("Filename {filename:?} is invalid: {message}")]
    InvalidName { filename: String, message: String },

    /// A `digest` value could not be parsed or uses an unsupported algorithm.
    #[error("Invalid digest {digest:?}: {message}")]
    InvalidDigest { digest: String, message: String },

    /// The lenient structural decode failed.
    #[error("Failed to unmarshal YAML ({locator}): {message}")]
    Unmarshal { locator: String, message: String },

    /// The independent syntax check rejected the document.
    #[error("Failed to unmarshal YAML ({locator}): {message}")]
    Syntax { locator: String, message: String },

    /// The strict decode found fields outside the known schema.
    ///
    /// This is a warning value; the decoder never returns it as a failure.
    #[error("Non-strict YAML detected in {locator}; unknown fields: {}", fields.join(", "))]
    UnknownFields { locator: String, fields: Vec<String> },

    /// A base template chain references itself.
    #[error("Cyclic base template reference: {cycle}")]
    CyclicReference { cycle: String },

    /// Fetched content does not match its declared digest.
    #[error("Digest mismatch for {locator:?}: expected {expected}, got {actual}")]
    Integrity {
        locator: String,
        expected: String,
        actual: String,
    },

    /// The fetch was aborted through its cancellation token.
    #[error("Fetching {locator:?} was cancelled")]
    Cancelled { locator: String },

    /// A composed configuration failed validation.
    #[error("Failed to validate {locator:?}: {message}")]
    Validation { locator: String, message: String },

    /// Rendering a configuration back to YAML failed.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` for errors that abort processing of a locator.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnknownFields { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
