//! Error Types
//!
//! This module defines the error type shared by every pipeline stage.
//!
//! # Overview
//!
//! [`VisionError`] covers all failure modes of a model load:
//! - Required resources that are absent or fail to fetch
//! - Transport failures (file system, HTTP)
//! - Model import failures reported by the rendering backend
//! - Effect initialization and disposal failures
//! - Configuration parsing and validation errors
//!
//! Each error maps onto one [`ErrorClass`], which decides how the
//! orchestrator reacts: only [`ErrorClass::FatalRequired`] aborts a run.
//!
//! ```rust,ignore
//! use valevision::errors::{ErrorClass, Result};
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::effects::EffectKind;

/// Failure taxonomy used by the orchestrator and surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A required resource is missing or failed to fetch/import. Aborts the run.
    FatalRequired,
    /// An optional resource is missing or failed. Logged, never fatal.
    RecoverableOptional,
    /// An effect could not be initialized. The effect is disabled.
    EffectInit,
    /// Cleanup failed. Logged and swallowed.
    Disposal,
    /// The run was abandoned through its cancellation token.
    Cancelled,
}

/// The main error type for the loading pipeline.
#[derive(Error, Debug)]
pub enum VisionError {
    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The required primary resource does not exist on the transport.
    #[error("Required resource not found: {uri}")]
    RequiredResourceMissing {
        /// URI of the missing resource
        uri: String,
    },

    /// A required resource exists but could not be fetched.
    #[error("Failed to fetch required resource {uri}: {source}")]
    RequiredFetchFailed {
        /// URI of the failed resource
        uri: String,
        /// Underlying transport failure
        #[source]
        source: Box<VisionError>,
    },

    /// An optional resource could not be fetched or imported.
    #[error("Optional resource unavailable: {uri} ({reason})")]
    OptionalResourceUnavailable {
        /// URI of the optional resource
        uri: String,
        /// Short description of the failure
        reason: String,
    },

    /// The descriptor set handed to the pipeline has no primary mesh.
    #[error("Descriptor set has no primary mesh")]
    NoPrimaryMesh,

    /// The resource was not found on the transport.
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[cfg(feature = "http")]
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status} for {uri}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Requested URI
        uri: String,
    },

    /// The transport scheme is not compiled in.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(String),

    // ========================================================================
    // Import Errors
    // ========================================================================
    /// The backend rejected a model payload.
    #[error("Failed to import {label}: {reason}")]
    Import {
        /// Label of the payload being imported
        label: String,
        /// Backend-provided reason
        reason: String,
    },

    /// More optional overlay meshes failed than the configured budget allows.
    #[error("{failed} overlay meshes failed to import (budget {budget})")]
    OverlayBudgetExceeded {
        /// Number of overlay failures
        failed: usize,
        /// Configured failure budget
        budget: usize,
    },

    /// A backend object handle did not resolve.
    #[error("Unknown backend object: {0}")]
    UnknownObject(String),

    // ========================================================================
    // Effect Errors
    // ========================================================================
    /// An effect failed to initialize.
    #[error("Effect {kind:?} failed to initialize: {reason}")]
    EffectInit {
        /// The effect that failed
        kind: EffectKind,
        /// Backend-provided reason
        reason: String,
    },

    /// An effect state transition is not allowed.
    #[error("Invalid effect transition for {kind:?}: {from} -> {to}")]
    InvalidEffectTransition {
        /// The effect being transitioned
        kind: EffectKind,
        /// Current phase
        from: &'static str,
        /// Requested phase
        to: &'static str,
    },

    /// Cleanup of a backend object failed.
    #[error("Disposal failed: {0}")]
    Disposal(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error (embedded data URIs).
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ========================================================================
    // Control Flow
    // ========================================================================
    /// The run was cancelled.
    #[error("Load cancelled")]
    Cancelled,
}

impl VisionError {
    /// Classifies the error according to the pipeline's failure taxonomy.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::OptionalResourceUnavailable { .. } => ErrorClass::RecoverableOptional,
            Self::EffectInit { .. } | Self::InvalidEffectTransition { .. } => {
                ErrorClass::EffectInit
            }
            Self::Disposal(_) => ErrorClass::Disposal,
            Self::Cancelled => ErrorClass::Cancelled,
            _ => ErrorClass::FatalRequired,
        }
    }

    /// Returns the URI of the resource responsible for a fatal error, if any.
    #[must_use]
    pub fn failed_resource(&self) -> Option<&str> {
        match self {
            Self::RequiredResourceMissing { uri }
            | Self::RequiredFetchFailed { uri, .. }
            | Self::OptionalResourceUnavailable { uri, .. }
            | Self::HttpStatus { uri, .. } => Some(uri),
            Self::Import { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Whether the error only means "this resource does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::HttpStatus { status, .. } => *status == 404,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Alias for `Result<T, VisionError>`.
pub type Result<T> = std::result::Result<T, VisionError>;
