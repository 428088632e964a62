//! Unified error types for loading operations.

use std::io;

use thiserror::Error;

use crate::bridge::BridgeError;

/// Step of the backend decode sequence that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeStage {
    /// The backend was asked to decode before it was set up.
    Setup,
    /// Allocating the decode context or its input buffer.
    AllocContext,
    /// Parsing the container from the registered reader.
    ReadContainer,
    /// Looking up the primary image handle.
    PrimaryHandle,
    /// Decoding the primary image to interleaved RGB.
    Decode,
    /// Checking input or image size against [`Limits`](crate::Limits).
    LimitCheck,
}

impl DecodeStage {
    /// Short lowercase label, used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            DecodeStage::Setup => "setup",
            DecodeStage::AllocContext => "alloc-context",
            DecodeStage::ReadContainer => "read-container",
            DecodeStage::PrimaryHandle => "primary-handle",
            DecodeStage::Decode => "decode",
            DecodeStage::LimitCheck => "limit-check",
        }
    }
}

/// Error reported by a [`HeifBackend`](crate::HeifBackend).
///
/// The message is passed through to [`LoadError::Codec`] untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{stage:?}: {message}")]
pub struct BackendError {
    /// Where in the decode sequence the failure happened.
    pub stage: DecodeStage,
    /// Message produced by the external library.
    pub message: String,
}

impl BackendError {
    /// Create a backend error for a decode stage.
    pub fn new(stage: DecodeStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Wrap any library error, keeping only its message.
    pub fn from_library<E>(stage: DecodeStage, error: E) -> Self
    where
        E: core::fmt::Display,
    {
        Self::new(stage, error.to_string())
    }

    /// Wrap a reader bridge failure that happened during `stage`.
    ///
    /// Allocation failures and input limits keep their own stage so they
    /// are not reported as bad data.
    pub fn from_bridge(stage: DecodeStage, error: BridgeError) -> Self {
        let stage = match error {
            BridgeError::Alloc { .. } => DecodeStage::AllocContext,
            BridgeError::InputTooLarge { .. } => DecodeStage::LimitCheck,
            _ => stage,
        };
        Self::from_library(stage, error)
    }
}

/// Unified error type for loading operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The leading bytes are not a HEIF container.
    #[error("not a HEIF container")]
    UnrecognizedFormat,
    /// The external library could not be initialized or loaded.
    #[error("library unavailable: {0}")]
    LibraryUnavailable(String),
    /// Allocation failure.
    #[error("out of memory")]
    OutOfMemory,
    /// The external library rejected the data.
    #[error("{message}")]
    Codec {
        stage: DecodeStage,
        message: String,
    },
    /// The decoded image reported a missing or zero dimension.
    #[error("invalid image dimension")]
    InvalidDimension {
        width: Option<u32>,
        height: Option<u32>,
    },
    /// The decoded plane could not be read.
    #[error("error reading decoded data: {0}")]
    PlaneAccess(&'static str),
    /// Resource limit exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    /// The byte source failed before decoding started.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl LoadError {
    /// Convert a backend error. Only container, handle and decode failures
    /// become [`LoadError::Codec`].
    pub fn from_backend(error: BackendError) -> Self {
        match error.stage {
            DecodeStage::AllocContext => LoadError::OutOfMemory,
            DecodeStage::Setup => LoadError::LibraryUnavailable(error.message),
            DecodeStage::LimitCheck => LoadError::LimitExceeded(error.message),
            stage => LoadError::Codec {
                stage,
                message: error.message,
            },
        }
    }

    /// Whether the failure came from the data rather than the environment.
    ///
    /// A framework probing several loaders can move on to the next one when
    /// this is true.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            LoadError::UnrecognizedFormat
                | LoadError::Codec { .. }
                | LoadError::InvalidDimension { .. }
                | LoadError::PlaneAccess(_)
        )
    }
}

impl From<BackendError> for LoadError {
    fn from(error: BackendError) -> Self {
        LoadError::from_backend(error)
    }
}
