// THEORY:
// The `errors` module defines the complete failure taxonomy for the engine.
// Each layer of the system owns one error enum, and the propagation policy
// is fixed: source errors cost one tick, decode errors cost one image,
// processor errors cost one (processor, region) pair, and publish errors
// cost one message. Nothing in this taxonomy aborts the scheduling loops.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while probing a source for a new image.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source's backing location does not exist or cannot be listed.
    #[error("source location unavailable: {path}")]
    Unavailable { path: PathBuf },
    /// The location exists but an entry inside it could not be inspected.
    #[error("failed to read source entry {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while turning raw image bytes into a `PixelBuffer`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image data is corrupt: {0}")]
    CorruptData(String),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Failures inside a single processor invocation.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The region's bounds do not fit inside the pixel buffer.
    #[error("region {label} does not fit inside a {width}x{height} image")]
    InvalidRegion {
        label: String,
        width: u32,
        height: u32,
    },
    #[error("metric computation failed: {0}")]
    ComputeFailed(String),
}

/// Failures covering one whole pipeline run for one image.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Decoding failed, so no processor ran for this image.
    #[error("failed to decode {path}: {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("failed to read image bytes from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while handing a message to the pub/sub transport.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport is down or its queue is full")]
    TransportDown,
    #[error("broker rejected the message: {0}")]
    Rejected(String),
}

/// Failures while validating the typed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate source name: {0}")]
    DuplicateSourceName(String),
    #[error("duplicate processor name: {0}")]
    DuplicateProcessorName(String),
    #[error("source {0} has update_interval 0; the minimum is 1 second")]
    ZeroInterval(String),
    #[error("source kind {kind} is not constructible yet (source {name})")]
    UnsupportedSourceKind { name: String, kind: String },
    #[error("processor kind {kind} is not constructible yet (processor {name})")]
    UnsupportedProcessorKind { name: String, kind: String },
}
