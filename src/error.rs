//! Error and diagnostic types of the reader.
use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions, aborting the construction or the read call
#[derive(Debug, Error)]
pub enum RawReaderError {
    /// format name present in the parameters but not in the format table
    #[error("Unsupported format: {name}. Allowed format names are: {valid:?}")]
    UnsupportedFormat {
        name: String,
        valid: Vec<&'static str>,
    },

    /// channel file missing or channel absent from the container port index
    #[error("Channel {channel} not found in {location}")]
    ChannelNotFound { channel: String, location: String },

    /// open, seek or read failure not otherwise classified
    #[error("I/O failure on {path:?}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// malformed read request, rejected before any file is opened
    #[error("Invalid read request: {0}")]
    InvalidRequest(String),

    /// required calibration parameter absent or not numeric
    #[error("Missing calibration parameter: {0}")]
    MissingParameter(&'static str),

    /// parameter collaborator failed to deliver the parameters
    #[error("Failed reading parameters for {dataroot}")]
    Params {
        dataroot: String,
        #[source]
        source: anyhow::Error,
    },

    /// dataset is a container but hdf5 support is not compiled in
    #[error("{0} is an hdf5 container, rebuild with the hdf5 feature to read it")]
    ContainerUnavailable(String),
}

impl RawReaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        RawReaderError::IoFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Recoverable conditions. They are reported to the diagnostics sink and
/// never change the control flow of a read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error(
        "Could not find data format definition in the params. Will read the file assuming data format is int16"
    )]
    MissingFormatSpec,

    #[error("Cannot read from negative offset {offset} in file {file}")]
    NegativeOffset { offset: i64, file: String },

    #[error(
        "Cannot read full chunk of data for offset {offset}: got {available} of {requested} samples, end of read interval is outside the bounds of file {file}"
    )]
    TruncatedRead {
        offset: i64,
        file: String,
        requested: usize,
        available: usize,
    },
}
