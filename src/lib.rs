//! Reader of raw multi-channel eeg recordings.
//!
//! A recording is either a set of flat binary files, one per channel and named
//! `{dataroot}.{channel}`, or a single hdf5 container (`hdf5` feature).
//! [`RawReader`] reads windows of samples at given start offsets for a list of
//! channels, returning the calibrated tensor `[channels][start_offsets][offsets]`
//! and a `[channels][start_offsets]` mask telling which windows were fully read.
#![deny(unsafe_code)]
pub mod assembler;
pub mod data_holder;
pub mod diagnostics;
pub mod error;
pub mod params;
pub mod rawreader;

pub use assembler::LabeledTensor;
pub use diagnostics::{CollectingSink, DiagnosticsSink, LogSink};
pub use error::{Diagnostic, RawReaderError};
pub use params::{CalibrationParams, ParamValue, ParamsSource};
pub use rawreader::{ChannelId, RawReader, ReadSize, ReadSpec, ReaderOptions};
