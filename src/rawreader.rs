//! This module contains the raw data reading features
pub mod binary;
#[cfg(feature = "hdf5")]
pub mod hdf5_container;
pub mod tabular;

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use ndarray::Array2;

use crate::assembler::{LabeledTensor, assemble};
use crate::data_holder::raw_block::RawBlock;
use crate::data_holder::sample_format::{self, SampleFormat};
use crate::diagnostics::{DiagnosticsSink, LogSink};
use crate::error::RawReaderError;
use crate::params::{CalibrationParams, ParamsSource};
use binary::BinaryChannelReader;
use tabular::{SampleContainer, TabularChannelReader};

/// Label of one recording channel, e.g. "001"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(label: impl Into<String>) -> Self {
        ChannelId(label.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// numeric port number, as stored in combined containers
    pub fn port(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(label: &str) -> Self {
        ChannelId(label.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(label: String) -> Self {
        ChannelId(label)
    }
}

impl From<&String> for ChannelId {
    fn from(label: &String) -> Self {
        ChannelId(label.clone())
    }
}

/// Number of samples per (channel, offset) window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSize {
    /// derived from the file length
    Whole,
    Samples(usize),
}

impl From<i64> for ReadSize {
    /// negative values mean the whole file
    fn from(read_size: i64) -> Self {
        if read_size < 0 {
            ReadSize::Whole
        } else {
            ReadSize::Samples(read_size as usize)
        }
    }
}

impl ReadSize {
    /// integer form, -1 for the whole file
    pub fn as_i64(&self) -> i64 {
        match self {
            ReadSize::Whole => -1,
            ReadSize::Samples(n) => *n as i64,
        }
    }
}

/// What to read: dataset root, channels, start offsets and window size
#[derive(Debug, Clone, PartialEq)]
pub struct ReadSpec {
    /// file path without the channel extension, e.g. /data/R1001P_01Jan15_1000
    pub dataroot: String,
    pub channels: Vec<ChannelId>,
    pub start_offsets: Vec<i64>,
    pub read_size: ReadSize,
}

impl ReadSpec {
    pub fn new<C, I, O>(dataroot: impl Into<String>, channels: I, start_offsets: O, read_size: i64) -> Self
    where
        C: Into<ChannelId>,
        I: IntoIterator<Item = C>,
        O: IntoIterator<Item = i64>,
    {
        ReadSpec {
            dataroot: dataroot.into(),
            channels: channels.into_iter().map(Into::into).collect(),
            start_offsets: start_offsets.into_iter().collect(),
            read_size: read_size.into(),
        }
    }

    /// true when the dataset root points to a combined container
    pub fn is_container(&self) -> bool {
        self.dataroot.ends_with("h5")
    }

    /// rejects requests without channels or start offsets
    pub(crate) fn validate(&self) -> Result<(), RawReaderError> {
        if self.channels.is_empty() {
            return Err(RawReaderError::InvalidRequest(
                "at least one channel must be requested".to_string(),
            ));
        }
        if self.start_offsets.is_empty() {
            return Err(RawReaderError::InvalidRequest(
                "at least one start offset must be requested".to_string(),
            ));
        }
        Ok(())
    }
}

/// One on-disk representation of a recording
pub trait ChannelReader {
    /// Reads the requested windows of every channel.
    /// Per slice problems are reported to sink and leave the slice invalid.
    fn read_block(
        &self,
        spec: &ReadSpec,
        read_size: ReadSize,
        sink: &dyn DiagnosticsSink,
    ) -> Result<RawBlock, RawReaderError>;
}

/// Reader settings
#[derive(Clone)]
pub struct ReaderOptions {
    /// read channels of flat binary recordings on the rayon pool
    pub parallel: bool,
    /// receives the recoverable conditions
    pub sink: Arc<dyn DiagnosticsSink>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            parallel: true,
            sink: Arc::new(LogSink),
        }
    }
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl ReaderOptions {
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Reads raw eeg windows of one recording, binary or hdf5
pub struct RawReader {
    spec: ReadSpec,
    params: CalibrationParams,
    format: SampleFormat,
    backend: Box<dyn ChannelReader>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl fmt::Debug for RawReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawReader")
            .field("spec", &self.spec)
            .field("params", &self.params)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl RawReader {
    /// creates a reader with default options, warnings going to the log
    pub fn new<P: ParamsSource + ?Sized>(spec: ReadSpec, params: &P) -> Result<Self, RawReaderError> {
        Self::with_options(spec, params, ReaderOptions::default())
    }

    /// creates a reader, the backend being chosen from the dataset root
    pub fn with_options<P: ParamsSource + ?Sized>(
        spec: ReadSpec,
        params: &P,
        options: ReaderOptions,
    ) -> Result<Self, RawReaderError> {
        spec.validate()?;
        let params = params
            .read_params(&spec.dataroot)
            .map_err(|source| RawReaderError::Params {
                dataroot: spec.dataroot.clone(),
                source,
            })?;
        let format = checked_format(&params, options.sink.as_ref())?;
        let backend: Box<dyn ChannelReader> = if spec.is_container() {
            container_backend(&spec.dataroot)?
        } else {
            debug!("reading {} as flat binary channel files", spec.dataroot);
            Box::new(BinaryChannelReader::new(
                spec.dataroot.clone(),
                format,
                options.parallel,
            ))
        };
        Ok(RawReader {
            spec,
            params,
            format,
            backend,
            sink: options.sink,
        })
    }

    /// creates a reader on an already available container, whatever the dataset root
    pub fn with_container<C>(
        spec: ReadSpec,
        params: CalibrationParams,
        container: C,
        options: ReaderOptions,
    ) -> Result<Self, RawReaderError>
    where
        C: SampleContainer + Clone + 'static,
    {
        spec.validate()?;
        let format = checked_format(&params, options.sink.as_ref())?;
        let backend = Box::new(TabularChannelReader::from_container(
            spec.dataroot.clone(),
            container,
        ));
        Ok(RawReader {
            spec,
            params,
            format,
            backend,
            sink: options.sink,
        })
    }

    pub fn spec(&self) -> &ReadSpec {
        &self.spec
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// window size, pinned after the first binary read when it was derived
    pub fn read_size(&self) -> ReadSize {
        self.spec.read_size
    }

    /// reads the unscaled samples and validity mask
    pub fn read_raw(&mut self) -> Result<RawBlock, RawReaderError> {
        let block = self
            .backend
            .read_block(&self.spec, self.spec.read_size, self.sink.as_ref())?;
        if self.spec.read_size == ReadSize::Whole && !block.collapsed {
            info!(
                "read size of {} resolved to {} samples",
                self.spec.dataroot, block.read_size
            );
            self.spec.read_size = ReadSize::Samples(block.read_size);
        }
        Ok(block)
    }

    /// reads, scales by the gain and labels the samples.
    /// Returns the tensor [channels][start_offsets][offsets] with its validity mask
    pub fn read(&mut self) -> Result<(LabeledTensor, Array2<bool>), RawReaderError> {
        let block = self.read_raw()?;
        assemble(block, &self.params, &self.spec)
    }
}

/// format resolution and presence of the parameters needed to assemble results
fn checked_format(
    params: &CalibrationParams,
    sink: &dyn DiagnosticsSink,
) -> Result<SampleFormat, RawReaderError> {
    let format = sample_format::resolve_optional(params.format().as_deref(), sink)?;
    params.gain()?;
    params.samplerate()?;
    Ok(format)
}

#[cfg(feature = "hdf5")]
fn container_backend(dataroot: &str) -> Result<Box<dyn ChannelReader>, RawReaderError> {
    debug!("reading {} as hdf5 container", dataroot);
    Ok(Box::new(hdf5_container::hdf5_channel_reader(dataroot)))
}

#[cfg(not(feature = "hdf5"))]
fn container_backend(dataroot: &str) -> Result<Box<dyn ChannelReader>, RawReaderError> {
    Err(RawReaderError::ContainerUnavailable(dataroot.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::error::Diagnostic;

    fn params() -> CalibrationParams {
        CalibrationParams::new()
            .with("gain", 1.0)
            .with("samplerate", 500.0)
    }

    #[test]
    fn read_size_from_integer() {
        assert_eq!(ReadSize::from(-1), ReadSize::Whole);
        assert_eq!(ReadSize::from(-7), ReadSize::Whole);
        assert_eq!(ReadSize::from(0), ReadSize::Samples(0));
        assert_eq!(ReadSize::from(250).as_i64(), 250);
        assert_eq!(ReadSize::Whole.as_i64(), -1);
    }

    #[test]
    fn channel_ports() {
        assert_eq!(ChannelId::from("001").port(), Some(1));
        assert_eq!(ChannelId::from("128").port(), Some(128));
        assert_eq!(ChannelId::from("LA1").port(), None);
        assert_eq!(ChannelId::from("042").to_string(), "042");
    }

    #[test]
    fn empty_requests_rejected() {
        let spec = ReadSpec::new("/nonexistent/root", Vec::<&str>::new(), [0], 10);
        assert!(matches!(
            RawReader::new(spec, &params()),
            Err(RawReaderError::InvalidRequest(_))
        ));
        let spec = ReadSpec::new("/nonexistent/root", ["001"], Vec::<i64>::new(), 10);
        assert!(matches!(
            RawReader::new(spec, &params()),
            Err(RawReaderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unsupported_format_before_any_file() {
        // the root does not exist, so reaching the file system would fail differently
        let spec = ReadSpec::new("/nonexistent/root", ["001"], [0], 10);
        let params = params().with("format", "bogus");
        match RawReader::new(spec, &params) {
            Err(RawReaderError::UnsupportedFormat { name, valid }) => {
                assert_eq!(name, "bogus");
                assert!(valid.contains(&"float64"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_gain_rejected() {
        let spec = ReadSpec::new("/nonexistent/root", ["001"], [0], 10);
        let params = CalibrationParams::new().with("samplerate", 500.0);
        assert!(matches!(
            RawReader::new(spec, &params),
            Err(RawReaderError::MissingParameter("gain"))
        ));
    }

    #[test]
    fn params_source_failure() {
        let spec = ReadSpec::new("/nonexistent/root", ["001"], [0], 10);
        let source = |_: &str| -> anyhow::Result<CalibrationParams> {
            anyhow::bail!("no params.txt next to the recording")
        };
        assert!(matches!(
            RawReader::new(spec, &source),
            Err(RawReaderError::Params { .. })
        ));
    }

    #[test]
    fn missing_format_warns_at_construction() {
        let sink = Arc::new(CollectingSink::new());
        let spec = ReadSpec::new("/nonexistent/root", ["001"], [0], 10);
        let options = ReaderOptions::default().with_sink(sink.clone());
        let reader = RawReader::with_options(spec, &params(), options).unwrap();
        assert_eq!(reader.format(), sample_format::INT16);
        assert_eq!(sink.diagnostics(), vec![Diagnostic::MissingFormatSpec]);
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn container_without_hdf5_support() {
        let spec = ReadSpec::new("/nonexistent/session.h5", ["1"], [0], 10);
        assert!(matches!(
            RawReader::new(spec, &params()),
            Err(RawReaderError::ContainerUnavailable(_))
        ));
    }
}
