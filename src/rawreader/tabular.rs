//! Reading of combined recordings holding all channels in one sample table
use std::ops::Range;
use std::sync::Arc;

use anyhow::{Result, bail};
use log::debug;
use ndarray::{Array2, Axis, Slice};

use super::{ChannelId, ChannelReader, ReadSize, ReadSpec};
use crate::data_holder::raw_block::RawBlock;
use crate::diagnostics::DiagnosticsSink;
use crate::error::{Diagnostic, RawReaderError};

/// Storage of a combined recording: a 2D sample table, a port index
/// numbering its channels and an orientation flag
pub trait SampleContainer {
    /// port number of each channel, in table order
    fn ports(&self) -> Result<Vec<i64>>;
    /// true when the table is (samples x channels), false for (channels x samples)
    fn by_row(&self) -> Result<bool>;
    /// raw table dimensions
    fn shape(&self) -> Result<(usize, usize)>;
    /// reads range along axis, with the full extent of the other axis
    fn read_span(&self, axis: Axis, range: Range<usize>) -> Result<Array2<f64>>;
}

type Opener = Box<dyn Fn() -> Result<Box<dyn SampleContainer>, RawReaderError>>;

/// Reads requested windows from a combined container, opened for each read
pub struct TabularChannelReader {
    location: String,
    opener: Opener,
}

impl TabularChannelReader {
    pub fn new<F>(location: String, opener: F) -> Self
    where
        F: Fn() -> Result<Box<dyn SampleContainer>, RawReaderError> + 'static,
    {
        TabularChannelReader {
            location,
            opener: Box::new(opener),
        }
    }

    /// reader on a container already in memory
    pub fn from_container<C>(location: String, container: C) -> Self
    where
        C: SampleContainer + Clone + 'static,
    {
        Self::new(location, move || {
            Ok(Box::new(container.clone()) as Box<dyn SampleContainer>)
        })
    }

    fn io(&self, error: anyhow::Error) -> RawReaderError {
        RawReaderError::io(&self.location, error)
    }
}

/// table positions of the requested channels, in request order
fn select_channels(
    ports: &[i64],
    channels: &[ChannelId],
    location: &str,
) -> Result<Vec<usize>, RawReaderError> {
    channels
        .iter()
        .map(|channel| {
            channel
                .port()
                .and_then(|port| ports.iter().position(|p| *p == port))
                .ok_or_else(|| RawReaderError::ChannelNotFound {
                    channel: channel.to_string(),
                    location: format!("port index of {}", location),
                })
        })
        .collect()
}

impl ChannelReader for TabularChannelReader {
    fn read_block(
        &self,
        spec: &ReadSpec,
        read_size: ReadSize,
        sink: &dyn DiagnosticsSink,
    ) -> Result<RawBlock, RawReaderError> {
        spec.validate()?;
        let container = (self.opener)()?;
        let ports = container.ports().map_err(|e| self.io(e))?;
        let selection = select_channels(&ports, &spec.channels, &self.location)?;
        let by_row = container.by_row().map_err(|e| self.io(e))?;
        let (rows, cols) = container.shape().map_err(|e| self.io(e))?;
        let (sample_axis, channel_axis, n_samples, n_table_channels) = if by_row {
            (Axis(0), Axis(1), rows, cols)
        } else {
            (Axis(1), Axis(0), cols, rows)
        };
        if n_table_channels != ports.len() {
            return Err(self.io(anyhow::anyhow!(
                "port index has {} entries for {} channels in the sample table",
                ports.len(),
                n_table_channels
            )));
        }
        debug!(
            "{}: {} channels of {} samples, by_row {}",
            self.location, n_table_channels, n_samples, by_row
        );
        // selected channels of a span, channel as leading axis
        let select = |span: Array2<f64>| -> Array2<f64> {
            let selected = span.select(channel_axis, &selection);
            if by_row {
                selected.reversed_axes()
            } else {
                selected
            }
        };
        match read_size {
            ReadSize::Whole => {
                let span = container
                    .read_span(sample_axis, 0..n_samples)
                    .map_err(|e| self.io(e))?;
                let mut block = RawBlock::empty(spec.channels.len(), 1, n_samples);
                block
                    .data
                    .index_axis_mut(Axis(1), 0)
                    .assign(&select(span));
                block.mask.fill(true);
                block.collapsed = true;
                Ok(block)
            }
            ReadSize::Samples(read_size) => {
                let mut block =
                    RawBlock::empty(spec.channels.len(), spec.start_offsets.len(), read_size);
                for (i, &start_offset) in spec.start_offsets.iter().enumerate() {
                    if start_offset < 0 {
                        sink.report(Diagnostic::NegativeOffset {
                            offset: start_offset,
                            file: self.location.clone(),
                        });
                        continue;
                    }
                    let start = (start_offset as usize).min(n_samples);
                    let end = start.saturating_add(read_size).min(n_samples);
                    if end - start < read_size {
                        sink.report(Diagnostic::TruncatedRead {
                            offset: start_offset,
                            file: self.location.clone(),
                            requested: read_size,
                            available: end - start,
                        });
                        continue;
                    }
                    let span = container
                        .read_span(sample_axis, start..end)
                        .map_err(|e| self.io(e))?;
                    block
                        .data
                        .index_axis_mut(Axis(1), i)
                        .assign(&select(span));
                    block.mask.column_mut(i).fill(true);
                }
                Ok(block)
            }
        }
    }
}

/// Combined recording held in memory
#[derive(Debug, Clone)]
pub struct MemoryContainer {
    timeseries: Arc<Array2<f64>>,
    ports: Arc<Vec<i64>>,
    by_row: bool,
}

impl MemoryContainer {
    /// table is (channels x samples) unless by_row, then (samples x channels)
    pub fn new(timeseries: Array2<f64>, ports: Vec<i64>, by_row: bool) -> Self {
        MemoryContainer {
            timeseries: Arc::new(timeseries),
            ports: Arc::new(ports),
            by_row,
        }
    }
}

impl SampleContainer for MemoryContainer {
    fn ports(&self) -> Result<Vec<i64>> {
        Ok(self.ports.to_vec())
    }
    fn by_row(&self) -> Result<bool> {
        Ok(self.by_row)
    }
    fn shape(&self) -> Result<(usize, usize)> {
        Ok(self.timeseries.dim())
    }
    fn read_span(&self, axis: Axis, range: Range<usize>) -> Result<Array2<f64>> {
        if axis.index() > 1 || range.end > self.timeseries.len_of(axis) {
            bail!("span {:?} out of table bounds along {:?}", range, axis);
        }
        Ok(self
            .timeseries
            .slice_axis(axis, Slice::from(range))
            .to_owned())
    }
}
