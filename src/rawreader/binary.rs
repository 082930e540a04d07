//! Reading of flat binary recordings, one headerless file per channel
use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, trace};
use ndarray::{ArrayViewMut1, ArrayViewMut2, Axis};
use rayon::prelude::*;

use super::{ChannelId, ChannelReader, ReadSize, ReadSpec};
use crate::data_holder::raw_block::RawBlock;
use crate::data_holder::sample_format::SampleFormat;
use crate::diagnostics::DiagnosticsSink;
use crate::error::{Diagnostic, RawReaderError};

/// Reads channel files named {dataroot}.{channel}
#[derive(Debug, Clone)]
pub struct BinaryChannelReader {
    dataroot: String,
    format: SampleFormat,
    parallel: bool,
}

impl BinaryChannelReader {
    pub fn new(dataroot: String, format: SampleFormat, parallel: bool) -> Self {
        BinaryChannelReader {
            dataroot,
            format,
            parallel,
        }
    }

    /// path of the file holding the channel samples
    pub fn channel_path(&self, channel: &ChannelId) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.dataroot, channel))
    }

    /// Number of samples in the channel file. All channel files of a
    /// recording are assumed to have the same length.
    pub fn file_samples(&self, channel: &ChannelId) -> Result<usize, RawReaderError> {
        let path = self.channel_path(channel);
        let metadata = fs::metadata(&path).map_err(|e| open_error(e, &path, channel))?;
        Ok(self.format.samples_in(metadata.len()))
    }

    /// reads all offsets of one channel into its slab of the tensor and mask
    fn read_channel(
        &self,
        channel: &ChannelId,
        start_offsets: &[i64],
        read_size: usize,
        mut slab: ArrayViewMut2<f64>,
        mut valid: ArrayViewMut1<bool>,
        sink: &dyn DiagnosticsSink,
    ) -> Result<(), RawReaderError> {
        let path = self.channel_path(channel);
        let file = File::open(&path).map_err(|e| open_error(e, &path, channel))?;
        trace!("opened {}", path.display());
        let mut rdr = BufReader::new(file);
        let width = self.format.byte_width;
        let mut bytes: Vec<u8> = Vec::with_capacity(read_size * width);
        let mut samples = vec![0f64; read_size];
        for (e, &start_offset) in start_offsets.iter().enumerate() {
            if start_offset < 0 {
                sink.report(Diagnostic::NegativeOffset {
                    offset: start_offset,
                    file: path.display().to_string(),
                });
                continue;
            }
            let n = match (start_offset as u64).checked_mul(width as u64) {
                Some(position) => {
                    read_window(&mut rdr, position, (read_size * width) as u64, &mut bytes)
                        .with_context(|| format!("failed reading offset {}", start_offset))
                        .map_err(|e| RawReaderError::io(&path, e))?;
                    self.format.decode_into(&bytes, &mut samples)
                }
                None => 0,
            };
            if n < read_size {
                sink.report(Diagnostic::TruncatedRead {
                    offset: start_offset,
                    file: path.display().to_string(),
                    requested: read_size,
                    available: n,
                });
            } else {
                slab.row_mut(e)
                    .iter_mut()
                    .zip(samples.iter())
                    .for_each(|(d, s)| *d = *s);
                valid[e] = true;
            }
        }
        // file released here, whatever happened to the offsets
        Ok(())
    }
}

impl ChannelReader for BinaryChannelReader {
    fn read_block(
        &self,
        spec: &ReadSpec,
        read_size: ReadSize,
        sink: &dyn DiagnosticsSink,
    ) -> Result<RawBlock, RawReaderError> {
        spec.validate()?;
        let read_size = match read_size {
            ReadSize::Samples(n) => n,
            ReadSize::Whole => {
                let first = &spec.channels[0];
                let n = self.file_samples(first)?;
                debug!("read size derived from channel {}: {} samples", first, n);
                n
            }
        };
        let mut block = RawBlock::empty(spec.channels.len(), spec.start_offsets.len(), read_size);
        let RawBlock { data, mask, .. } = &mut block;
        if self.parallel {
            // each channel writes only its own slab
            data.axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(mask.axis_iter_mut(Axis(0)).into_par_iter())
                .zip(spec.channels.par_iter())
                .try_for_each(|((slab, valid), channel)| {
                    self.read_channel(channel, &spec.start_offsets, read_size, slab, valid, sink)
                })?;
        } else {
            for ((slab, valid), channel) in data
                .axis_iter_mut(Axis(0))
                .zip(mask.axis_iter_mut(Axis(0)))
                .zip(spec.channels.iter())
            {
                self.read_channel(channel, &spec.start_offsets, read_size, slab, valid, sink)?;
            }
        }
        Ok(block)
    }
}

/// Reads up to length bytes from position into buf, less at end of file
fn read_window<R: Read + Seek>(
    rdr: &mut R,
    position: u64,
    length: u64,
    buf: &mut Vec<u8>,
) -> io::Result<()> {
    buf.clear();
    rdr.seek(SeekFrom::Start(position))?;
    rdr.take(length).read_to_end(buf)?;
    Ok(())
}

fn open_error(error: io::Error, path: &Path, channel: &ChannelId) -> RawReaderError {
    if error.kind() == ErrorKind::NotFound {
        RawReaderError::ChannelNotFound {
            channel: channel.to_string(),
            location: path.display().to_string(),
        }
    } else {
        RawReaderError::io(
            path,
            anyhow::Error::new(error).context(format!("failed opening channel {}", channel)),
        )
    }
}
