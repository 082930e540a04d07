//! Scaling and labelling of raw blocks into the tensor handed to callers
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis, s};

use crate::data_holder::raw_block::RawBlock;
use crate::error::RawReaderError;
use crate::params::CalibrationParams;
use crate::rawreader::{ChannelId, ReadSpec};

/// dimension names, in axis order
pub const DIMS: [&str; 3] = ["channels", "start_offsets", "offsets"];

/// Calibrated samples [channels][start_offsets][offsets] with their axis labels
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTensor {
    pub data: Array3<f64>,
    pub channels: Vec<ChannelId>,
    pub start_offsets: Vec<i64>,
    /// sample index within each window, 0..read_size
    pub offsets: Vec<usize>,
    pub samplerate: f64,
    /// copy of all calibration parameters of the recording
    pub attrs: CalibrationParams,
}

impl LabeledTensor {
    pub fn dims(&self) -> [&'static str; 3] {
        DIMS
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// all windows of a channel, None if the channel was not read
    pub fn channel(&self, channel: &ChannelId) -> Option<ArrayView2<'_, f64>> {
        self.channels
            .iter()
            .position(|c| c == channel)
            .map(|i| self.data.index_axis(Axis(0), i))
    }

    /// samples of one (channel, start offset) window, by position
    pub fn slice(&self, channel: usize, start_offset: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![channel, start_offset, ..])
    }
}

/// Applies the gain and attaches labels and metadata to a raw block.
/// Sentinel values stay sentinel through the scaling.
pub fn assemble(
    block: RawBlock,
    params: &CalibrationParams,
    spec: &ReadSpec,
) -> Result<(LabeledTensor, Array2<bool>), RawReaderError> {
    let gain = params.gain()?;
    let samplerate = params.samplerate()?;
    let RawBlock {
        mut data,
        mask,
        read_size,
        collapsed,
    } = block;
    data *= gain;
    let start_offsets = if collapsed {
        vec![0]
    } else {
        spec.start_offsets.clone()
    };
    let tensor = LabeledTensor {
        data,
        channels: spec.channels.clone(),
        start_offsets,
        offsets: (0..read_size).collect(),
        samplerate,
        attrs: params.clone(),
    };
    Ok((tensor, mask))
}
