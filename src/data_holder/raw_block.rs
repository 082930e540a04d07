//! Unscaled samples and validity mask produced by a channel reader
use ndarray::{Array2, Array3, ArrayView1, Axis};

/// value of the tensor entries not filled with decoded samples
pub const SENTINEL: f64 = f64::NAN;

/// Raw tensor [channel][offset][sample] with its [channel][offset] validity mask
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub data: Array3<f64>,
    pub mask: Array2<bool>,
    /// number of samples per (channel, offset) slice, resolved
    pub read_size: usize,
    /// true when the offset axis was collapsed into a single synthetic offset 0
    pub collapsed: bool,
}

impl RawBlock {
    /// tensor filled with sentinel and all slices invalid
    pub fn empty(n_channels: usize, n_offsets: usize, read_size: usize) -> Self {
        RawBlock {
            data: Array3::from_elem((n_channels, n_offsets, read_size), SENTINEL),
            mask: Array2::from_elem((n_channels, n_offsets), false),
            read_size,
            collapsed: false,
        }
    }

    pub fn n_channels(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_offsets(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// samples of one slice
    pub fn slice(&self, channel: usize, offset: usize) -> ArrayView1<'_, f64> {
        self.data.slice(ndarray::s![channel, offset, ..])
    }

    /// checks that a slice is valid exactly when it holds no sentinel
    pub fn mask_is_consistent(&self) -> bool {
        self.mask.indexed_iter().all(|((c, o), valid)| {
            let has_sentinel = self.slice(c, o).iter().any(|v| v.is_nan());
            *valid != has_sentinel
        })
    }
}
