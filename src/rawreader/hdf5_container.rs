//! hdf5 storage of combined recordings
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result, bail};
use hdf5::{Dataset, File};
use log::trace;
use ndarray::{Array2, Axis};

use super::tabular::{SampleContainer, TabularChannelReader};
use crate::error::RawReaderError;

/// 2D sample table
pub const TIMESERIES: &str = "eeg_timeseries";
/// channel port numbers, in table order
pub const PORTS: &str = "ports";
/// root attribute, true when the table is (samples x channels)
pub const BY_ROW: &str = "by_row";

/// Combined recording stored in an hdf5 file
pub struct Hdf5Container {
    file: File,
    timeseries: Dataset,
}

impl Hdf5Container {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed opening hdf5 file {}", path.display()))?;
        let timeseries = file
            .dataset(TIMESERIES)
            .with_context(|| format!("no {} dataset in {}", TIMESERIES, path.display()))?;
        trace!("opened {}", path.display());
        Ok(Hdf5Container { file, timeseries })
    }
}

impl SampleContainer for Hdf5Container {
    fn ports(&self) -> Result<Vec<i64>> {
        self.file
            .dataset(PORTS)
            .context("failed opening ports dataset")?
            .read_raw::<i64>()
            .context("failed reading ports dataset")
    }

    fn by_row(&self) -> Result<bool> {
        let names = self
            .file
            .attr_names()
            .context("failed listing root attributes")?;
        if !names.iter().any(|name| name == BY_ROW) {
            return Ok(false);
        }
        let attr = self
            .file
            .attr(BY_ROW)
            .context("failed opening by_row attribute")?;
        // numpy booleans may come as enum or as integer
        match attr.read_scalar::<bool>() {
            Ok(by_row) => Ok(by_row),
            Err(_) => Ok(attr
                .read_scalar::<i64>()
                .context("failed reading by_row attribute")?
                != 0),
        }
    }

    fn shape(&self) -> Result<(usize, usize)> {
        let shape = self.timeseries.shape();
        if shape.len() != 2 {
            bail!("{} has {} dimensions, expected 2", TIMESERIES, shape.len());
        }
        Ok((shape[0], shape[1]))
    }

    fn read_span(&self, axis: Axis, range: Range<usize>) -> Result<Array2<f64>> {
        let span = match axis.index() {
            0 => self.timeseries.read_slice_2d::<f64, _>((range.clone(), ..)),
            1 => self.timeseries.read_slice_2d::<f64, _>((.., range.clone())),
            _ => bail!("{} has only 2 axes", TIMESERIES),
        }
        .with_context(|| format!("failed reading span {:?} along {:?}", range, axis))?;
        // rebuilt from raw parts, hdf5 carries its own ndarray version
        let dim = span.dim();
        Array2::from_shape_vec(dim, span.into_raw_vec())
            .context("failed reshaping hdf5 span into ndarray")
    }
}

/// channel reader opening the hdf5 file at each read
pub fn hdf5_channel_reader(dataroot: &str) -> TabularChannelReader {
    let path = dataroot.to_string();
    TabularChannelReader::new(dataroot.to_string(), move || {
        Hdf5Container::open(&path)
            .map(|container| Box::new(container) as Box<dyn SampleContainer>)
            .map_err(|e| RawReaderError::io(&path, e))
    })
}
