//! Calibration parameters handed over by the parameter file reader.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RawReaderError;

/// key of the on-disk sample format name
pub const FORMAT_KEY: &str = "format";
/// key of the calibration gain
pub const GAIN_KEY: &str = "gain";
/// key of the sampling rate
pub const SAMPLERATE_KEY: &str = "samplerate";

/// One parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// numeric value, integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Parameters of one recording: format, gain, samplerate and any other key,
/// kept verbatim to be attached as metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationParams(BTreeMap<String, ParamValue>);

impl CalibrationParams {
    pub fn new() -> Self {
        Self::default()
    }
    /// parses a json object of parameters
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed parsing calibration parameters json")
    }
    /// reads a json file of parameters
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed reading parameters file {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("failed parsing parameters file {}", path.display()))
    }
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }
    /// builder flavour of insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// sample format name, None if the key is absent.
    /// A non textual value is rendered as text so that it fails format resolution
    pub fn format(&self) -> Option<String> {
        self.0.get(FORMAT_KEY).map(|v| match v {
            ParamValue::Text(s) => s.clone(),
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Bool(b) => b.to_string(),
        })
    }
    pub fn gain(&self) -> Result<f64, RawReaderError> {
        self.number(GAIN_KEY)
    }
    pub fn samplerate(&self) -> Result<f64, RawReaderError> {
        self.number(SAMPLERATE_KEY)
    }
    fn number(&self, key: &'static str) -> Result<f64, RawReaderError> {
        self.0
            .get(key)
            .and_then(ParamValue::as_f64)
            .ok_or(RawReaderError::MissingParameter(key))
    }
}

impl FromIterator<(String, ParamValue)> for CalibrationParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        CalibrationParams(iter.into_iter().collect())
    }
}

/// Delivers the calibration parameters of a dataset root.
/// Parsing of the parameters file lives outside of this crate.
pub trait ParamsSource {
    fn read_params(&self, dataroot: &str) -> Result<CalibrationParams>;
}

impl ParamsSource for CalibrationParams {
    fn read_params(&self, _dataroot: &str) -> Result<CalibrationParams> {
        Ok(self.clone())
    }
}

impl<F> ParamsSource for F
where
    F: Fn(&str) -> Result<CalibrationParams>,
{
    fn read_params(&self, dataroot: &str) -> Result<CalibrationParams> {
        self(dataroot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_params() -> Result<()> {
        let params = CalibrationParams::from_json_str(
            r#"{"format": "int16", "gain": 0.5, "samplerate": 500, "subject": "R1001P", "by_row": true}"#,
        )?;
        assert_eq!(params.format().as_deref(), Some("int16"));
        assert_eq!(params.gain()?, 0.5);
        assert_eq!(params.samplerate()?, 500.0);
        assert_eq!(params.get("subject"), Some(&ParamValue::Text("R1001P".into())));
        assert_eq!(params.get("by_row"), Some(&ParamValue::Bool(true)));
        Ok(())
    }

    #[test]
    fn missing_gain() {
        let params = CalibrationParams::new().with(SAMPLERATE_KEY, 1000.0);
        assert!(matches!(
            params.gain(),
            Err(RawReaderError::MissingParameter(GAIN_KEY))
        ));
        assert_eq!(params.format(), None);
    }

    #[test]
    fn closure_source() -> Result<()> {
        let source = |root: &str| -> Result<CalibrationParams> {
            Ok(CalibrationParams::new().with("root", root))
        };
        let params = source.read_params("/data/R1001P")?;
        assert_eq!(params.get("root").and_then(ParamValue::as_str), Some("/data/R1001P"));
        Ok(())
    }
}
