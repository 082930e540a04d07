//! On-disk sample formats of the flat binary channel files
use byteorder::{ByteOrder, LittleEndian};

use crate::diagnostics::DiagnosticsSink;
use crate::error::{Diagnostic, RawReaderError};

/// How raw bytes are turned into samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeScheme {
    Int16,
    Int32,
    Float32,
    Float64,
}

/// Width and decoding of one stored sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub byte_width: usize,
    pub decode_scheme: DecodeScheme,
}

pub const INT16: SampleFormat = SampleFormat {
    byte_width: 2,
    decode_scheme: DecodeScheme::Int16,
};
pub const INT32: SampleFormat = SampleFormat {
    byte_width: 4,
    decode_scheme: DecodeScheme::Int32,
};
pub const FLOAT32: SampleFormat = SampleFormat {
    byte_width: 4,
    decode_scheme: DecodeScheme::Float32,
};
pub const FLOAT64: SampleFormat = SampleFormat {
    byte_width: 8,
    decode_scheme: DecodeScheme::Float64,
};

/// format names understood in the params, with their format
const FORMAT_TABLE: [(&str, SampleFormat); 7] = [
    ("single", FLOAT32),
    ("float32", FLOAT32),
    ("short", INT16),
    ("int16", INT16),
    ("int32", INT32),
    ("double", FLOAT64),
    ("float64", FLOAT64),
];

/// list of the accepted format names
pub fn format_names() -> Vec<&'static str> {
    FORMAT_TABLE.iter().map(|(name, _)| *name).collect()
}

/// resolves a format name
pub fn resolve(name: &str) -> Result<SampleFormat, RawReaderError> {
    FORMAT_TABLE
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, format)| *format)
        .ok_or_else(|| RawReaderError::UnsupportedFormat {
            name: name.to_string(),
            valid: format_names(),
        })
}

/// resolves an optional format name, absent name falls back to int16 with a warning
pub fn resolve_optional(
    name: Option<&str>,
    sink: &dyn DiagnosticsSink,
) -> Result<SampleFormat, RawReaderError> {
    match name {
        Some(name) => resolve(name),
        None => {
            sink.report(Diagnostic::MissingFormatSpec);
            Ok(INT16)
        }
    }
}

impl SampleFormat {
    /// number of whole samples held in n_bytes
    pub fn samples_in(&self, n_bytes: u64) -> usize {
        (n_bytes / self.byte_width as u64) as usize
    }

    /// Decodes little endian bytes into out, trailing partial sample is ignored.
    /// Returns the number of decoded samples, bounded by out length.
    pub fn decode_into(&self, bytes: &[u8], out: &mut [f64]) -> usize {
        let n = (bytes.len() / self.byte_width).min(out.len());
        let bytes = &bytes[..n * self.byte_width];
        let out = &mut out[..n];
        match self.decode_scheme {
            DecodeScheme::Int16 => {
                let mut buf = vec![0i16; n];
                LittleEndian::read_i16_into(bytes, &mut buf);
                out.iter_mut().zip(buf).for_each(|(o, v)| *o = v as f64);
            }
            DecodeScheme::Int32 => {
                let mut buf = vec![0i32; n];
                LittleEndian::read_i32_into(bytes, &mut buf);
                out.iter_mut().zip(buf).for_each(|(o, v)| *o = v as f64);
            }
            DecodeScheme::Float32 => {
                let mut buf = vec![0f32; n];
                LittleEndian::read_f32_into(bytes, &mut buf);
                out.iter_mut().zip(buf).for_each(|(o, v)| *o = v as f64);
            }
            DecodeScheme::Float64 => LittleEndian::read_f64_into(bytes, out),
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    #[test]
    fn format_aliases() {
        assert_eq!(resolve("single").unwrap(), resolve("float32").unwrap());
        assert_eq!(resolve("short").unwrap(), INT16);
        assert_eq!(resolve("double").unwrap().byte_width, 8);
        assert_eq!(resolve("int32").unwrap().decode_scheme, DecodeScheme::Int32);
    }

    #[test]
    fn bogus_format() {
        match resolve("bogus") {
            Err(RawReaderError::UnsupportedFormat { name, valid }) => {
                assert_eq!(name, "bogus");
                assert_eq!(valid.len(), 7);
                assert!(valid.contains(&"int16"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_format_defaults_to_int16() {
        let sink = CollectingSink::new();
        assert_eq!(resolve_optional(None, &sink).unwrap(), INT16);
        assert_eq!(sink.diagnostics(), vec![Diagnostic::MissingFormatSpec]);
        assert!(resolve_optional(Some("bogus"), &sink).is_err());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn decode_schemes() {
        let mut out = [0f64; 4];
        let bytes: Vec<u8> = [-2i16, 300, 7]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .chain([0xFFu8]) // dangling half sample
            .collect();
        assert_eq!(INT16.decode_into(&bytes, &mut out), 3);
        assert_eq!(&out[..3], &[-2.0, 300.0, 7.0]);

        let bytes: Vec<u8> = [1.5f32, -0.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(FLOAT32.decode_into(&bytes, &mut out), 2);
        assert_eq!(&out[..2], &[1.5, -0.25]);

        let bytes: Vec<u8> = [-70000i32].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(INT32.decode_into(&bytes, &mut out), 1);
        assert_eq!(out[0], -70000.0);

        let bytes: Vec<u8> = [1e-9f64, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut one = [0f64; 1];
        assert_eq!(FLOAT64.decode_into(&bytes, &mut one), 1);
        assert_eq!(one[0], 1e-9);
    }
}
