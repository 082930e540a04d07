//! Sample formats and intermediate data containers
pub mod raw_block;
pub mod sample_format;
