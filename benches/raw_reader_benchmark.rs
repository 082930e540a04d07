use criterion::{Criterion, criterion_group, criterion_main};
use rawreader::{CalibrationParams, RawReader, ReadSpec, ReaderOptions};
use std::fs;
use tempfile::TempDir;

const N_CHANNELS: usize = 64;
const N_SAMPLES: usize = 500_000;

/// writes a recording of int16 channel files, returns the dataset root
fn write_recording(dir: &TempDir) -> String {
    let root = dir.path().join("R1001P_bench").display().to_string();
    let bytes: Vec<u8> = (0..N_SAMPLES)
        .flat_map(|i| ((i % 4096) as i16).to_le_bytes())
        .collect();
    for channel in 0..N_CHANNELS {
        fs::write(format!("{}.{:03}", root, channel + 1), &bytes).expect("failed writing channel");
    }
    root
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().expect("failed creating temporary directory");
    let root = write_recording(&dir);
    let params = CalibrationParams::new()
        .with("format", "int16")
        .with("gain", 0.25)
        .with("samplerate", 1000.0);
    let channels: Vec<String> = (1..=N_CHANNELS).map(|c| format!("{:03}", c)).collect();
    let offsets: Vec<i64> = (0..200).map(|e| e * 2_000 + 17).collect();
    let spec = ReadSpec::new(root, &channels, offsets, 1_500);

    let mut group = c.benchmark_group("EventWindows");
    group.sample_size(10);
    group.bench_function("rawreader_parallel", |b| {
        let mut reader = RawReader::new(spec.clone(), &params).expect("failed creating reader");
        b.iter(|| reader.read().expect("failed reading"))
    });
    group.bench_function("rawreader_sequential", |b| {
        let options = ReaderOptions::default().sequential();
        let mut reader =
            RawReader::with_options(spec.clone(), &params, options).expect("failed creating reader");
        b.iter(|| reader.read().expect("failed reading"))
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
