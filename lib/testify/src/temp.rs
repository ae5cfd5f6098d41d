use std::path::PathBuf;

use rand::distr::{Alphanumeric, SampleString};

fn random_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), len)
}

pub fn temp_file(extension: &str) -> PathBuf {
    let file_name = format!("{}.{extension}", random_string(16));
    std::env::temp_dir().join(file_name)
}

/// Write `content` to a new file in the temp directory and return its path.
pub fn write_temp_file(extension: &str, content: &str) -> PathBuf {
    let path = temp_file(extension);
    std::fs::write(&path, content).expect("write temp file");
    path
}
