//! Batch conversion over multiple files.

use tracing::info;

use crate::converters::convert_auto;
use crate::model::{BatchResult, ConversionRequest};

/// Convert each file in order with format auto-detection. Individual
/// failures land in their result entry and do not stop the run.
pub fn run(file_paths: &[String], output_dir: Option<&str>, overwrite: bool) -> BatchResult {
    info!("Batch converting {} files", file_paths.len());

    let mut results = Vec::with_capacity(file_paths.len());
    let mut successful = 0usize;
    let mut failed = 0usize;

    for file_path in file_paths {
        let req = ConversionRequest {
            file_path: Some(file_path.clone()),
            output_dir: output_dir.map(str::to_string),
            overwrite,
            ..ConversionRequest::default()
        };
        let result = convert_auto(&req, None);
        if result.success {
            successful += 1;
        } else {
            failed += 1;
        }
        results.push(result);
    }

    BatchResult {
        results,
        total: file_paths.len(),
        successful,
        failed,
    }
}
