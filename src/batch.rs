//! Parallel extraction over many documents.
//!
//! Documents are independent, so each one is extracted on its own rayon
//! task. A single extraction stays sequential.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::model::Fragment;
use crate::parser::ExtractOptions;

/// Outcome of extracting one input file.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: Result<Vec<Fragment>>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Extract every file in parallel. Results come back in input order; one
/// failing file does not affect the others.
pub fn extract_files<P>(paths: &[P], options: &ExtractOptions) -> Vec<BatchItem>
where
    P: AsRef<Path> + Sync,
{
    extract_files_with(paths, options, |_| {})
}

/// Like [`extract_files`], calling `on_done` as each file finishes (in
/// completion order, from worker threads).
pub fn extract_files_with<P, F>(paths: &[P], options: &ExtractOptions, on_done: F) -> Vec<BatchItem>
where
    P: AsRef<Path> + Sync,
    F: Fn(&BatchItem) + Sync,
{
    log::debug!("Batch extracting {} files", paths.len());
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = crate::extract_file_with_options(path, options.clone());
            if let Err(e) = &result {
                log::warn!("{}: {}", path.display(), e);
            }
            let item = BatchItem {
                path: path.to_path_buf(),
                result,
            };
            on_done(&item);
            item
        })
        .collect()
}

/// Extract in-memory documents in parallel, in input order.
pub fn extract_all<D>(documents: &[D], options: &ExtractOptions) -> Vec<Result<Vec<Fragment>>>
where
    D: AsRef<[u8]> + Sync,
{
    documents
        .par_iter()
        .map(|data| crate::extract_with_options(data.as_ref(), options.clone()))
        .collect()
}
