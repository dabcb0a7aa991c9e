//! Archive extraction for downloaded packages.

mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use anyhow::{Result, anyhow};
use std::path::Path;

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// A format-specific extractor. Entries are written below `extract_to`
/// exactly as they are laid out in the archive.
pub trait ArchiveExtractor: Send + Sync {
    fn can_handle(&self, archive_path: &Path) -> bool;

    fn extract(&self, runtime: &dyn Runtime, archive_path: &Path, extract_to: &Path)
    -> Result<()>;
}

/// Dispatches to the first extractor that recognizes the file name.
pub struct ArchiveExtractorImpl {
    extractors: Vec<Box<dyn ArchiveExtractor>>,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            extractors: vec![Box::new(ZipExtractor), Box::new(TarGzExtractor)],
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.extractors.iter().any(|e| e.can_handle(archive_path))
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract(
        &self,
        runtime: &dyn Runtime,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.can_handle(archive_path))
            .ok_or_else(|| anyhow!("Unsupported archive format: {}", archive_path.display()))?;
        extractor.extract(runtime, archive_path, extract_to)
    }
}
