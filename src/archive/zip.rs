use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::ArchiveExtractor;

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        archive_path
            .to_string_lossy()
            .to_lowercase()
            .ends_with(".zip")
    }

    fn extract(
        &self,
        runtime: &dyn Runtime,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting {:?} to {:?}", archive_path, extract_to);

        // ZipArchive needs Read + Seek
        let mut buffer = Vec::new();
        runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
            .with_context(|| format!("Failed to parse ZIP archive {:?}", archive_path))?;

        runtime.create_dir_all(extract_to)?;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            let Some(relative) = entry.enclosed_name() else {
                debug!("Skipping entry with unsafe path {:?}", entry.name());
                continue;
            };
            let full_path = extract_to.join(relative);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
                continue;
            }
            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            let mut dest = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest)
                .with_context(|| format!("Failed to extract {:?}", full_path))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        }
        Ok(())
    }
}
