use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::path::{Component, Path};
use tar::{Archive, EntryType};

use super::ArchiveExtractor;

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract(
        &self,
        runtime: &dyn Runtime,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting {:?} to {:?}", archive_path, extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        let mut archive = Archive::new(GzDecoder::new(file));

        runtime.create_dir_all(extract_to)?;
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read tar archive {:?}", archive_path))?
        {
            let mut entry = entry.context("Failed to read tar entry")?;
            let relative = entry.path().context("Invalid tar entry path")?.into_owned();
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                debug!("Skipping entry with unsafe path {:?}", relative);
                continue;
            }
            let full_path = extract_to.join(&relative);

            match entry.header().entry_type() {
                EntryType::Directory => runtime.create_dir_all(&full_path)?,
                EntryType::Regular | EntryType::Continuous => {
                    if let Some(parent) = full_path.parent() {
                        runtime.create_dir_all(parent)?;
                    }
                    let mut dest = runtime.create_file(&full_path)?;
                    std::io::copy(&mut entry, &mut dest)
                        .with_context(|| format!("Failed to extract {:?}", full_path))?;

                    #[cfg(unix)]
                    if let Ok(mode) = entry.header().mode()
                        && let Err(e) = runtime.set_permissions(&full_path, mode)
                    {
                        debug!("Failed to set permissions on {:?}: {}", full_path, e);
                    }
                }
                other => debug!("Skipping {:?} entry {:?}", other, relative),
            }
        }
        Ok(())
    }
}
