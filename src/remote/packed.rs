use anyhow::{Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::game::GameInstance;
use crate::package::{
    LogFn, Package, PackageMetadata, PackageType, RemotePackage, read_packed_metadata,
};
use crate::runtime::Runtime;

use super::method::packed_target;

/// A `.ccmod` file given directly by the user.
#[derive(Debug)]
pub struct PackedRemotePackage {
    location: PathBuf,
    metadata: PackageMetadata,
}

impl PackedRemotePackage {
    /// Read and verify the metadata of a packed file.
    pub fn open(runtime: &dyn Runtime, location: &Path) -> Result<Self> {
        let raw = read_packed_metadata(runtime, location)?;
        let metadata = PackageMetadata::try_from(raw)?;
        Ok(Self {
            location: location.to_path_buf(),
            metadata,
        })
    }
}

impl Package for PackedRemotePackage {
    fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }
}

#[async_trait]
impl RemotePackage for PackedRemotePackage {
    async fn install(&self, game: &GameInstance, log: &LogFn<'_>) -> Result<()> {
        if self.metadata.package_type != PackageType::Mod {
            bail!(
                "Unable to handle package type {} as a .ccmod",
                self.metadata.package_type
            );
        }
        let runtime = game.runtime();
        let name = &self.metadata.name;
        let Some(dir) = game.package_dir(PackageType::Mod, name) else {
            bail!("No install location for Mod '{}'", name);
        };
        let dest = packed_target(&dir);
        log(&format!("Copying {} to {}", self.location.display(), dest.display()));
        runtime.create_dir_all(&game.mods_dir())?;
        runtime.copy(&self.location, &dest)?;
        Ok(())
    }
}
