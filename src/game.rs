//! A game installation and the view of what is installed in it.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::package::{
    GamePlugin, LoaderPlugin, LocalPackage, LocalPackages, ModlikePlugin, PackageType,
    is_valid_name,
};
use crate::runtime::Runtime;

/// Finds one kind of installed package.
pub trait LocalPackagePlugin: Send + Sync {
    /// Everything this plugin can find right now. Entries that fail to load
    /// are left out.
    fn packages(&self) -> Vec<Arc<dyn LocalPackage>>;
}

pub struct GameInstance {
    base: PathBuf,
    runtime: Arc<dyn Runtime>,
    plugins: Vec<Box<dyn LocalPackagePlugin>>,
}

impl GameInstance {
    /// A game with no discovery plugins.
    pub fn new(runtime: Arc<dyn Runtime>, base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            runtime,
            plugins: Vec::new(),
        }
    }

    /// A game that finds the game itself, the loader, mods and tools.
    pub fn with_default_plugins(runtime: Arc<dyn Runtime>, base: impl Into<PathBuf>) -> Self {
        let mut game = Self::new(runtime, base);
        let base = game.base.clone();
        let runtime = Arc::clone(&game.runtime);
        game.add_plugin(GamePlugin::new(Arc::clone(&runtime), base.clone()));
        game.add_plugin(LoaderPlugin::new(Arc::clone(&runtime), base));
        game.add_plugin(ModlikePlugin::new(Arc::clone(&runtime), game.mods_dir()));
        game.add_plugin(ModlikePlugin::new(runtime, game.tools_dir()));
        game
    }

    pub fn add_plugin(&mut self, plugin: impl LocalPackagePlugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.base.join("assets/mods")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.base.join("assets/tools")
    }

    /// Directory into which an unpacked package of this type and name goes,
    /// or `None` when the type has no fixed home or the name is not a plain
    /// file name.
    pub fn package_dir(&self, package_type: PackageType, name: &str) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }
        match package_type {
            PackageType::Mod => Some(self.mods_dir().join(name)),
            PackageType::Tool => Some(self.tools_dir().join(name)),
            PackageType::Base => None,
        }
    }

    /// Scan for installed packages. When two plugins report the same name,
    /// the earlier plugin wins.
    #[tracing::instrument(skip(self), fields(base = ?self.base))]
    pub fn packages(&self) -> LocalPackages {
        let mut packages = LocalPackages::new();
        for plugin in &self.plugins {
            for package in plugin.packages() {
                let name = package.metadata().name.clone();
                if packages.contains_key(&name) {
                    debug!("Ignoring duplicate package {}", name);
                    continue;
                }
                packages.insert(name, package);
            }
        }
        packages
    }
}
