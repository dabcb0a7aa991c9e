pub mod archive;
pub mod commands;
pub mod context;
pub mod download;
pub mod game;
pub mod http;
pub mod package;
pub mod platform;
pub mod remote;
pub mod runtime;
pub mod transaction;

/// Fakes and fixtures shared by unit tests.
#[cfg(test)]
pub mod test_utils {
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use semver::Version;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Write};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use zip::ZipWriter;
    use zip::write::FileOptions;

    use crate::game::GameInstance;
    use crate::package::{
        LocalPackage, LocalPackages, LogFn, Package, PackageMetadata, PackageType,
        RemotePackage, RemotePackages, VersionRange,
    };
    use crate::remote::InstallError;
    use crate::transaction::{Phase, Progress, TransactionObserver};

    /// Zip archive holding `files` as `(name, contents)`.
    pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<()> = FileOptions::default();
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn write_zip(path: &Path, files: &[(&str, &str)]) {
        std::fs::write(path, zip_bytes(files)).unwrap();
    }

    /// Ordered record of side effects performed by fakes.
    #[derive(Clone, Default)]
    pub struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    fn metadata(name: &str, version: &str) -> PackageMetadata {
        PackageMetadata {
            name: name.to_string(),
            package_type: PackageType::Mod,
            description: String::new(),
            version: Version::parse(version).unwrap(),
            dependencies: BTreeMap::new(),
        }
    }

    pub struct FakeLocal {
        metadata: PackageMetadata,
        journal: Journal,
        fail: bool,
    }

    impl FakeLocal {
        pub fn new(name: &str, version: &str) -> Self {
            Self {
                metadata: metadata(name, version),
                journal: Journal::default(),
                fail: false,
            }
        }

        pub fn depends(mut self, dependency: &str, range: &str) -> Self {
            self.metadata
                .dependencies
                .insert(dependency.to_string(), VersionRange::parse(range).unwrap());
            self
        }

        pub fn kind(mut self, package_type: PackageType) -> Self {
            self.metadata.package_type = package_type;
            self
        }

        pub fn journal(mut self, journal: &Journal) -> Self {
            self.journal = journal.clone();
            self
        }

        /// Make `remove` fail after recording the attempt.
        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        pub fn into_local(self) -> Arc<dyn LocalPackage> {
            Arc::new(self)
        }
    }

    impl Package for FakeLocal {
        fn metadata(&self) -> &PackageMetadata {
            &self.metadata
        }
    }

    impl LocalPackage for FakeLocal {
        fn remove(&self) -> Result<()> {
            self.journal.push(format!("remove {}", self.metadata.name));
            if self.fail {
                bail!("permission denied");
            }
            Ok(())
        }
    }

    pub struct FakeRemote {
        metadata: PackageMetadata,
        journal: Journal,
        fail: bool,
    }

    impl FakeRemote {
        pub fn new(name: &str, version: &str) -> Self {
            Self {
                metadata: metadata(name, version),
                journal: Journal::default(),
                fail: false,
            }
        }

        pub fn depends(mut self, dependency: &str, range: &str) -> Self {
            self.metadata
                .dependencies
                .insert(dependency.to_string(), VersionRange::parse(range).unwrap());
            self
        }

        pub fn kind(mut self, package_type: PackageType) -> Self {
            self.metadata.package_type = package_type;
            self
        }

        pub fn describe(mut self, description: &str) -> Self {
            self.metadata.description = description.to_string();
            self
        }

        pub fn journal(mut self, journal: &Journal) -> Self {
            self.journal = journal.clone();
            self
        }

        /// Make `install` fail as if every method failed.
        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        pub fn into_remote(self) -> Arc<dyn RemotePackage> {
            Arc::new(self)
        }
    }

    impl Package for FakeRemote {
        fn metadata(&self) -> &PackageMetadata {
            &self.metadata
        }
    }

    #[async_trait]
    impl RemotePackage for FakeRemote {
        async fn install(&self, _game: &GameInstance, log: &LogFn<'_>) -> Result<()> {
            let name = &self.metadata.name;
            self.journal
                .push(format!("install {}@{}", name, self.metadata.version));
            log(&format!("installing {}", name));
            if self.fail {
                return Err(InstallError::AllMethodsFailed(name.clone()).into());
            }
            Ok(())
        }
    }

    pub fn locals(packages: Vec<FakeLocal>) -> LocalPackages {
        packages
            .into_iter()
            .map(|p| (p.metadata.name.clone(), p.into_local()))
            .collect()
    }

    pub fn remotes(packages: Vec<FakeRemote>) -> RemotePackages {
        packages
            .into_iter()
            .map(|p| (p.metadata.name.clone(), p.into_remote()))
            .collect()
    }

    /// Records observer calls as short strings such as `before update a`.
    #[derive(Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl TransactionObserver for RecordingObserver {
        fn progress(&self, progress: &Progress) {
            let phase = match progress.phase {
                Phase::Before => "before",
                Phase::After => "after",
            };
            let action = match (progress.removing, progress.installing) {
                (true, true) => "update",
                (false, true) => "install",
                _ => "remove",
            };
            self.events
                .lock()
                .unwrap()
                .push(format!("{} {} {}", phase, action, progress.name));
        }

        fn log(&self, text: &str) {
            self.events.lock().unwrap().push(format!("log {}", text));
        }

        fn warn(&self, package: &str, cause: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("warn {}: {}", package, cause));
        }
    }
}
