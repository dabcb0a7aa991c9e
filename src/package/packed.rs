//! Packed (`.ccmod`) packages: a zip archive with `package.json` at its root.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::RawMetadata;
use crate::runtime::Runtime;

pub const PACKED_EXTENSION: &str = "ccmod";

/// Returns true if the path names a packed package file.
pub fn is_packed_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKED_EXTENSION))
}

/// Read the unverified metadata embedded in a packed package.
#[tracing::instrument(skip(runtime))]
pub fn read_packed_metadata(runtime: &dyn Runtime, path: &Path) -> Result<RawMetadata> {
    let mut reader = runtime
        .open(path)
        .with_context(|| format!("Failed to open packed mod {:?}", path))?;

    // ZipArchive needs Read + Seek
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read packed mod {:?}", path))?;

    let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
        .with_context(|| format!("Packed mod {:?} is not a valid archive", path))?;
    let entry = archive.by_name("package.json").map_err(|_| {
        anyhow::anyhow!(
            "Unable to find package.json in packed (.ccmod) mod: {}",
            path.display()
        )
    })?;

    Ok(RawMetadata::from_reader(entry)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::test_utils::write_zip;
    use tempfile::tempdir;

    #[test]
    fn test_is_packed_file() {
        assert!(is_packed_file(Path::new("mods/a.ccmod")));
        assert!(is_packed_file(Path::new("A.CCMOD")));
        assert!(!is_packed_file(Path::new("a.zip")));
        assert!(!is_packed_file(Path::new("ccmod")));
    }

    #[test]
    fn test_read_packed_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.ccmod");
        write_zip(
            &path,
            &[
                ("package.json", r#"{"name": "hello", "version": "1.0.0"}"#),
                ("main.js", "// hi"),
            ],
        );

        let raw = read_packed_metadata(&RealRuntime, &path).unwrap();
        assert_eq!(raw.name.as_deref(), Some("hello"));
        assert_eq!(raw.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_read_packed_metadata_without_package_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.ccmod");
        write_zip(&path, &[("main.js", "// hi")]);

        let err = read_packed_metadata(&RealRuntime, &path).unwrap_err();
        assert!(err.to_string().contains("Unable to find package.json"));
    }

    #[test]
    fn test_read_packed_metadata_not_a_zip() {
        let mut runtime = MockRuntime::new();

        // Open returns plain text instead of a zip
        runtime
            .expect_open()
            .returning(|_| Ok(Box::new(std::io::Cursor::new(b"plain text".to_vec()))));

        let result = read_packed_metadata(&runtime, Path::new("/mods/bad.ccmod"));
        assert!(result.is_err());
    }
}
