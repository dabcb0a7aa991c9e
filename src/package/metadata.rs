//! Package metadata as read from `package.json` and from the catalog.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::version::{RangeError, VersionRange};

/// Packages that ship as part of CCLoader's own UI. They are treated as base
/// packages with no dependencies, otherwise their dependency on the loader
/// would loop back onto it.
const LOADER_ASSISTANTS: [&str; 3] = ["Simplify", "CCLoader display version", "OpenDevTools"];

pub const LOADER_ASSISTANT_DESCRIPTION: &str = "Assistant to CCLoader.";

/// Errors raised while verifying metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("Unable to parse package metadata: {0}")]
    Parse(String),
    #[error("Package metadata has no name")]
    MissingName,
    #[error("Package name '{0}' cannot be used as a file name")]
    InvalidName(String),
    #[error("Package '{0}' has no version")]
    MissingVersion(String),
    #[error("Package '{name}' has invalid version '{version}': {reason}")]
    InvalidVersion {
        name: String,
        version: String,
        reason: String,
    },
    #[error("Package '{name}' has unknown type '{kind}'")]
    UnknownType { name: String, kind: String },
    #[error("Package '{name}' has an invalid dependency on '{dependency}': {source}")]
    InvalidDependency {
        name: String,
        dependency: String,
        source: RangeError,
    },
}

/// True if `name` can stand as a single file name below a package directory.
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
}

/// The kind of a package. Ordered: base packages sort first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Hidden infrastructure such as the loader itself.
    Base,
    #[default]
    Mod,
    Tool,
}

impl PackageType {
    pub const ALL: [PackageType; 3] = [PackageType::Base, PackageType::Mod, PackageType::Tool];

    pub fn plural(&self) -> &'static str {
        match self {
            PackageType::Base => "Base Packages",
            PackageType::Mod => "Mods",
            PackageType::Tool => "Tools",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageType::Base => write!(f, "Base"),
            PackageType::Mod => write!(f, "Mod"),
            PackageType::Tool => write!(f, "Tool"),
        }
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(PackageType::Base),
            "mod" => Ok(PackageType::Mod),
            "tool" => Ok(PackageType::Tool),
            _ => Err(s.to_string()),
        }
    }
}

/// Metadata exactly as found on disk, before verification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "ccmodType")]
    pub ccmod_type: Option<String>,
    /// Either a plain string or a map of locale to string.
    pub description: Option<serde_json::Value>,
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "ccmodDependencies")]
    pub ccmod_dependencies: Option<BTreeMap<String, String>>,
}

impl RawMetadata {
    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(text).map_err(|e| MetadataError::Parse(e.to_string()))
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, MetadataError> {
        serde_json::from_reader(reader).map_err(|e| MetadataError::Parse(e.to_string()))
    }
}

/// Verified package metadata. The name must equal the key under which the
/// package is stored in any package map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(rename = "ccmodType")]
    pub package_type: PackageType,
    pub description: String,
    pub version: Version,
    #[serde(rename = "ccmodDependencies")]
    pub dependencies: BTreeMap<String, VersionRange>,
}

impl PackageMetadata {
    /// Parse and verify a `package.json` document.
    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        RawMetadata::from_json(text)?.try_into()
    }

    /// Apply the local-package rewrite for the loader's own UI components.
    ///
    /// Applying it again to already finished metadata changes nothing.
    pub fn finish_local(mut self) -> Self {
        if LOADER_ASSISTANTS.contains(&self.name.as_str()) {
            self.package_type = PackageType::Base;
            self.description = LOADER_ASSISTANT_DESCRIPTION.to_string();
            self.dependencies.clear();
        }
        self
    }
}

impl TryFrom<RawMetadata> for PackageMetadata {
    type Error = MetadataError;

    fn try_from(raw: RawMetadata) -> Result<Self, Self::Error> {
        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(MetadataError::MissingName)?;
        if !is_valid_name(&name) {
            return Err(MetadataError::InvalidName(name));
        }

        let version_text = raw
            .version
            .ok_or_else(|| MetadataError::MissingVersion(name.clone()))?;
        let version =
            Version::parse(version_text.trim()).map_err(|e| MetadataError::InvalidVersion {
                name: name.clone(),
                version: version_text.clone(),
                reason: e.to_string(),
            })?;

        let package_type = match raw.ccmod_type {
            Some(kind) => kind
                .parse::<PackageType>()
                .map_err(|kind| MetadataError::UnknownType {
                    name: name.clone(),
                    kind,
                })?,
            None => PackageType::default(),
        };

        // ccmodDependencies supersedes the legacy field when both exist.
        let mut dependencies = BTreeMap::new();
        for (dependency, range) in raw.ccmod_dependencies.or(raw.dependencies).unwrap_or_default()
        {
            let range =
                VersionRange::parse(&range).map_err(|source| MetadataError::InvalidDependency {
                    name: name.clone(),
                    dependency: dependency.clone(),
                    source,
                })?;
            dependencies.insert(dependency, range);
        }

        Ok(Self {
            name,
            package_type,
            description: description_text(raw.description),
            version,
            dependencies,
        })
    }
}

fn description_text(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(text)) => text,
        Some(serde_json::Value::Object(map)) => map
            .get("en_US")
            .and_then(|v| v.as_str())
            .or_else(|| map.values().find_map(|v| v.as_str()))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_metadata() {
        let meta = PackageMetadata::from_json(
            r#"{
                "name": "CrossCode-Tweaks",
                "version": "1.2.0",
                "ccmodType": "mod",
                "description": "Small tweaks",
                "ccmodDependencies": { "ccloader": ">=2.0.0 <3.0.0" }
            }"#,
        )
        .unwrap();

        assert_eq!(meta.name, "CrossCode-Tweaks");
        assert_eq!(meta.package_type, PackageType::Mod);
        assert_eq!(meta.description, "Small tweaks");
        assert_eq!(meta.version, Version::new(1, 2, 0));
        assert_eq!(meta.dependencies["ccloader"].as_str(), ">=2.0.0 <3.0.0");
    }

    #[test]
    fn test_type_defaults_to_mod() {
        let meta = PackageMetadata::from_json(r#"{"name": "a", "version": "0.1.0"}"#).unwrap();
        assert_eq!(meta.package_type, PackageType::Mod);
        assert!(meta.dependencies.is_empty());
        assert_eq!(meta.description, "");
    }

    #[test]
    fn test_ccmod_dependencies_win_over_legacy_field() {
        let meta = PackageMetadata::from_json(
            r#"{
                "name": "a",
                "version": "0.1.0",
                "dependencies": { "old": "1.0.0" },
                "ccmodDependencies": { "new": "^2.0.0" }
            }"#,
        )
        .unwrap();
        assert!(meta.dependencies.contains_key("new"));
        assert!(!meta.dependencies.contains_key("old"));
    }

    #[test]
    fn test_legacy_dependencies_used_when_alone() {
        let meta = PackageMetadata::from_json(
            r#"{"name": "a", "version": "0.1.0", "dependencies": { "old": "1.0.0" }}"#,
        )
        .unwrap();
        assert!(meta.dependencies.contains_key("old"));
    }

    #[test]
    fn test_localized_description() {
        let meta = PackageMetadata::from_json(
            r#"{"name": "a", "version": "0.1.0", "description": {"de_DE": "Hallo", "en_US": "Hello"}}"#,
        )
        .unwrap();
        assert_eq!(meta.description, "Hello");
    }

    #[test]
    fn test_verification_errors() {
        assert_eq!(
            PackageMetadata::from_json(r#"{"version": "1.0.0"}"#),
            Err(MetadataError::MissingName)
        );
        assert_eq!(
            PackageMetadata::from_json(r#"{"name": "", "version": "1.0.0"}"#),
            Err(MetadataError::MissingName)
        );
        assert_eq!(
            PackageMetadata::from_json(r#"{"name": "a"}"#),
            Err(MetadataError::MissingVersion("a".into()))
        );
        assert!(matches!(
            PackageMetadata::from_json(r#"{"name": "a", "version": "one"}"#),
            Err(MetadataError::InvalidVersion { .. })
        ));
        assert_eq!(
            PackageMetadata::from_json(r#"{"name": "a", "version": "1.0.0", "ccmodType": "plugin"}"#),
            Err(MetadataError::UnknownType {
                name: "a".into(),
                kind: "plugin".into()
            })
        );
        assert!(matches!(
            PackageMetadata::from_json(
                r#"{"name": "a", "version": "1.0.0", "ccmodDependencies": {"b": ">=x.1"}}"#
            ),
            Err(MetadataError::InvalidDependency { .. })
        ));
        assert!(matches!(
            PackageMetadata::from_json(
                r#"{"name": "a", "version": "1.0.0", "ccmodDependencies": {"b": "1.18446744073709551615"}}"#
            ),
            Err(MetadataError::InvalidDependency { .. })
        ));
        assert!(matches!(
            PackageMetadata::from_json("not json"),
            Err(MetadataError::Parse(_))
        ));
    }

    #[test]
    fn test_names_must_be_plain_file_names() {
        for name in ["../escaped", "/abs", "a/b", "a\\b", "..", ".", "C:evil"] {
            let json = serde_json::json!({"name": name, "version": "1.0.0"}).to_string();
            assert_eq!(
                PackageMetadata::from_json(&json),
                Err(MetadataError::InvalidName(name.to_string())),
                "{name}"
            );
        }
        assert!(is_valid_name("CCLoader display version"));
        assert!(is_valid_name("cc-ru.v2"));
    }

    #[test]
    fn test_finish_local_rewrites_loader_assistants_once() {
        let meta = PackageMetadata::from_json(
            r#"{"name": "Simplify", "version": "2.1.0", "description": "x",
                "ccmodDependencies": {"ccloader": "^2.0.0"}}"#,
        )
        .unwrap();

        let finished = meta.finish_local();
        assert_eq!(finished.package_type, PackageType::Base);
        assert_eq!(finished.description, LOADER_ASSISTANT_DESCRIPTION);
        assert!(finished.dependencies.is_empty());

        let again = finished.clone().finish_local();
        assert_eq!(again, finished);
    }

    #[test]
    fn test_finish_local_leaves_ordinary_packages_alone() {
        let meta = PackageMetadata::from_json(
            r#"{"name": "a", "version": "1.0.0", "ccmodDependencies": {"ccloader": "^2.0.0"}}"#,
        )
        .unwrap();
        assert_eq!(meta.clone().finish_local(), meta);
    }

    #[test]
    fn test_json_round_trip() {
        let meta = PackageMetadata::from_json(
            r#"{"name": "tool-x", "version": "3.0.0-rc.1+build.7", "ccmodType": "tool",
                "description": "A tool", "ccmodDependencies": {"a": ">=1.0.0", "b": "^2.1"}}"#,
        )
        .unwrap();

        let encoded = serde_json::to_string(&meta).unwrap();
        let decoded = PackageMetadata::from_json(&encoded).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_package_type_order_and_display() {
        assert!(PackageType::Base < PackageType::Mod);
        assert!(PackageType::Mod < PackageType::Tool);
        assert_eq!(PackageType::Base.plural(), "Base Packages");
        assert_eq!(PackageType::Tool.to_string(), "Tool");
        assert_eq!("TOOL".parse::<PackageType>(), Ok(PackageType::Tool));
    }
}
