use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    Forge,
    #[serde(rename = "neoforge")]
    NeoForge,
    Fabric,
    #[serde(rename = "legacyfabric")]
    LegacyFabric,
    Quilt,
}

impl LoaderType {
    pub fn display_name(self) -> &'static str {
        match self {
            LoaderType::Forge => "Forge",
            LoaderType::NeoForge => "NeoForge",
            LoaderType::Fabric => "Fabric",
            LoaderType::LegacyFabric => "LegacyFabric",
            LoaderType::Quilt => "Quilt",
        }
    }
}

impl fmt::Display for LoaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            LoaderType::Forge => "forge",
            LoaderType::NeoForge => "neoforge",
            LoaderType::Fabric => "fabric",
            LoaderType::LegacyFabric => "legacyfabric",
            LoaderType::Quilt => "quilt",
        };
        f.write_str(key)
    }
}

/// Which loader build to install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BuildSelector {
    #[default]
    Latest,
    Recommended,
    Literal(String),
}

impl BuildSelector {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "latest" => BuildSelector::Latest,
            "recommended" => BuildSelector::Recommended,
            other => BuildSelector::Literal(other.to_string()),
        }
    }
}

impl fmt::Display for BuildSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSelector::Latest => f.write_str("latest"),
            BuildSelector::Recommended => f.write_str("recommended"),
            BuildSelector::Literal(b) => f.write_str(b),
        }
    }
}

impl Serialize for BuildSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BuildSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(BuildSelector::parse(&raw))
    }
}

/// Everything a loader installer needs from the vanilla side.
#[derive(Debug, Clone)]
pub struct LoaderRequest {
    pub loader_type: LoaderType,
    pub minecraft_version: String,
    pub build: BuildSelector,
    pub java_path: PathBuf,
    pub minecraft_jar_path: PathBuf,
    pub minecraft_json_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_keywords_and_literals() {
        assert_eq!(BuildSelector::parse("latest"), BuildSelector::Latest);
        assert_eq!(BuildSelector::parse("recommended"), BuildSelector::Recommended);
        assert_eq!(
            BuildSelector::parse("0.15.7"),
            BuildSelector::Literal("0.15.7".into())
        );
        assert_eq!(
            serde_json::to_string(&BuildSelector::Recommended).unwrap(),
            "\"recommended\""
        );
    }

    #[test]
    fn loader_type_keys_are_lowercase() {
        assert_eq!(LoaderType::LegacyFabric.to_string(), "legacyfabric");
        let parsed: LoaderType = serde_json::from_str("\"neoforge\"").unwrap();
        assert_eq!(parsed, LoaderType::NeoForge);
    }
}
