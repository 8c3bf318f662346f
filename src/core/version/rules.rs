// ─── Platform Rules ───
// OS / arch / feature rule evaluation shared by libraries and arguments.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl LibraryRule {
    /// No launcher features are enabled during installation, so a rule that
    /// requires any feature never matches.
    fn matches_current_platform(&self) -> bool {
        if let Some(features) = &self.features {
            if features.values().any(|v| v.as_bool() == Some(true)) {
                return false;
            }
        }

        let Some(os) = &self.os else {
            return true;
        };
        let name_ok = os.name.as_deref().map_or(true, |n| n == current_os_name());
        let arch_ok = os.arch.as_deref().map_or(true, |a| a == current_arch_name());
        name_ok && arch_ok
    }
}

/// Mojang rule semantics: no rules means allowed; otherwise start disallowed
/// and let the last matching rule decide.
pub fn rules_allow(rules: Option<&[LibraryRule]>) -> bool {
    let Some(rules) = rules else {
        return true;
    };

    let mut allowed = false;
    for rule in rules {
        if rule.matches_current_platform() {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

/// Get the Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// Arch as written in rules (`x86` means a 32-bit JVM).
pub fn current_arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm",
        _ => "x86_64",
    }
}

/// Value substituted for `${arch}` in native classifiers.
pub fn arch_bits() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}
