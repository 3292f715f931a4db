//! Target framework monikers

use std::fmt;

use super::properties::PropertyValueCollector;

/// One framework a project builds for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameworkReference {
    /// Short moniker as written, e.g. `net8.0-windows`
    pub short_name: String,
    /// e.g. `.NETCoreApp`
    pub identifier: String,
    /// Dotted version without the `v` prefix
    pub version: String,
    pub platform: Option<String>,
}

pub const NET_FRAMEWORK: &str = ".NETFramework";
pub const NET_CORE_APP: &str = ".NETCoreApp";
pub const NET_STANDARD: &str = ".NETStandard";

impl FrameworkReference {
    /// Parse a short moniker such as `net8.0`, `netstandard2.0` or `net472`.
    pub fn parse(short_name: &str) -> Option<Self> {
        let short_name = short_name.trim();
        let lower = short_name.to_ascii_lowercase();
        let (moniker, platform) = match lower.split_once('-') {
            Some((moniker, platform)) if !platform.is_empty() => (moniker, Some(platform.to_string())),
            _ => (lower.as_str(), None),
        };

        let (identifier, raw_version) = if let Some(v) = moniker.strip_prefix("netstandard") {
            (NET_STANDARD, v)
        } else if let Some(v) = moniker.strip_prefix("netcoreapp") {
            (NET_CORE_APP, v)
        } else if let Some(v) = moniker.strip_prefix("net") {
            // net5.0 and later are .NET Core; net48 and friends are .NET Framework
            let major = v.split('.').next().and_then(|m| m.parse::<u32>().ok());
            match major {
                Some(major) if v.contains('.') && major >= 5 => (NET_CORE_APP, v),
                _ => (NET_FRAMEWORK, v),
            }
        } else {
            return None;
        };

        let version = expand_version(raw_version)?;
        Some(Self {
            short_name: short_name.to_string(),
            identifier: identifier.to_string(),
            version,
            platform,
        })
    }

    /// Build from `TargetFrameworkIdentifier` and `TargetFrameworkVersion`.
    pub fn from_identifier(identifier: &str, version: &str) -> Option<Self> {
        let version = expand_version(version.trim().trim_start_matches(['v', 'V']))?;
        let identifier = identifier.trim();
        let prefix = if identifier.eq_ignore_ascii_case(NET_STANDARD) {
            "netstandard"
        } else if identifier.eq_ignore_ascii_case(NET_CORE_APP) {
            "netcoreapp"
        } else {
            "net"
        };
        let short_name = if prefix == "net" {
            format!("net{}", version.replace('.', ""))
        } else {
            format!("{prefix}{version}")
        };
        Some(Self {
            short_name,
            identifier: identifier.to_string(),
            version,
            platform: None,
        })
    }

    /// Long form used by NuGet, e.g. `.NETCoreApp,Version=v8.0`.
    pub fn moniker(&self) -> String {
        format!("{},Version=v{}", self.identifier, self.version)
    }
}

impl fmt::Display for FrameworkReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name)
    }
}

/// `472` becomes `4.7.2`; dotted versions are kept.
fn expand_version(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if raw.contains('.') {
        let valid = raw.split('.').all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
        return valid.then(|| raw.to_string());
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: Vec<String> = raw.chars().map(String::from).collect();
    let mut version = digits.join(".");
    if digits.len() == 1 {
        version.push_str(".0");
    }
    Some(version)
}

/// Frameworks from the observed `TargetFramework(s)` values, falling back to
/// `TargetFrameworkIdentifier` / `TargetFrameworkVersion`.
pub fn target_frameworks(values: &PropertyValueCollector) -> Vec<FrameworkReference> {
    let mut frameworks: Vec<FrameworkReference> = Vec::new();
    let monikers = values
        .values("TargetFrameworks")
        .iter()
        .chain(values.values("TargetFramework"))
        .flat_map(|value| value.split(';'))
        .filter(|value| !value.contains("$(") && !value.trim().is_empty());
    for moniker in monikers {
        if let Some(framework) = FrameworkReference::parse(moniker)
            && !frameworks.contains(&framework)
        {
            frameworks.push(framework);
        }
    }
    if !frameworks.is_empty() {
        return frameworks;
    }

    let identifiers = values.values("TargetFrameworkIdentifier");
    let default_identifier = [NET_FRAMEWORK.to_string()];
    let identifiers = if identifiers.is_empty() { &default_identifier[..] } else { identifiers };
    for version in values.values("TargetFrameworkVersion") {
        for identifier in identifiers {
            if let Some(framework) = FrameworkReference::from_identifier(identifier, version)
                && !frameworks.contains(&framework)
            {
                frameworks.push(framework);
            }
        }
    }
    frameworks
}

/// Property names that determine [`target_frameworks`].
pub const FRAMEWORK_PROPERTIES: [&str; 4] = [
    "TargetFramework",
    "TargetFrameworks",
    "TargetFrameworkIdentifier",
    "TargetFrameworkVersion",
];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("net8.0", NET_CORE_APP, "8.0", None)]
    #[case("net8.0-windows", NET_CORE_APP, "8.0", Some("windows"))]
    #[case("netstandard2.0", NET_STANDARD, "2.0", None)]
    #[case("netcoreapp3.1", NET_CORE_APP, "3.1", None)]
    #[case("net472", NET_FRAMEWORK, "4.7.2", None)]
    #[case("net48", NET_FRAMEWORK, "4.8", None)]
    fn test_parse_short_names(
        #[case] text: &str,
        #[case] identifier: &str,
        #[case] version: &str,
        #[case] platform: Option<&str>,
    ) {
        let framework = FrameworkReference::parse(text).unwrap();
        assert_eq!(framework.identifier, identifier);
        assert_eq!(framework.version, version);
        assert_eq!(framework.platform.as_deref(), platform);
        assert_eq!(framework.short_name, text);
    }

    #[rstest]
    #[case("")]
    #[case("uap")]
    #[case("net4x")]
    #[case("portable-net45")]
    fn test_parse_rejects(#[case] text: &str) {
        assert!(FrameworkReference::parse(text).is_none());
    }

    #[test]
    fn test_from_identifier() {
        let framework = FrameworkReference::from_identifier(".NETFramework", "v4.7.2").unwrap();
        assert_eq!(framework.short_name, "net472");
        assert_eq!(framework.moniker(), ".NETFramework,Version=v4.7.2");
    }

    #[test]
    fn test_target_frameworks_from_values() {
        let mut values = PropertyValueCollector::new();
        values.watch_all(FRAMEWORK_PROPERTIES);
        values.add("TargetFrameworks", "net8.0;netstandard2.0;net8.0");
        let frameworks = target_frameworks(&values);
        assert_eq!(frameworks.len(), 2);
        assert_eq!(frameworks[1].identifier, NET_STANDARD);
    }

    #[test]
    fn test_target_frameworks_from_version() {
        let mut values = PropertyValueCollector::new();
        values.watch_all(FRAMEWORK_PROPERTIES);
        values.add("TargetFrameworkVersion", "v4.6.1");
        let frameworks = target_frameworks(&values);
        assert_eq!(frameworks.len(), 1);
        assert_eq!(frameworks[0].short_name, "net461");
    }
}
