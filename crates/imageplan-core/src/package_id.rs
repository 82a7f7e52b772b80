use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SCHEME_PREFIX: &str = "pkg:/";

/// A package name pinned to one version, optionally qualified by the build
/// release it was published for.
///
/// Ordering questions are answered per package: two identifiers of different
/// packages are never successors of one another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    name: String,
    version: Version,
    build_release: Option<String>,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            build_release: None,
        }
    }

    /// Parses `name@version[,build_release]`, with an optional `pkg:/` prefix.
    ///
    /// Versions with fewer than three numeric components are padded with
    /// zeros, so `lib@1.5` reads as `lib@1.5.0`.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix(SCHEME_PREFIX).unwrap_or(trimmed);
        let (name, rest) = body
            .split_once('@')
            .ok_or_else(|| anyhow!("package identifier '{input}' is missing '@version'"))?;
        validate_name(name).with_context(|| format!("invalid package identifier '{input}'"))?;

        let (raw_version, build_release) = match rest.split_once(',') {
            Some((version, release)) => {
                let release = release.trim();
                if release.is_empty() {
                    return Err(anyhow!(
                        "package identifier '{input}' has an empty build release"
                    ));
                }
                (version, Some(release.to_string()))
            }
            None => (rest, None),
        };

        let version = parse_version(raw_version)
            .with_context(|| format!("invalid version in package identifier '{input}'"))?;

        Ok(Self {
            name: name.to_string(),
            version,
            build_release,
        })
    }

    /// Parses an identifier and fills in `default_release` when the input
    /// names no build release of its own.
    pub fn parse_with_build_release(input: &str, default_release: &str) -> anyhow::Result<Self> {
        Ok(Self::parse(input)?.or_build_release(default_release))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn build_release(&self) -> Option<&str> {
        self.build_release.as_deref()
    }

    pub fn with_build_release(mut self, release: impl Into<String>) -> Self {
        self.build_release = Some(release.into());
        self
    }

    pub fn or_build_release(self, release: &str) -> Self {
        if self.build_release.is_some() {
            return self;
        }
        self.with_build_release(release)
    }

    pub fn is_same_package(&self, other: &PackageId) -> bool {
        self.name == other.name
    }

    /// True when `self` is a strictly newer version of the same package.
    /// Build metadata and build release never make one identifier newer.
    pub fn is_successor(&self, other: &PackageId) -> bool {
        self.is_same_package(other)
            && self.version.cmp_precedence(&other.version) == std::cmp::Ordering::Greater
    }

    /// True when `self` is the same package at `other`'s version or newer.
    pub fn satisfies(&self, other: &PackageId) -> bool {
        self.is_same_package(other) && !other.is_successor(self)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME_PREFIX}{}@{}", self.name, self.version)?;
        if let Some(release) = &self.build_release {
            write!(f, ",{release}")?;
        }
        Ok(())
    }
}

impl FromStr for PackageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|err| serde::de::Error::custom(format!("{err:#}")))
    }
}

fn validate_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        return Err(anyhow!("package name must not be empty"));
    }
    if name.starts_with('.') {
        return Err(anyhow!("package name '{name}' must not start with '.'"));
    }
    if let Some(invalid) = name
        .chars()
        .find(|&ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '+')))
    {
        return Err(anyhow!(
            "package name '{name}' contains invalid character '{invalid}'"
        ));
    }
    Ok(())
}

fn parse_version(raw: &str) -> anyhow::Result<Version> {
    let raw = raw.trim();
    if let Ok(version) = Version::parse(raw) {
        return Ok(version);
    }

    let components: Vec<&str> = raw.split('.').collect();
    let numeric = components
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()));
    if !numeric || components.len() >= 3 {
        return Version::parse(raw).with_context(|| format!("'{raw}' is not a valid version"));
    }

    let mut padded = components;
    padded.resize(3, "0");
    Version::parse(&padded.join(".")).with_context(|| format!("'{raw}' is not a valid version"))
}
