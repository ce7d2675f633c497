//! Asset and class identity
//!
//! An asset is addressed by its virtual path (`/Game/Folder/Asset`). Its
//! generated class is derived from that path by the host's naming convention
//! (`/Game/Folder/Asset.Asset_C`), so the path is canonical and the class name
//! is always recomputed from it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Mount point every migratable asset lives under
pub const GAME_ROOT: &str = "/Game/";

/// Suffix the host appends to a Blueprint's generated class
pub const GENERATED_CLASS_SUFFIX: &str = "_C";

/// Errors raised while parsing paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path is empty
    #[error("path is empty")]
    Empty,

    /// Asset path is not rooted at `/Game/`
    #[error("asset path must start with {GAME_ROOT}: {0}")]
    NotUnderGameRoot(String),

    /// Path contains an empty segment (`//`) or ends with `/`
    #[error("path contains an empty segment: {0}")]
    EmptySegment(String),

    /// Path contains characters the host refuses in package names
    #[error("path contains invalid character {ch:?}: {path}")]
    InvalidCharacter {
        /// Offending path
        path: String,
        /// First invalid character
        ch: char,
    },
}

/// Canonical virtual path of an asset, e.g. `/Game/Blueprints/B_Door`
///
/// Object-path spellings (`/Game/Blueprints/B_Door.B_Door`) and generated
/// class spellings (`/Game/Blueprints/B_Door.B_Door_C`) normalise to the
/// package path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetPath(String);

impl AssetPath {
    /// Parse and normalise an asset path
    ///
    /// # Errors
    /// Returns [`PathError`] if the path is empty, not under `/Game/`, or malformed.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        if !trimmed.starts_with(GAME_ROOT) {
            return Err(PathError::NotUnderGameRoot(trimmed.to_string()));
        }

        // Drop the object name of an object path: /Game/A/B.B -> /Game/A/B
        let package = match trimmed.rsplit_once('/') {
            Some((dir, leaf)) => match leaf.split_once('.') {
                Some((name, _object)) => format!("{dir}/{name}"),
                None => trimmed.to_string(),
            },
            None => trimmed.to_string(),
        };

        if package[1..].split('/').any(str::is_empty) {
            return Err(PathError::EmptySegment(package));
        }
        if let Some(ch) = package
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '"' | '\'' | ':' | '*' | '?' | '<' | '>' | '|' | '\\'))
        {
            return Err(PathError::InvalidCharacter { path: package, ch });
        }

        Ok(Self(package))
    }

    /// Path as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment (the asset name)
    #[inline]
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Folder containing the asset (without trailing slash)
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Object path form (`/Game/A/B.B`)
    #[inline]
    #[must_use]
    pub fn object_path(&self) -> String {
        format!("{}.{}", self.0, self.leaf())
    }

    /// Class the host generates when this asset compiles
    #[inline]
    #[must_use]
    pub fn generated_class(&self) -> ClassPath {
        ClassPath(format!("{}.{}{GENERATED_CLASS_SUFFIX}", self.0, self.leaf()))
    }

    /// Segments below `/Game/`, used to lay the asset out on disk
    pub fn relative_segments(&self) -> impl Iterator<Item = &str> {
        self.0[GAME_ROOT.len()..].split('/')
    }
}

impl Display for AssetPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetPath> for String {
    fn from(value: AssetPath) -> Self {
        value.0
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fully qualified class name
///
/// Native classes look like `/Script/Module.ClassName`; Blueprint generated
/// classes look like `/Game/Folder/Asset.Asset_C`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassPath(String);

impl ClassPath {
    /// Parse a class path
    ///
    /// A bare asset path (`/Game/A/B`) is accepted and resolved to that
    /// asset's generated class.
    ///
    /// # Errors
    /// Returns [`PathError`] if the name is empty or contains whitespace.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(ch) = trimmed.chars().find(|c| c.is_whitespace()) {
            return Err(PathError::InvalidCharacter {
                path: trimmed.to_string(),
                ch,
            });
        }
        if trimmed.starts_with(GAME_ROOT) {
            let leaf = trimmed.rsplit('/').next().unwrap_or(trimmed);
            if !leaf.contains('.') {
                return Ok(AssetPath::parse(trimmed)?.generated_class());
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Class path as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a Blueprint generated class
    #[inline]
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.owning_asset().is_some()
    }

    /// Asset that generates this class, if it is a Blueprint generated class
    #[must_use]
    pub fn owning_asset(&self) -> Option<AssetPath> {
        if !self.0.starts_with(GAME_ROOT) || !self.0.ends_with(GENERATED_CLASS_SUFFIX) {
            return None;
        }
        let (package, _) = self.0.rsplit_once('.')?;
        AssetPath::parse(package).ok()
    }

    /// Class name without its package (`Actor` for `/Script/Engine.Actor`)
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit(['.', '/'])
            .next()
            .unwrap_or(&self.0)
    }
}

impl Display for ClassPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClassPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClassPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClassPath> for String {
    fn from(value: ClassPath) -> Self {
        value.0
    }
}
