// src/packages.rs
//! Agent package registry
//!
//! An exact-match table of `type -> dist -> vers -> arch -> PackageInfo`,
//! loaded once at startup from a package configuration file and read-only
//! afterwards. Lookups report which nesting level was missing so clients
//! get a precise "unsupported" diagnostic.
//!
//! Configuration format (TOML; JSON with the same shape is also accepted):
//!
//! ```toml
//! [[package]]
//! type = "linux"
//! dist = "Ubuntu"
//! vers = "16.04"
//! arch = "x86_64"
//! package_info = { package_file = "agent-1.0.0-1.ubuntu.16.04_amd64.deb" }
//! ```

use crate::error::{Error, Result};
use crate::resolver::{CandidateKey, Probe};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Field separator of the plain-text package line
pub const PLAIN_TEXT_SEPARATOR: &str = "%%";

/// Where the agent package for one platform lives
///
/// Either a direct download (`url` + `file`) or a `pkg` publisher
/// reference (`publisher_name`, `publisher_url`, `name`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(rename = "package_url", default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "package_file", default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(rename = "publisher_url", default, skip_serializing_if = "String::is_empty")]
    pub publisher_url: String,
    #[serde(rename = "publisher_name", default, skip_serializing_if = "String::is_empty")]
    pub publisher_name: String,
    #[serde(rename = "package_name", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl PackageInfo {
    /// Line parsed by the shell installer; never newline terminated
    pub fn to_plain_text(&self, pkg_based: bool) -> String {
        if pkg_based {
            [
                self.name.as_str(),
                self.publisher_name.as_str(),
                self.publisher_url.as_str(),
            ]
            .join(PLAIN_TEXT_SEPARATOR)
        } else {
            [self.url.as_str(), self.file.as_str()].join(PLAIN_TEXT_SEPARATOR)
        }
    }

    /// Full download location, when this is a direct download
    pub fn download_url(&self) -> Option<String> {
        if self.url.is_empty() || self.file.is_empty() {
            return None;
        }
        Some(format!("{}{}", self.url, self.file))
    }

    /// Strip the file name from the URL and force a trailing `/`
    fn normalize_url(&mut self, base_url: &str) {
        if self.file.is_empty() {
            return;
        }
        if self.url.is_empty() {
            self.url = base_url.to_string();
        }
        self.url = self.url.replace(&self.file, "");
        if !self.url.ends_with('/') {
            self.url.push('/');
        }
    }
}

/// One `[[package]]` entry
#[derive(Debug, Clone, Deserialize)]
struct PackageEntry {
    #[serde(rename = "type")]
    os_type: String,
    dist: String,
    vers: String,
    arch: String,
    #[serde(default)]
    package_info: PackageInfo,
}

#[derive(Debug, Deserialize)]
struct PackageFile {
    #[serde(default)]
    package: Vec<PackageEntry>,
}

type ArchMap = HashMap<String, PackageInfo>;
type VersionMap = HashMap<String, ArchMap>;
type DistroMap = HashMap<String, VersionMap>;

/// Immutable package lookup table
#[derive(Debug, Clone)]
pub struct PackageRegistry {
    supported: Vec<String>,
    list: HashMap<String, DistroMap>,
}

impl PackageRegistry {
    /// Load a registry file; `.json` files are parsed as JSON, anything else as TOML
    pub fn load(path: &Path, base_url: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let file: PackageFile = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))?
        };
        Self::from_entries(file.package, base_url)
    }

    /// Parse registry TOML from a string
    pub fn from_toml(content: &str, base_url: &str) -> Result<Self> {
        let file: PackageFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("parsing package configuration: {}", e)))?;
        Self::from_entries(file.package, base_url)
    }

    fn from_entries(entries: Vec<PackageEntry>, base_url: &str) -> Result<Self> {
        let mut list: HashMap<String, DistroMap> = HashMap::new();
        let mut supported = Vec::new();

        for entry in entries {
            let PackageEntry {
                os_type,
                dist,
                vers,
                arch,
                mut package_info,
            } = entry;

            if package_info.file.is_empty() && package_info.name.is_empty() {
                tracing::warn!(
                    os_type = %os_type,
                    dist = %dist,
                    vers = %vers,
                    arch = %arch,
                    "invalid package information - no file/name provided, ignoring"
                );
                continue;
            }

            package_info.normalize_url(base_url);
            supported.push(format!("{} {} {}", dist, vers, arch));
            tracing::debug!(os_type = %os_type, dist = %dist, vers = %vers, arch = %arch, "package added");

            list.entry(os_type.to_lowercase())
                .or_default()
                .entry(dist.to_lowercase())
                .or_default()
                .entry(vers)
                .or_default()
                .insert(arch, package_info);
        }

        if list.is_empty() {
            return Err(Error::Config("no valid packages found".to_string()));
        }

        Ok(Self { supported, list })
    }

    /// `"<dist> <vers> <arch>"` for every loaded entry, in file order
    pub fn list_supported(&self) -> &[String] {
        &self.supported
    }

    /// Look up the package for an exact platform
    ///
    /// Type and distro match case-insensitively; version and architecture
    /// must match exactly. Each missing level has its own error.
    pub fn get_package_info(
        &self,
        os_type: &str,
        distro: &str,
        version: &str,
        arch: &str,
    ) -> Result<PackageInfo> {
        for (value, field) in [
            (os_type, "type"),
            (distro, "dist"),
            (version, "vers"),
            (arch, "arch"),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidParameter(field));
            }
        }

        let distros = self
            .list
            .get(&os_type.to_lowercase())
            .ok_or_else(|| Error::UnsupportedOsType(os_type.to_string()))?;
        let versions = distros
            .get(&distro.to_lowercase())
            .ok_or_else(|| Error::UnsupportedDistro(distro.to_string()))?;
        let arches = versions
            .get(version)
            .ok_or_else(|| Error::UnsupportedVersion {
                distro: distro.to_string(),
                version: version.to_string(),
            })?;
        arches
            .get(arch)
            .cloned()
            .ok_or_else(|| Error::UnsupportedArch {
                arch: arch.to_string(),
                distro: distro.to_string(),
                version: version.to_string(),
            })
    }
}

/// Exact-match probe: only fully qualified keys can hit
impl Probe for PackageRegistry {
    type Entry = PackageInfo;

    fn probe(&self, key: &CandidateKey) -> Result<Option<PackageInfo>> {
        let [os_type, distro, version, arch] = key.qualifiers() else {
            return Ok(None);
        };
        match self.get_package_info(os_type, distro, version, arch) {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.kind() == crate::error::ErrorKind::Unsupported => Ok(None),
            Err(e) => Err(e),
        }
    }
}
