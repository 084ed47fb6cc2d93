// src/config.rs
//! Configuration file parsing for the installhub server
//!
//! Supports TOML configuration files with the following sections:
//! - [server] - Listen addresses, template cache toggle
//! - [content] - Content root, package registry file, local packages
//! - [validators] - Regular expressions for request validation
//! - [brokers] - Broker pools per agent mode
//! - [tool] - Tool download redirect
//! - [log] - Log level

use crate::broker::BrokerPool;
use crate::descriptor::Validators;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

/// Port used when a listen spec carries only an address
pub const DEFAULT_PORT: u16 = 8080;

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub content: ContentSection,

    #[serde(default)]
    pub validators: ValidatorSection,

    #[serde(default)]
    pub brokers: BrokerSection,

    #[serde(default)]
    pub tool: ToolSection,

    #[serde(default)]
    pub log: LogSection,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    /// Listen specs: `port`, `ip`, `ip:port`, `[v6]` or `[v6]:port`
    #[serde(default = "default_listen")]
    pub listen: Vec<String>,

    /// Memoize template lookups for the life of the process
    #[serde(default = "default_true")]
    pub enable_template_cache: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            enable_template_cache: true,
        }
    }
}

fn default_listen() -> Vec<String> {
    vec![format!(":{}", DEFAULT_PORT)]
}

fn default_true() -> bool {
    true
}

/// Content configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentSection {
    /// Root holding `templates/`, `files/` and `packages/`
    #[serde(default = "default_content_root")]
    pub root: PathBuf,

    /// Package registry file (defaults to `<root>/packages.toml`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_config_file: Option<PathBuf>,

    /// Base URL used for package entries that name a file but no URL
    #[serde(default)]
    pub package_base_url: String,

    /// Serve agent packages from a local directory
    #[serde(default)]
    pub local_packages: bool,

    /// Local package directory (defaults to `<root>/packages`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_package_path: Option<PathBuf>,

    /// File name prefix of agent packages listed in the local index
    #[serde(default = "default_local_package_prefix")]
    pub local_package_prefix: String,

    /// RPM served on /install/rpm/ (file name inside `<root>/files`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm_installer_file: Option<String>,
}

impl Default for ContentSection {
    fn default() -> Self {
        Self {
            root: default_content_root(),
            package_config_file: None,
            package_base_url: String::new(),
            local_packages: false,
            local_package_path: None,
            local_package_prefix: default_local_package_prefix(),
            rpm_installer_file: None,
        }
    }
}

fn default_local_package_prefix() -> String {
    "agent".to_string()
}

fn default_content_root() -> PathBuf {
    PathBuf::from("/opt/installhub/content")
}

/// Validation regular expressions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorSection {
    #[serde(default = "default_type_regex")]
    pub param_type_regex: String,
    #[serde(default = "default_distro_regex")]
    pub param_distro_regex: String,
    #[serde(default = "default_version_regex")]
    pub param_version_regex: String,
    /// Matches the leading marker stripped from versions (e.g. `v7.2` -> `7.2`)
    #[serde(default = "default_version_cleaner_regex")]
    pub param_version_cleaner_regex: String,
    #[serde(default = "default_arch_regex")]
    pub param_arch_regex: String,
    /// Distros identified by major version only
    #[serde(default = "default_major_version_distro_regex")]
    pub major_version_distro_regex: String,
    /// Distros installed with `pkg` (publisher based) instead of rpm/deb
    #[serde(default = "default_pkg_distro_regex")]
    pub pkg_distro_regex: String,
    #[serde(default = "default_push_mode_regex")]
    pub agent_push_mode_regex: String,
    #[serde(default = "default_pull_mode_regex")]
    pub agent_pull_mode_regex: String,
    #[serde(default = "default_template_type_regex")]
    pub template_type_regex: String,
    #[serde(default = "default_template_name_regex")]
    pub template_name_regex: String,
}

impl Default for ValidatorSection {
    fn default() -> Self {
        Self {
            param_type_regex: default_type_regex(),
            param_distro_regex: default_distro_regex(),
            param_version_regex: default_version_regex(),
            param_version_cleaner_regex: default_version_cleaner_regex(),
            param_arch_regex: default_arch_regex(),
            major_version_distro_regex: default_major_version_distro_regex(),
            pkg_distro_regex: default_pkg_distro_regex(),
            agent_push_mode_regex: default_push_mode_regex(),
            agent_pull_mode_regex: default_pull_mode_regex(),
            template_type_regex: default_template_type_regex(),
            template_name_regex: default_template_name_regex(),
        }
    }
}

fn default_type_regex() -> String {
    r"^(?i)[a-z_-]+$".to_string()
}

fn default_distro_regex() -> String {
    r"^(?i)[a-z]+$".to_string()
}

fn default_version_regex() -> String {
    r"^[rv]?\d+(\.\d+)*$".to_string()
}

fn default_version_cleaner_regex() -> String {
    r"^[rv]".to_string()
}

fn default_arch_regex() -> String {
    r"^(amd64|x86_64|i386|i686|aarch64|arm64)$".to_string()
}

fn default_major_version_distro_regex() -> String {
    r"^(?i)(centos|fedora|redhat|oracle)$".to_string()
}

fn default_pkg_distro_regex() -> String {
    r"^(?i)(omnios|illumos|solaris)$".to_string()
}

fn default_push_mode_regex() -> String {
    r"^(?i)(push|trap|httptrap)$".to_string()
}

fn default_pull_mode_regex() -> String {
    r"^(?i)(pull|reverse|revonly|json)$".to_string()
}

fn default_template_type_regex() -> String {
    r"^(?i)(check|graph|worksheet|dashboard)$".to_string()
}

fn default_template_name_regex() -> String {
    r"^(?i)[a-z0-9_-]+$".to_string()
}

/// Broker pools, one per agent mode plus the fallback
///
/// Each `*_default` is an offset into its list, or -1 for random selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerSection {
    #[serde(default = "default_regional_brokers")]
    pub fallback: Vec<String>,
    #[serde(default = "default_regional_index")]
    pub fallback_default: i64,
    #[serde(default = "default_push_brokers")]
    pub push: Vec<String>,
    #[serde(default)]
    pub push_default: i64,
    #[serde(default = "default_regional_brokers")]
    pub pull: Vec<String>,
    #[serde(default = "default_regional_index")]
    pub pull_default: i64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            fallback: default_regional_brokers(),
            fallback_default: default_regional_index(),
            push: default_push_brokers(),
            push_default: 0,
            pull: default_regional_brokers(),
            pull_default: default_regional_index(),
        }
    }
}

fn default_regional_brokers() -> Vec<String> {
    vec!["1".to_string(), "2".to_string(), "275".to_string()]
}

fn default_regional_index() -> i64 {
    2
}

fn default_push_brokers() -> Vec<String> {
    vec!["35".to_string()]
}

impl BrokerSection {
    pub fn fallback_pool(&self) -> BrokerPool {
        BrokerPool::new(self.fallback.clone(), self.fallback_default)
    }

    pub fn push_pool(&self) -> BrokerPool {
        BrokerPool::new(self.push.clone(), self.push_default)
    }

    pub fn pull_pool(&self) -> BrokerPool {
        BrokerPool::new(self.pull.clone(), self.pull_default)
    }
}

/// Tool download redirect
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolSection {
    /// Release tag, e.g. `v0.2.0` (empty disables /tool/)
    #[serde(default)]
    pub version: String,
    /// Release download base URL
    #[serde(default)]
    pub base_url: String,
    /// Archive name prefix
    #[serde(default = "default_tool_name")]
    pub name: String,
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            version: String::new(),
            base_url: String::new(),
            name: default_tool_name(),
        }
    }
}

fn default_tool_name() -> String {
    "installhub-tool".to_string()
}

impl ToolSection {
    /// Release archive for an OS type, when the redirect is configured
    ///
    /// `v0.2.0` on linux gives `<base>/v0.2.0/<name>_0.2.0_linux_x86_64.tar.gz`.
    pub fn download_url(&self, os_type: &str) -> Option<String> {
        if self.version.is_empty() || self.base_url.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/{}_{}_{}_x86_64.tar.gz",
            self.base_url.trim_end_matches('/'),
            self.version,
            self.name,
            self.version.replacen('v', "", 1),
            os_type
        ))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSection {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl HubConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: HubConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.listen_addrs()?;

        Validators::compile(&self.validators).context("Invalid validators section")?;

        for (name, list, default) in [
            ("fallback", &self.brokers.fallback, self.brokers.fallback_default),
            ("push", &self.brokers.push, self.brokers.push_default),
            ("pull", &self.brokers.pull, self.brokers.pull_default),
        ] {
            if let Some(bad) = list.iter().find(|id| id.parse::<u32>().is_err()) {
                anyhow::bail!("brokers.{} contains non-numeric broker id '{}'", name, bad);
            }
            if default < -1 {
                anyhow::bail!(
                    "brokers.{}_default must be -1 (random) or a list offset, got {}",
                    name,
                    default
                );
            }
        }

        if !self.content.package_base_url.is_empty() {
            url::Url::parse(&self.content.package_base_url).with_context(|| {
                format!(
                    "Invalid content.package_base_url: {}",
                    self.content.package_base_url
                )
            })?;
        }
        if !self.tool.base_url.is_empty() {
            url::Url::parse(&self.tool.base_url)
                .with_context(|| format!("Invalid tool.base_url: {}", self.tool.base_url))?;
        }

        Ok(())
    }

    /// Resolve all listen specs to socket addresses
    pub fn listen_addrs(&self) -> Result<Vec<SocketAddr>> {
        if self.server.listen.is_empty() {
            return Ok(vec![parse_listen("")?]);
        }
        self.server.listen.iter().map(|spec| parse_listen(spec)).collect()
    }

    pub fn template_dir(&self) -> PathBuf {
        self.content.root.join("templates")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.content.root.join("files")
    }

    pub fn package_config_file(&self) -> PathBuf {
        self.content
            .package_config_file
            .clone()
            .unwrap_or_else(|| self.content.root.join("packages.toml"))
    }

    pub fn local_package_dir(&self) -> PathBuf {
        self.content
            .local_package_path
            .clone()
            .unwrap_or_else(|| self.content.root.join("packages"))
    }

    /// Render the running configuration
    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).context("formatting config (toml)"),
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).context("formatting config (json)")
            }
        }
    }
}

/// Output format for `show-config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

/// Parse a listen spec, filling in the default port or wildcard address
pub fn parse_listen(spec: &str) -> Result<SocketAddr> {
    let spec = spec.trim();
    let full = if spec.is_empty() {
        format!("0.0.0.0:{}", DEFAULT_PORT)
    } else if spec.chars().all(|c| c.is_ascii_digit()) {
        format!("0.0.0.0:{}", spec)
    } else if let Some(port) = spec.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if spec.starts_with('[') && spec.ends_with(']') {
        format!("{}:{}", spec, DEFAULT_PORT)
    } else if !spec.contains(':') {
        format!("{}:{}", spec, DEFAULT_PORT)
    } else {
        spec.to_string()
    };

    full.to_socket_addrs()
        .with_context(|| format!("Invalid listen address: {}", spec))?
        .next()
        .with_context(|| format!("Listen address resolved to nothing: {}", spec))
}
