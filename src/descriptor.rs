// src/descriptor.rs

//! Request descriptors and their validation
//!
//! A [`ClientDescriptor`] says *who* is asking (OS type, distro, version,
//! architecture); a [`ResourceSpec`] says *what* is being asked for (template
//! category and name). Both are normalized to lower case on construction and
//! immutable afterwards.
//!
//! The order of [`SPECIFICITY`] drives candidate key generation: adding a new
//! descriptor dimension means adding a variant there.

use crate::config::ValidatorSection;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;

/// One OS descriptor dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    OsType,
    OsDistro,
    OsVersion,
    SysArch,
}

/// Descriptor dimensions, most significant first
pub const SPECIFICITY: [Qualifier; 4] = [
    Qualifier::OsType,
    Qualifier::OsDistro,
    Qualifier::OsVersion,
    Qualifier::SysArch,
];

impl Qualifier {
    /// Query parameter carrying this dimension
    pub fn param(self) -> &'static str {
        match self {
            Qualifier::OsType => "type",
            Qualifier::OsDistro => "dist",
            Qualifier::OsVersion => "vers",
            Qualifier::SysArch => "arch",
        }
    }
}

/// Normalized description of the requesting system
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClientDescriptor {
    os_type: String,
    os_distro: String,
    os_version: String,
    sys_arch: String,
}

impl ClientDescriptor {
    /// Build a descriptor without validation; blank fields are allowed
    pub fn new(os_type: &str, os_distro: &str, os_version: &str, sys_arch: &str) -> Self {
        Self {
            os_type: os_type.trim().to_lowercase(),
            os_distro: os_distro.trim().to_lowercase(),
            os_version: os_version.trim().to_lowercase(),
            sys_arch: sys_arch.trim().to_lowercase(),
        }
    }

    pub fn os_type(&self) -> &str {
        &self.os_type
    }

    pub fn os_distro(&self) -> &str {
        &self.os_distro
    }

    pub fn os_version(&self) -> &str {
        &self.os_version
    }

    pub fn sys_arch(&self) -> &str {
        &self.sys_arch
    }

    pub fn get(&self, qualifier: Qualifier) -> &str {
        match qualifier {
            Qualifier::OsType => &self.os_type,
            Qualifier::OsDistro => &self.os_distro,
            Qualifier::OsVersion => &self.os_version,
            Qualifier::SysArch => &self.sys_arch,
        }
    }

    /// Longest contiguous run of populated fields in specificity order
    ///
    /// A blank field ends the run: `linux`, blank distro, `7`, `x86_64`
    /// yields only `["linux"]`.
    pub fn qualifiers(&self) -> Vec<&str> {
        SPECIFICITY
            .iter()
            .map(|q| self.get(*q))
            .take_while(|value| !value.is_empty())
            .collect()
    }
}

impl fmt::Display for ClientDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.os_type, self.os_distro, self.os_version, self.sys_arch
        )
    }
}

/// Template category and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceSpec {
    category: String,
    name: String,
}

impl ResourceSpec {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.name)
    }
}

/// Agent mode classes used to pick a broker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    Push,
    Pull,
}

/// Compiled validation regular expressions
#[derive(Debug, Clone)]
pub struct Validators {
    os_type: Regex,
    os_distro: Regex,
    os_version: Regex,
    version_cleaner: Regex,
    sys_arch: Regex,
    major_version_distro: Regex,
    pkg_distro: Regex,
    push_mode: Regex,
    pull_mode: Regex,
    template_type: Regex,
    template_name: Regex,
}

fn compile(what: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("{} regex: {}", what, e)))
}

impl Validators {
    pub fn compile(section: &ValidatorSection) -> Result<Self> {
        Ok(Self {
            os_type: compile("os type", &section.param_type_regex)?,
            os_distro: compile("os distro", &section.param_distro_regex)?,
            os_version: compile("os version", &section.param_version_regex)?,
            version_cleaner: compile("os version cleaner", &section.param_version_cleaner_regex)?,
            sys_arch: compile("system architecture", &section.param_arch_regex)?,
            major_version_distro: compile(
                "major version distro",
                &section.major_version_distro_regex,
            )?,
            pkg_distro: compile("pkg distro", &section.pkg_distro_regex)?,
            push_mode: compile("agent push mode", &section.agent_push_mode_regex)?,
            pull_mode: compile("agent pull mode", &section.agent_pull_mode_regex)?,
            template_type: compile("template type", &section.template_type_regex)?,
            template_name: compile("template name", &section.template_name_regex)?,
        })
    }

    /// Validate and normalize a fully populated client descriptor
    ///
    /// Every field is required. Type and distro are matched lower-cased;
    /// version and arch are matched as sent. The version loses its leading
    /// marker and, for major-version-only distros, everything after the
    /// first dot.
    pub fn client_descriptor(
        &self,
        os_type: &str,
        os_distro: &str,
        os_version: &str,
        sys_arch: &str,
    ) -> Result<ClientDescriptor> {
        let raw = ClientDescriptor::new(os_type, os_distro, os_version, sys_arch);

        for (qualifier, rx) in [
            (Qualifier::OsType, &self.os_type),
            (Qualifier::OsDistro, &self.os_distro),
            (Qualifier::OsVersion, &self.os_version),
            (Qualifier::SysArch, &self.sys_arch),
        ] {
            let value = match qualifier {
                Qualifier::OsVersion => os_version.trim(),
                Qualifier::SysArch => sys_arch.trim(),
                _ => raw.get(qualifier),
            };
            if value.is_empty() {
                return Err(Error::InvalidParameter(qualifier.param()));
            }
            if !rx.is_match(value) {
                tracing::debug!(
                    param = qualifier.param(),
                    value,
                    regex = rx.as_str(),
                    "parameter not matched"
                );
                return Err(Error::InvalidParameter(qualifier.param()));
            }
        }

        let cleaned = self.version_cleaner.replace(&raw.os_version, "");
        if cleaned.is_empty() {
            return Err(Error::InvalidParameter(Qualifier::OsVersion.param()));
        }
        let os_version = if self.major_version_distro.is_match(&raw.os_distro) {
            cleaned.split('.').next().unwrap_or_default().to_string()
        } else {
            cleaned.into_owned()
        };
        if os_version.is_empty() {
            return Err(Error::InvalidParameter(Qualifier::OsVersion.param()));
        }

        Ok(ClientDescriptor { os_version, ..raw })
    }

    /// Validate a template category and name
    pub fn resource_spec(&self, category: &str, name: &str) -> Result<ResourceSpec> {
        if category.is_empty() || !self.template_type.is_match(category) {
            return Err(Error::InvalidSpec {
                field: "template type",
                value: category.to_string(),
            });
        }
        if name.is_empty() || !self.template_name.is_match(name) {
            return Err(Error::InvalidSpec {
                field: "template name",
                value: name.to_string(),
            });
        }
        Ok(ResourceSpec {
            category: category.to_lowercase(),
            name: name.to_lowercase(),
        })
    }

    /// Whether the distro installs through a `pkg` publisher
    pub fn is_pkg_distro(&self, distro: &str) -> bool {
        self.pkg_distro.is_match(distro)
    }

    /// Classify a requested agent mode; pull wins when both match
    pub fn agent_mode(&self, mode: &str) -> Option<AgentMode> {
        if self.pull_mode.is_match(mode) {
            Some(AgentMode::Pull)
        } else if self.push_mode.is_match(mode) {
            Some(AgentMode::Push)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validators() -> Validators {
        Validators::compile(&ValidatorSection::default()).unwrap()
    }

    #[test]
    fn test_client_descriptor_normalizes() {
        let v = validators();
        let d = v.client_descriptor("Linux", "Ubuntu", "v16.04", "x86_64").unwrap();
        assert_eq!(d.os_type(), "linux");
        assert_eq!(d.os_distro(), "ubuntu");
        assert_eq!(d.os_version(), "16.04");
        assert_eq!(d.sys_arch(), "x86_64");
    }

    #[test]
    fn test_major_version_distro_collapses_version() {
        let v = validators();
        let d = v.client_descriptor("linux", "CentOS", "7.4.1708", "x86_64").unwrap();
        assert_eq!(d.os_version(), "7");

        let d = v.client_descriptor("linux", "ubuntu", "18.04", "x86_64").unwrap();
        assert_eq!(d.os_version(), "18.04");
    }

    #[test]
    fn test_client_descriptor_rejects_each_field() {
        let v = validators();
        let cases = [
            (("", "ubuntu", "16.04", "x86_64"), "type"),
            (("linux", "ubuntu1", "16.04", "x86_64"), "dist"),
            (("linux", "ubuntu", "sixteen", "x86_64"), "vers"),
            (("linux", "ubuntu", "16.04", "sparc"), "arch"),
            (("linux", "ubuntu", "16.04", ""), "arch"),
            (("linux", "ubuntu", "V16.04", "x86_64"), "vers"),
            (("linux", "ubuntu", "16.04", "X86_64"), "arch"),
        ];
        for ((t, d, ver, a), field) in cases {
            match v.client_descriptor(t, d, ver, a) {
                Err(Error::InvalidParameter(f)) => assert_eq!(f, field),
                other => panic!("expected InvalidParameter({}), got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_qualifiers_stop_at_first_blank() {
        let d = ClientDescriptor::new("linux", "ubuntu", "16.04", "x86_64");
        assert_eq!(d.qualifiers(), vec!["linux", "ubuntu", "16.04", "x86_64"]);

        let d = ClientDescriptor::new("linux", "", "7", "x86_64");
        assert_eq!(d.qualifiers(), vec!["linux"]);

        let d = ClientDescriptor::new("linux", "centos", "", "x86_64");
        assert_eq!(d.qualifiers(), vec!["linux", "centos"]);

        assert!(ClientDescriptor::default().qualifiers().is_empty());
    }

    #[test]
    fn test_resource_spec() {
        let v = validators();
        let spec = v.resource_spec("Graph", "CPU_load-1").unwrap();
        assert_eq!(spec.category(), "graph");
        assert_eq!(spec.name(), "cpu_load-1");

        assert!(matches!(
            v.resource_spec("", ""),
            Err(Error::InvalidSpec { field: "template type", .. })
        ));
        assert!(matches!(
            v.resource_spec("#graph", "cpu"),
            Err(Error::InvalidSpec { field: "template type", .. })
        ));
        assert!(matches!(
            v.resource_spec("graph", ""),
            Err(Error::InvalidSpec { field: "template name", .. })
        ));
        assert!(matches!(
            v.resource_spec("graph", "#test"),
            Err(Error::InvalidSpec { field: "template name", .. })
        ));
    }

    #[test]
    fn test_agent_mode() {
        let v = validators();
        assert_eq!(v.agent_mode("reverse"), Some(AgentMode::Pull));
        assert_eq!(v.agent_mode("PULL"), Some(AgentMode::Pull));
        assert_eq!(v.agent_mode("httptrap"), Some(AgentMode::Push));
        assert_eq!(v.agent_mode("carrier-pigeon"), None);
    }

    #[test]
    fn test_pkg_distro() {
        let v = validators();
        assert!(v.is_pkg_distro("omnios"));
        assert!(!v.is_pkg_distro("ubuntu"));
    }
}
