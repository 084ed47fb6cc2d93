// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use installhub::HubConfig;
use installhub::server::{ServerState, SharedState, create_router};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const PACKAGE_BASE_URL: &str = "https://updates.example.com/packages";

pub const PACKAGES_TOML: &str = r#"
[[package]]
type = "linux"
dist = "Ubuntu"
vers = "14.04"
arch = "x86_64"
package_info = { package_file = "agent-1.0.0-1.ubuntu.14.04_amd64.deb" }

[[package]]
type = "linux"
dist = "CentOS"
vers = "7"
arch = "x86_64"
package_info = { package_file = "agent-1.0.0-1.el7.x86_64.rpm" }

[[package]]
type = "illumos"
dist = "OmniOS"
vers = "151014"
arch = "x86_64"
package_info = { publisher_name = "example", publisher_url = "http://pkg.example.com/", package_name = "agent" }
"#;

/// Write a file below `root`, creating parent directories
pub fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

/// Create a content root with templates, installer files and a package registry.
///
/// Template layout:
/// - `graph-cpu.toml` universal
/// - `linux/graph-cpu.toml`
/// - `linux/ubuntu/16.04/x86_64/graph-cpu.toml`
/// - `linux/centos/check-system.toml`
/// - `linux/broken/graph-cpu.toml` (empty)
///
/// Returns the TempDir - keep it alive to prevent cleanup.
pub fn setup_content_root() -> TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();

    write(root, "templates/graph-cpu.toml", "# universal cpu graph\n");
    write(root, "templates/linux/graph-cpu.toml", "# linux cpu graph\n");
    write(
        root,
        "templates/linux/ubuntu/16.04/x86_64/graph-cpu.toml",
        "# ubuntu 16.04 x86_64 cpu graph\n",
    );
    write(root, "templates/linux/centos/check-system.toml", "# centos system check\n");
    write(root, "templates/linux/broken/graph-cpu.toml", "");

    write(root, "files/install.sh", "#!/usr/bin/env bash\n# agent-install --key <apikey>\n");
    write(root, "files/install.conf", "api_key=\"\"\n");
    write(root, "files/agent-installer.rpm", "rpm bytes");
    write(root, "packages.toml", PACKAGES_TOML);

    temp_dir
}

/// Default configuration pointed at a content root
pub fn test_config(root: &Path) -> HubConfig {
    let mut config = HubConfig::default();
    config.content.root = root.to_path_buf();
    config.content.package_base_url = PACKAGE_BASE_URL.to_string();
    config
}

pub fn test_state(config: HubConfig) -> SharedState {
    Arc::new(ServerState::new(config).unwrap())
}

pub fn test_app(config: HubConfig) -> (axum::Router, SharedState) {
    let state = test_state(config);
    (create_router(state.clone()), state)
}
