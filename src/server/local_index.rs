// src/server/local_index.rs
//! `index.html` for the locally served package directory
//!
//! Package files are named `<prefix>-<semver>-1.<rest>`. Pre-release
//! versions use `~` in place of `-` (RPM rejects `-` in versions), so
//! `agent-1.0.0~beta.1-1.el7.x86_64.rpm` lists under `1.0.0-beta.1`.

use crate::error::{Error, Result};
use regex::Regex;
use semver::Version;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use walkdir::WalkDir;

pub const INDEX_FILE: &str = "index.html";

/// Package files sharing one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: Version,
    pub packages: Vec<String>,
}

/// Scan `dir` (non-recursively) and rewrite its index; returns the release count
pub fn update_local_index(dir: &Path, prefix: &str) -> Result<usize> {
    let releases = scan_packages(dir, prefix)?;
    let path = dir.join(INDEX_FILE);
    std::fs::write(&path, render_index(&releases)).map_err(|e| Error::io(&path, e))?;
    tracing::info!(dir = %dir.display(), releases = releases.len(), "local package index written");
    Ok(releases.len())
}

pub fn scan_packages(dir: &Path, prefix: &str) -> Result<Vec<Release>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, std::io::Error::other(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with(prefix) {
            files.push(name.into_owned());
        }
    }
    files.sort();
    releases(prefix, &files)
}

/// Group package file names by version, newest first
pub fn releases(prefix: &str, files: &[String]) -> Result<Vec<Release>> {
    if files.is_empty() {
        return Err(Error::InvalidEntry {
            resource: "package index",
            key: prefix.to_string(),
            reason: "no package files".to_string(),
        });
    }

    let rx = Regex::new(&format!(r"^{}-(.+)-1\..+$", regex::escape(prefix)))?;
    let mut by_version: BTreeMap<Version, Vec<String>> = BTreeMap::new();

    for file in files {
        let normalized = file.replace('~', "-");
        let Some(raw) = rx.captures(&normalized).and_then(|c| c.get(1)) else {
            tracing::warn!(file = %file, "package name doesn't match, skipping");
            continue;
        };
        match Version::parse(raw.as_str()) {
            Ok(version) => by_version.entry(version).or_default().push(file.clone()),
            Err(e) => tracing::warn!(file = %file, version = raw.as_str(), "unparsable version, skipping: {}", e),
        }
    }

    Ok(by_version
        .into_iter()
        .rev()
        .map(|(version, packages)| Release { version, packages })
        .collect())
}

fn render_index(releases: &[Release]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Agent Packages</title><meta charset=\"UTF-8\"></head>\n<body>\n<h1>Agent Packages</h1>\n",
    );
    for release in releases {
        let _ = writeln!(html, "<h2>{}</h2>\n<ul>", release.version);
        for pkg in &release.packages {
            let _ = writeln!(html, "<li><a href=\"{0}\">{0}</a></li>", escape_html(pkg));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_releases_sorted_newest_first() {
        let files = names(&[
            "agent-0.9.0-1.el7.x86_64.rpm",
            "agent-1.0.0-1.el7.x86_64.rpm",
            "agent-1.0.0-1.ubuntu.16.04_amd64.deb",
            "agent-1.0.0~beta.1-1.el7.x86_64.rpm",
            "agent-notaversion.txt",
        ]);
        let releases = releases("agent", &files).unwrap();
        let versions: Vec<String> = releases.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.0.0-beta.1", "0.9.0"]);
        assert_eq!(releases[0].packages.len(), 2);
        // original file name is listed, not the normalized one
        assert_eq!(releases[1].packages, vec!["agent-1.0.0~beta.1-1.el7.x86_64.rpm"]);
    }

    #[test]
    fn test_index_escapes_file_names() {
        let releases = vec![Release {
            version: Version::new(1, 0, 0),
            packages: names(&["agent-1.0.0-1.<b>&\"x\".rpm"]),
        }];
        let html = render_index(&releases);
        assert!(html.contains(
            "<a href=\"agent-1.0.0-1.&lt;b&gt;&amp;&#34;x&#34;.rpm\">agent-1.0.0-1.&lt;b&gt;&amp;&#34;x&#34;.rpm</a>"
        ));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_empty_file_list_is_an_error() {
        assert!(releases("agent", &[]).is_err());
    }

    #[test]
    fn test_update_writes_index() {
        let tmp = TempDir::new().unwrap();
        for f in ["agent-1.2.3-1.el7.x86_64.rpm", "agent-1.10.0-1.el7.x86_64.rpm", "README"] {
            std::fs::write(tmp.path().join(f), "x").unwrap();
        }
        std::fs::create_dir(tmp.path().join("agent-dir")).unwrap();

        assert_eq!(update_local_index(tmp.path(), "agent").unwrap(), 2);
        let html = std::fs::read_to_string(tmp.path().join(INDEX_FILE)).unwrap();
        let newer = html.find("1.10.0").unwrap();
        let older = html.find("1.2.3").unwrap();
        assert!(newer < older);
        assert!(!html.contains("README"));
    }
}
