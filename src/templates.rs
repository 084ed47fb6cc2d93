// src/templates.rs
//! Filesystem template store
//!
//! Templates live under the template directory as
//! `<type>/<dist>/<vers>/<arch>/<category>-<name>.toml`, with any trailing
//! run of qualifier directories optional. The most specific file present
//! wins; see [`crate::resolver`] for the cascade.

use crate::descriptor::{ClientDescriptor, Validators};
use crate::error::{Error, Result};
use crate::resolver::{self, CandidateKey, CascadeResolver, Probe, ResolverSnapshot, Resolved};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content type templates are served with
pub const TEMPLATE_CONTENT_TYPE: &str = "application/toml";

const TEMPLATE_EXTENSION: &str = "toml";

/// Probe backed by files under a template directory
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a candidate key maps to
    pub fn path_for(&self, key: &CandidateKey) -> PathBuf {
        let mut path = self.root.clone();
        for q in key.qualifiers() {
            path.push(q);
        }
        path.push(format!(
            "{}-{}.{}",
            key.category(),
            key.name(),
            TEMPLATE_EXTENSION
        ));
        path
    }
}

impl Probe for TemplateStore {
    type Entry = Arc<[u8]>;

    fn probe(&self, key: &CandidateKey) -> Result<Option<Self::Entry>> {
        let path = self.path_for(key);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };
        if data.is_empty() {
            return Err(Error::InvalidEntry {
                resource: "template",
                key: path.display().to_string(),
                reason: "empty file".to_string(),
            });
        }
        Ok(Some(Arc::from(data)))
    }
}

/// Template lookup facade
pub struct Templates {
    validators: Arc<Validators>,
    resolver: CascadeResolver<TemplateStore>,
}

impl Templates {
    /// Open the template directory; it must already exist
    pub fn new(dir: impl Into<PathBuf>, validators: Arc<Validators>, use_cache: bool) -> Result<Self> {
        let dir = dir.into();
        let meta = std::fs::metadata(&dir).map_err(|e| Error::io(&dir, e))?;
        if !meta.is_dir() {
            return Err(Error::Config(format!(
                "template path {} is not a directory",
                dir.display()
            )));
        }
        tracing::debug!(dir = %dir.display(), cache = use_cache, "template store ready");
        Ok(Self {
            validators,
            resolver: CascadeResolver::new(TemplateStore::new(dir), "template", use_cache),
        })
    }

    /// Fetch the most specific template for a client
    ///
    /// The category and name are validated before anything is probed.
    /// Blank client fields narrow the candidate list.
    pub fn get(&self, category: &str, name: &str, client: &ClientDescriptor) -> Result<Arc<[u8]>> {
        Ok(self.resolve(category, name, client)?.content)
    }

    /// Like [`Templates::get`], also reporting the canonical key
    pub fn resolve(
        &self,
        category: &str,
        name: &str,
        client: &ClientDescriptor,
    ) -> Result<Resolved<Arc<[u8]>>> {
        let spec = self.validators.resource_spec(category, name)?;
        let candidates = resolver::generate(&spec, client);
        self.resolver.resolve(&candidates)
    }

    pub fn dir(&self) -> &Path {
        self.resolver.store().root()
    }

    pub fn stats(&self) -> ResolverSnapshot {
        self.resolver.snapshot()
    }
}
