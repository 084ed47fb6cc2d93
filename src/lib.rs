// src/lib.rs

//! installhub - installation orchestration server
//!
//! Given a client's OS type, distribution, version and architecture,
//! answers which agent package to install, which broker to use and which
//! configuration templates apply.
//!
//! # Architecture
//!
//! - Descriptors: validated, normalized client and resource identifiers
//! - Resolver: most-specific-first cascade with a memoizing index
//! - Templates: filesystem store resolved through the cascade
//! - Packages: exact-match registry with per-level diagnostics
//! - Broker: pool selection by agent mode
//! - Server: axum HTTP surface over all of the above

pub mod broker;
pub mod config;
pub mod descriptor;
mod error;
pub mod packages;
pub mod resolver;
pub mod server;
pub mod templates;

pub use broker::{BrokerPool, BrokerSelection, BrokerSelector};
pub use config::HubConfig;
pub use descriptor::{AgentMode, ClientDescriptor, Qualifier, ResourceSpec, SPECIFICITY, Validators};
pub use error::{Error, ErrorKind, Result};
pub use packages::{PackageInfo, PackageRegistry};
pub use resolver::{CandidateKey, CascadeResolver, Probe, Resolved, ResolverSnapshot};
pub use templates::{TemplateStore, Templates};
