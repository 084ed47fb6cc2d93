// src/broker.rs
//! Broker selection
//!
//! Each pool is an ordered list of broker IDs and a default offset into
//! it. An offset of -1 picks a pool member at random on every call.

use crate::config::BrokerSection;
use crate::descriptor::AgentMode;
use crate::error::{Error, Result};
use rand::Rng;

/// Offset meaning "pick uniformly at random"
pub const RANDOM_INDEX: i64 = -1;

/// Outcome of a successful selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerSelection {
    Selected(String),
    /// The pool is empty; a valid negative answer, not a failure
    Unavailable,
}

/// Broker IDs plus the configured default offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerPool {
    ids: Vec<String>,
    default_index: i64,
}

impl BrokerPool {
    pub fn new(ids: Vec<String>, default_index: i64) -> Self {
        Self { ids, default_index }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Pick a broker
    ///
    /// A single-member pool ignores the offset. An offset outside the pool
    /// (other than -1) is an `InvalidConfiguration` error.
    pub fn select(&self) -> Result<BrokerSelection> {
        match self.ids.as_slice() {
            [] => Ok(BrokerSelection::Unavailable),
            [only] => Ok(BrokerSelection::Selected(only.clone())),
            ids if self.default_index == RANDOM_INDEX => {
                let idx = rand::thread_rng().gen_range(0..ids.len());
                Ok(BrokerSelection::Selected(ids[idx].clone()))
            }
            ids => usize::try_from(self.default_index)
                .ok()
                .and_then(|idx| ids.get(idx))
                .map(|id| BrokerSelection::Selected(id.clone()))
                .ok_or_else(|| {
                    Error::InvalidConfiguration(format!(
                        "default broker index {} out of range for pool of {}",
                        self.default_index,
                        ids.len()
                    ))
                }),
        }
    }
}

/// The fallback, push-mode and pull-mode pools
#[derive(Debug, Clone)]
pub struct BrokerSelector {
    fallback: BrokerPool,
    push: BrokerPool,
    pull: BrokerPool,
}

impl BrokerSelector {
    pub fn new(fallback: BrokerPool, push: BrokerPool, pull: BrokerPool) -> Self {
        Self {
            fallback,
            push,
            pull,
        }
    }

    pub fn from_config(section: &BrokerSection) -> Self {
        Self::new(
            section.fallback_pool(),
            section.push_pool(),
            section.pull_pool(),
        )
    }

    /// Pool serving a mode; an empty mode pool is never substituted
    pub fn pool_for(&self, mode: Option<AgentMode>) -> &BrokerPool {
        match mode {
            Some(AgentMode::Pull) => &self.pull,
            Some(AgentMode::Push) => &self.push,
            None => &self.fallback,
        }
    }

    pub fn select(&self, mode: Option<AgentMode>) -> Result<BrokerSelection> {
        let selection = self.pool_for(mode).select()?;
        tracing::debug!(?mode, ?selection, "broker selected");
        Ok(selection)
    }
}
