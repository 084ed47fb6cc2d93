// src/resolver/candidates.rs

//! Candidate key generation
//!
//! Keys are built from a contiguous prefix of the client's qualifiers
//! (see [`crate::descriptor::SPECIFICITY`]) followed by the resource
//! category and name. The list runs from most to least specific and
//! always ends in the universal `category/name` key.

use crate::descriptor::{ClientDescriptor, ResourceSpec};
use std::fmt;

/// One lookup probe: qualifier prefix plus resource identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    qualifiers: Vec<String>,
    category: String,
    name: String,
}

impl CandidateKey {
    pub fn new(qualifiers: &[&str], category: &str, name: &str) -> Self {
        Self {
            qualifiers: qualifiers.iter().map(|q| q.to_string()).collect(),
            category: category.to_string(),
            name: name.to_string(),
        }
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of OS qualifiers; 0 for the universal key
    pub fn specificity(&self) -> usize {
        self.qualifiers.len()
    }

    pub fn is_universal(&self) -> bool {
        self.qualifiers.is_empty()
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for q in &self.qualifiers {
            write!(f, "{}/", q)?;
        }
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Ordered candidate keys for a resource requested by a client
///
/// Never empty. With every client field populated the list has five
/// entries; a blank field drops every key that would need it.
pub fn generate(resource: &ResourceSpec, client: &ClientDescriptor) -> Vec<CandidateKey> {
    let qualifiers = client.qualifiers();
    (0..=qualifiers.len())
        .rev()
        .map(|n| CandidateKey::new(&qualifiers[..n], resource.category(), resource.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorSection;
    use crate::descriptor::Validators;

    fn spec() -> ResourceSpec {
        Validators::compile(&ValidatorSection::default())
            .unwrap()
            .resource_spec("graph", "cpu")
            .unwrap()
    }

    #[test]
    fn test_full_descriptor_yields_five_keys() {
        let client = ClientDescriptor::new("linux", "ubuntu", "16.04", "x86_64");
        let keys = generate(&spec(), &client);

        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "linux/ubuntu/16.04/x86_64/graph/cpu",
                "linux/ubuntu/16.04/graph/cpu",
                "linux/ubuntu/graph/cpu",
                "linux/graph/cpu",
                "graph/cpu",
            ]
        );

        // strictly decreasing specificity
        for pair in keys.windows(2) {
            assert!(pair[0].specificity() > pair[1].specificity());
        }
        assert!(keys.last().unwrap().is_universal());
    }

    #[test]
    fn test_blank_field_skips_dependent_keys() {
        let client = ClientDescriptor::new("linux", "ubuntu", "", "x86_64");
        let keys = generate(&spec(), &client);
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| !k.qualifiers().contains(&"x86_64".to_string())));
        assert_eq!(keys.last().unwrap().to_string(), "graph/cpu");
    }

    #[test]
    fn test_empty_descriptor_yields_universal_key_only() {
        let keys = generate(&spec(), &ClientDescriptor::default());
        assert_eq!(keys.len(), 1);
        assert!(keys[0].is_universal());
    }
}
