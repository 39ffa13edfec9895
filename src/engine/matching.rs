use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// How a retrieved passage is judged relevant against the reference passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Normalized retrieved text equals a normalized reference passage.
    ExactSet,
    /// Normalized retrieved text occurs inside a normalized reference passage.
    /// Tolerates references that carry trailing footers or citation links.
    SubstringContainment,
}

impl MatchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactSet => "exact_set",
            Self::SubstringContainment => "substring_containment",
        }
    }

    /// Directional: the retrieved passage must be found within the reference.
    pub fn is_match(self, retrieved: &str, reference: &str) -> bool {
        match self {
            Self::ExactSet => retrieved == reference,
            Self::SubstringContainment => reference.contains(retrieved),
        }
    }
}

/// Normalized reference passages of one query, prepared for lookups.
#[derive(Debug)]
pub struct ReferenceIndex<'a> {
    policy: MatchPolicy,
    references: &'a [String],
    first_position: HashMap<&'a str, usize>,
}

impl<'a> ReferenceIndex<'a> {
    pub fn new(policy: MatchPolicy, references: &'a [String]) -> Self {
        let mut first_position = HashMap::new();
        if policy == MatchPolicy::ExactSet {
            for (index, reference) in references.iter().enumerate() {
                first_position.entry(reference.as_str()).or_insert(index);
            }
        }

        Self {
            policy,
            references,
            first_position,
        }
    }

    /// Position of the first reference passage the retrieved passage matches.
    pub fn matched_reference(&self, retrieved: &str) -> Option<usize> {
        match self.policy {
            MatchPolicy::ExactSet => self.first_position.get(retrieved).copied(),
            MatchPolicy::SubstringContainment => self
                .references
                .iter()
                .position(|reference| self.policy.is_match(retrieved, reference)),
        }
    }

    /// Per reference passage, whether any retrieved passage matches it.
    /// Duplicated reference passages are each reported.
    pub fn coverage(&self, retrieved: &[String]) -> Vec<bool> {
        match self.policy {
            MatchPolicy::ExactSet => {
                let retrieved_set = retrieved
                    .iter()
                    .map(String::as_str)
                    .collect::<HashSet<&str>>();
                self.references
                    .iter()
                    .map(|reference| retrieved_set.contains(reference.as_str()))
                    .collect()
            }
            MatchPolicy::SubstringContainment => self
                .references
                .iter()
                .map(|reference| {
                    retrieved
                        .iter()
                        .any(|candidate| self.policy.is_match(candidate, reference))
                })
                .collect(),
        }
    }
}
