use std::fmt;

use serde::{Serialize, Serializer};

use crate::gallery::domain::gallery::Gallery;
use crate::shared::constants::UNKNOWN_IDENTITY;

use super::embedding::Embedding;

/// Default Euclidean distance above which the best match is rejected.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.55;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Known(String),
    Unknown,
}

impl Identity {
    pub fn name(&self) -> &str {
        match self {
            Identity::Known(name) => name,
            Identity::Unknown => UNKNOWN_IDENTITY,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub identity: Identity,
    /// Smallest distance found, `f64::INFINITY` when nothing was comparable.
    pub distance: f64,
}

impl MatchResult {
    fn unknown(distance: f64) -> Self {
        Self {
            identity: Identity::Unknown,
            distance,
        }
    }
}

/// Nearest-neighbour identity lookup against a [`Gallery`].
///
/// Each person scores the minimum distance over their embeddings of the
/// same dimension, ignoring non-finite distances from corrupt vectors.
/// The lowest score wins, with ties going to whoever comes
/// first in gallery order. A winner further than `threshold` away is
/// reported as unknown together with the real distance.
#[derive(Clone, Debug)]
pub struct IdentityMatcher {
    threshold: f64,
}

impl IdentityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn best_match(&self, embedding: Option<&Embedding>, gallery: &Gallery) -> MatchResult {
        let Some(embedding) = embedding else {
            return MatchResult::unknown(f64::INFINITY);
        };

        let mut best: Option<(&str, f64)> = None;
        for person in gallery.people() {
            let Some(score) = person
                .embeddings
                .iter()
                .filter_map(|reference| embedding.euclidean_distance(reference))
                .filter(|d| d.is_finite())
                .min_by(f64::total_cmp)
            else {
                log::debug!("No comparable embeddings for {}", person.name);
                continue;
            };
            if best.map_or(true, |(_, d)| score < d) {
                best = Some((&person.name, score));
            }
        }

        match best {
            None => MatchResult::unknown(f64::INFINITY),
            Some((_, distance)) if distance > self.threshold => MatchResult::unknown(distance),
            Some((name, distance)) => MatchResult {
                identity: Identity::Known(name.to_string()),
                distance,
            },
        }
    }
}

impl Default for IdentityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}
