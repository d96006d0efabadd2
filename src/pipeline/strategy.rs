use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::stages::Stage;
use super::Feature;

/// Behavior version of the suggestion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Code detection only.
    #[serde(rename = "1")]
    V1,
    /// Full enrichment merged into one query.
    #[serde(rename = "2")]
    V2,
    /// Full enrichment, every query source kept as its own candidate.
    #[serde(rename = "3")]
    V3,
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches(['v', 'V']) {
            "1" => Ok(ApiVersion::V1),
            "2" => Ok(ApiVersion::V2),
            "3" => Ok(ApiVersion::V3),
            other => Err(format!("Unsupported API version: {other}")),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self {
            ApiVersion::V1 => "1",
            ApiVersion::V2 => "2",
            ApiVersion::V3 => "3",
        };
        f.write_str(v)
    }
}

const LEGACY_STAGES: &[Stage] = &[Stage::CodeDetection];

const ENRICHED_STAGES: &[Stage] = &[
    Stage::CodeDetection,
    Stage::Stemming,
    Stage::SynonymExpansion,
    Stage::IntentClassification,
    Stage::GenericNounFilter,
];

/// Stages the main search runs before building retrieval clauses. Intent
/// classification is left out: the orchestrator calls the classifier itself,
/// concurrently with the embedding call.
const SEARCH_STAGES: &[Stage] = &[Stage::CodeDetection, Stage::Stemming];

/// Picks the ordered stage list and capability flags for an API version.
pub struct StrategySelector;

impl StrategySelector {
    pub fn stages(version: ApiVersion) -> &'static [Stage] {
        match version {
            ApiVersion::V1 => LEGACY_STAGES,
            ApiVersion::V2 | ApiVersion::V3 => ENRICHED_STAGES,
        }
    }

    pub fn search_stages() -> &'static [Stage] {
        SEARCH_STAGES
    }

    /// The stemmed form is kept next to the original, since the search runs
    /// each lexical variant as its own clause.
    pub fn search_features() -> BTreeSet<Feature> {
        [Feature::Stemming, Feature::DualQuery].into_iter().collect()
    }

    pub fn features(version: ApiVersion) -> BTreeSet<Feature> {
        let enriched = [
            Feature::Stemming,
            Feature::SynonymExpansion,
            Feature::IntentClassification,
            Feature::GenericNounFilter,
        ];
        match version {
            ApiVersion::V1 => BTreeSet::new(),
            ApiVersion::V2 => enriched.into_iter().collect(),
            ApiVersion::V3 => enriched
                .into_iter()
                .chain(std::iter::once(Feature::DualQuery))
                .collect(),
        }
    }
}
