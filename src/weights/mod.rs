//! Strategy weighting: the tunable multipliers that decide how much each
//! retrieval strategy contributes to a combined score.
//!
//! A [`WeightConfig`] is an immutable snapshot. Updates never mutate a
//! snapshot in place; the [`store::WeightStore`] swaps in a whole new one.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use store::{ReloadError, WeightStore};

/// Bounds for multiplier-style fields.
pub const MULTIPLIER_RANGE: (f64, f64) = (0.0, 10.0);
/// Bounds for the Gaussian decay scale (miles).
pub const DECAY_SCALE_RANGE: (f64, f64) = (1.0, 200.0);
/// Bounds for the Gaussian decay offset (miles).
pub const DECAY_OFFSET_RANGE: (f64, f64) = (0.0, 50.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    #[serde(default = "default_version")]
    pub version: String,
    pub semantic: SemanticWeights,
    pub strategies: StrategyWeights,
    pub geospatial: GeospatialWeights,
    pub keyword_variations: KeywordVariationWeights,
    #[serde(default)]
    pub metadata: WeightMetadata,
}

/// Per-embedding-field weights for the vector-similarity clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticWeights {
    pub service: f64,
    pub taxonomy: f64,
    pub organization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub semantic_search: f64,
    pub keyword_search: f64,
    pub intent_driven: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeospatialWeights {
    pub weight: f64,
    pub decay_scale: f64,
    pub decay_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordVariationWeights {
    pub nouns_multiplier: f64,
    pub stemmed_nouns_multiplier: f64,
}

/// Free-form bookkeeping carried with the document. Not validated and not
/// part of the fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            semantic: SemanticWeights {
                service: 1.0,
                taxonomy: 1.0,
                organization: 1.0,
            },
            strategies: StrategyWeights {
                semantic_search: 1.0,
                keyword_search: 1.0,
                intent_driven: 1.0,
            },
            geospatial: GeospatialWeights {
                weight: 2.0,
                decay_scale: 50.0,
                decay_offset: 0.0,
            },
            keyword_variations: KeywordVariationWeights {
                nouns_multiplier: 1.0,
                stemmed_nouns_multiplier: 1.0,
            },
            metadata: WeightMetadata::default(),
        }
    }
}

/// A single out-of-range (or non-finite) field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightValidationError {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for WeightValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} is outside [{}, {}]",
            self.field, self.value, self.min, self.max
        )
    }
}

impl WeightConfig {
    /// Every bounded field with its dotted path and range.
    fn bounded_fields(&self) -> [(&'static str, f64, (f64, f64)); 11] {
        [
            ("semantic.service", self.semantic.service, MULTIPLIER_RANGE),
            ("semantic.taxonomy", self.semantic.taxonomy, MULTIPLIER_RANGE),
            ("semantic.organization", self.semantic.organization, MULTIPLIER_RANGE),
            ("strategies.semantic_search", self.strategies.semantic_search, MULTIPLIER_RANGE),
            ("strategies.keyword_search", self.strategies.keyword_search, MULTIPLIER_RANGE),
            ("strategies.intent_driven", self.strategies.intent_driven, MULTIPLIER_RANGE),
            ("geospatial.weight", self.geospatial.weight, MULTIPLIER_RANGE),
            ("geospatial.decay_scale", self.geospatial.decay_scale, DECAY_SCALE_RANGE),
            ("geospatial.decay_offset", self.geospatial.decay_offset, DECAY_OFFSET_RANGE),
            (
                "keyword_variations.nouns_multiplier",
                self.keyword_variations.nouns_multiplier,
                MULTIPLIER_RANGE,
            ),
            (
                "keyword_variations.stemmed_nouns_multiplier",
                self.keyword_variations.stemmed_nouns_multiplier,
                MULTIPLIER_RANGE,
            ),
        ]
    }

    /// Check every field against its range. Returns all violations, not just
    /// the first, so a rejected document can be fixed in one pass.
    pub fn validate(&self) -> Result<(), Vec<WeightValidationError>> {
        let errors: Vec<WeightValidationError> = self
            .bounded_fields()
            .into_iter()
            .filter(|(_, value, (min, max))| !value.is_finite() || value < min || value > max)
            .map(|(field, value, (min, max))| WeightValidationError {
                field,
                value,
                min,
                max,
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Stable identifier of the numeric content of this snapshot. Two
    /// snapshots with equal weights share a fingerprint regardless of their
    /// metadata.
    pub fn fingerprint(&self) -> String {
        let canonical: Vec<String> = self
            .bounded_fields()
            .iter()
            .map(|(field, value, _)| format!("{field}={value}"))
            .collect();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical.join(";").as_bytes());
        id.simple().to_string()[..12].to_string()
    }
}

// ─── Per-request overrides ───────────────────────────────

/// Partial weight document. Any field left out keeps the snapshot's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    #[serde(default)]
    pub semantic: Option<SemanticOverrides>,
    #[serde(default)]
    pub strategies: Option<StrategyOverrides>,
    #[serde(default)]
    pub geospatial: Option<GeospatialOverrides>,
    #[serde(default)]
    pub keyword_variations: Option<KeywordVariationOverrides>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticOverrides {
    pub service: Option<f64>,
    pub taxonomy: Option<f64>,
    pub organization: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyOverrides {
    pub semantic_search: Option<f64>,
    pub keyword_search: Option<f64>,
    pub intent_driven: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeospatialOverrides {
    pub weight: Option<f64>,
    pub decay_scale: Option<f64>,
    pub decay_offset: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordVariationOverrides {
    pub nouns_multiplier: Option<f64>,
    pub stemmed_nouns_multiplier: Option<f64>,
}

fn set(target: &mut f64, value: Option<f64>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl WeightOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Layer these overrides onto `base`. The result is not validated.
    pub fn apply(&self, base: &WeightConfig) -> WeightConfig {
        let mut out = base.clone();
        if let Some(s) = &self.semantic {
            set(&mut out.semantic.service, s.service);
            set(&mut out.semantic.taxonomy, s.taxonomy);
            set(&mut out.semantic.organization, s.organization);
        }
        if let Some(s) = &self.strategies {
            set(&mut out.strategies.semantic_search, s.semantic_search);
            set(&mut out.strategies.keyword_search, s.keyword_search);
            set(&mut out.strategies.intent_driven, s.intent_driven);
        }
        if let Some(g) = &self.geospatial {
            set(&mut out.geospatial.weight, g.weight);
            set(&mut out.geospatial.decay_scale, g.decay_scale);
            set(&mut out.geospatial.decay_offset, g.decay_offset);
        }
        if let Some(k) = &self.keyword_variations {
            set(&mut out.keyword_variations.nouns_multiplier, k.nouns_multiplier);
            set(
                &mut out.keyword_variations.stemmed_nouns_multiplier,
                k.stemmed_nouns_multiplier,
            );
        }
        out
    }

    /// Combine two override sets; fields present in `other` win.
    pub fn merged_with(&self, other: &WeightOverrides) -> WeightOverrides {
        fn pick(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            b.or(a)
        }
        let semantic = match (&self.semantic, &other.semantic) {
            (None, None) => None,
            (a, b) => {
                let a = a.clone().unwrap_or_default();
                let b = b.clone().unwrap_or_default();
                Some(SemanticOverrides {
                    service: pick(a.service, b.service),
                    taxonomy: pick(a.taxonomy, b.taxonomy),
                    organization: pick(a.organization, b.organization),
                })
            }
        };
        let strategies = match (&self.strategies, &other.strategies) {
            (None, None) => None,
            (a, b) => {
                let a = a.clone().unwrap_or_default();
                let b = b.clone().unwrap_or_default();
                Some(StrategyOverrides {
                    semantic_search: pick(a.semantic_search, b.semantic_search),
                    keyword_search: pick(a.keyword_search, b.keyword_search),
                    intent_driven: pick(a.intent_driven, b.intent_driven),
                })
            }
        };
        let geospatial = match (&self.geospatial, &other.geospatial) {
            (None, None) => None,
            (a, b) => {
                let a = a.clone().unwrap_or_default();
                let b = b.clone().unwrap_or_default();
                Some(GeospatialOverrides {
                    weight: pick(a.weight, b.weight),
                    decay_scale: pick(a.decay_scale, b.decay_scale),
                    decay_offset: pick(a.decay_offset, b.decay_offset),
                })
            }
        };
        let keyword_variations = match (&self.keyword_variations, &other.keyword_variations) {
            (None, None) => None,
            (a, b) => {
                let a = a.clone().unwrap_or_default();
                let b = b.clone().unwrap_or_default();
                Some(KeywordVariationOverrides {
                    nouns_multiplier: pick(a.nouns_multiplier, b.nouns_multiplier),
                    stemmed_nouns_multiplier: pick(
                        a.stemmed_nouns_multiplier,
                        b.stemmed_nouns_multiplier,
                    ),
                })
            }
        };
        WeightOverrides {
            semantic,
            strategies,
            geospatial,
            keyword_variations,
        }
    }
}

/// Deprecated flat weight fields still accepted on the search request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyWeights {
    pub semantic_weight: Option<f64>,
    pub keyword_weight: Option<f64>,
    pub intent_weight: Option<f64>,
    pub geo_weight: Option<f64>,
    pub decay_scale: Option<f64>,
    pub decay_offset: Option<f64>,
}

impl LegacyWeights {
    pub fn to_overrides(&self) -> WeightOverrides {
        let strategies = (self.semantic_weight.is_some()
            || self.keyword_weight.is_some()
            || self.intent_weight.is_some())
        .then(|| StrategyOverrides {
            semantic_search: self.semantic_weight,
            keyword_search: self.keyword_weight,
            intent_driven: self.intent_weight,
        });
        let geospatial = (self.geo_weight.is_some()
            || self.decay_scale.is_some()
            || self.decay_offset.is_some())
        .then(|| GeospatialOverrides {
            weight: self.geo_weight,
            decay_scale: self.decay_scale,
            decay_offset: self.decay_offset,
        });
        WeightOverrides {
            strategies,
            geospatial,
            ..Default::default()
        }
    }
}

/// Resolve the weights for one request: snapshot, then legacy fields, then
/// `custom_weights`. The result must pass validation.
pub fn resolve_request_weights(
    snapshot: &WeightConfig,
    legacy: &LegacyWeights,
    custom: Option<&WeightOverrides>,
) -> Result<WeightConfig, Vec<WeightValidationError>> {
    let mut overrides = legacy.to_overrides();
    if let Some(custom) = custom {
        overrides = overrides.merged_with(custom);
    }
    if overrides.is_empty() {
        return Ok(snapshot.clone());
    }
    let resolved = overrides.apply(snapshot);
    resolved.validate()?;
    Ok(resolved)
}
