//! The scorecard "highlights" document and the migrations for its stored shapes.
//!
//! Stored shapes seen in the column:
//! - v0: a bare array of highlights, or the whole document serialized into a JSON string;
//! - v1: `{items, metricSignals, score, maxScore, serviceAreas}` with any field missing;
//! - v2: v1 plus `version: 2`, all fields present. Everything is written back as v2.
//!
//! Reading never fails. Unparseable input yields the empty document, and malformed
//! entries inside an otherwise valid document are dropped. Both are logged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

pub const CURRENT_VERSION: u32 = 2;
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

/// Legacy documents used both numeric and string ids.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub service_area: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum SignalTrend {
    Up,
    Down,
    #[default]
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MetricSignal {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    pub metric: String,
    #[serde(default)]
    pub trend: SignalTrend,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
}

/// Fallbacks for a document that does not carry its own score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreDefaults {
    pub score: Option<f64>,
    pub max_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HighlightsDocument {
    pub version: u32,
    pub items: Vec<Highlight>,
    pub metric_signals: Vec<MetricSignal>,
    pub score: f64,
    pub max_score: f64,
    pub service_areas: Vec<String>,
}

/// One AI audit result for a bucket. Replaces the previous AI entries wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct AiBatch {
    pub items: Vec<Highlight>,
    pub metric_signals: Vec<MetricSignal>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub service_areas: Vec<String>,
}

/// Parse each element on its own so one bad entry does not discard the rest.
fn parse_entries<T>(value: Option<&Value>, field: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(value) = value else {
        return Vec::new();
    };
    let Some(entries) = value.as_array() else {
        if !value.is_null() {
            warn!(field = field, "Scorecard field is not an array, ignoring it");
        }
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match T::deserialize(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(field = field, index = index, error = %e, "Dropping malformed scorecard entry");
                None
            }
        })
        .collect()
}

impl HighlightsDocument {
    pub fn empty(defaults: ScoreDefaults) -> Self {
        Self {
            version: CURRENT_VERSION,
            items: Vec::new(),
            metric_signals: Vec::new(),
            score: defaults.score.unwrap_or(0.0),
            max_score: defaults.max_score.unwrap_or(DEFAULT_MAX_SCORE),
            service_areas: Vec::new(),
        }
    }

    /// Read the raw column value.
    pub fn from_stored(raw: Option<&str>, defaults: ScoreDefaults) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Self::empty(defaults);
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::migrate(value, defaults),
            Err(e) => {
                warn!(error = %e, "Scorecard highlights are not valid JSON, starting empty");
                Self::empty(defaults)
            }
        }
    }

    /// Bring any historical shape up to the current version.
    pub fn migrate(value: Value, defaults: ScoreDefaults) -> Self {
        match value {
            Value::Null => Self::empty(defaults),
            Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
                Ok(parsed) => Self::migrate(parsed, defaults),
                Err(e) => {
                    warn!(error = %e, "Scorecard highlights string is not valid JSON, starting empty");
                    Self::empty(defaults)
                }
            },
            Value::Array(items) => {
                let mut wrapped = Map::new();
                wrapped.insert("items".to_string(), Value::Array(items));
                Self::from_object(&wrapped, defaults)
            }
            Value::Object(map) => {
                let version = map.get("version").and_then(Value::as_u64).unwrap_or(0);
                if version > u64::from(CURRENT_VERSION) {
                    warn!(
                        version = version,
                        "Scorecard highlights written by a newer version, reading known fields"
                    );
                }
                Self::from_object(&map, defaults)
            }
            other => {
                warn!(kind = ?other, "Unexpected scorecard highlights value, starting empty");
                Self::empty(defaults)
            }
        }
    }

    fn from_object(map: &Map<String, Value>, defaults: ScoreDefaults) -> Self {
        let service_areas = map
            .get("serviceAreas")
            .and_then(Value::as_array)
            .map(|areas| {
                areas
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut document = Self {
            version: CURRENT_VERSION,
            items: parse_entries(map.get("items"), "items"),
            metric_signals: parse_entries(map.get("metricSignals"), "metricSignals"),
            score: map
                .get("score")
                .and_then(Value::as_f64)
                .or(defaults.score)
                .unwrap_or(0.0),
            max_score: map
                .get("maxScore")
                .and_then(Value::as_f64)
                .or(defaults.max_score)
                .unwrap_or(DEFAULT_MAX_SCORE),
            service_areas,
        };
        document.assign_missing_ids();
        document
    }

    fn assign_missing_ids(&mut self) {
        for item in self.items.iter_mut().filter(|i| i.id.is_empty()) {
            item.id = fresh_id();
        }
        for signal in self.metric_signals.iter_mut().filter(|s| s.id.is_empty()) {
            signal.id = fresh_id();
        }
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Keep human entries and replace every AI entry with `batch`. Batch entries are
    /// always flagged as AI-generated.
    pub fn merge_ai_batch(&mut self, batch: AiBatch) {
        self.items.retain(|item| !item.ai_generated);
        self.items.extend(batch.items.into_iter().map(|mut item| {
            item.ai_generated = true;
            item
        }));

        self.metric_signals.retain(|signal| !signal.ai_generated);
        self.metric_signals
            .extend(batch.metric_signals.into_iter().map(|mut signal| {
                signal.ai_generated = true;
                signal
            }));

        if let Some(score) = batch.score {
            self.score = score;
        }
        if let Some(max_score) = batch.max_score {
            self.max_score = max_score;
        }
        for area in batch.service_areas {
            self.add_service_area(area);
        }
        self.assign_missing_ids();
    }

    fn add_service_area(&mut self, area: String) {
        let area = area.trim();
        if !area.is_empty() && !self.service_areas.iter().any(|a| a.eq_ignore_ascii_case(area)) {
            self.service_areas.push(area.to_string());
        }
    }

    pub fn add_highlight(&mut self, text: &str, service_area: Option<String>) -> &Highlight {
        if let Some(area) = &service_area {
            self.add_service_area(area.clone());
        }
        self.items.push(Highlight {
            id: fresh_id(),
            text: text.trim().to_string(),
            service_area,
            ai_generated: false,
        });
        &self.items[self.items.len() - 1]
    }

    /// Returns whether an entry was removed.
    pub fn remove_highlight(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        before != self.items.len()
    }

    pub fn add_metric_signal(
        &mut self,
        metric: &str,
        trend: SignalTrend,
        note: Option<String>,
    ) -> &MetricSignal {
        self.metric_signals.push(MetricSignal {
            id: fresh_id(),
            metric: metric.trim().to_string(),
            trend,
            note,
            ai_generated: false,
        });
        &self.metric_signals[self.metric_signals.len() - 1]
    }
}
