use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Declared fields of a metric definition rendered as strings. They travel
/// with every metric produced from the definition, so the sink can decide
/// how to aggregate or roll up the value.
pub type Properties = BTreeMap<String, String>;

/// Describes one value to pick from every group object of the payload.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    /// The key of the value inside a group object, e.g. `requestCounter`.
    pub attr: String,

    /// The last component of the metric path.
    pub alias: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_roll_up_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_roll_up_type: Option<String>,

    /// The sink should report the difference between two observations
    /// instead of the observed value.
    #[serde(default)]
    pub delta: bool,

    /// Value substitutions the sink applies before reporting, e.g. `UP: "1"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub convert: BTreeMap<String, String>,
}

impl MetricConfig {
    pub fn new(attr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            alias: alias.into(),
            multiplier: None,
            aggregation_type: None,
            time_roll_up_type: None,
            cluster_roll_up_type: None,
            delta: false,
            convert: BTreeMap::new(),
        }
    }

    /// Renders the fields that are set. `attr` and `alias` are always present.
    pub fn properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.insert("attr".to_string(), self.attr.clone());
        properties.insert("alias".to_string(), self.alias.clone());

        if let Some(multiplier) = self.multiplier {
            properties.insert("multiplier".to_string(), multiplier.to_string());
        }

        for (key, value) in [
            ("aggregation_type", &self.aggregation_type),
            ("time_roll_up_type", &self.time_roll_up_type),
            ("cluster_roll_up_type", &self.cluster_roll_up_type),
        ] {
            if let Some(value) = value {
                properties.insert(key.to_string(), value.clone());
            }
        }

        if self.delta {
            properties.insert("delta".to_string(), "true".to_string());
        }

        if !self.convert.is_empty() {
            let convert = self
                .convert
                .iter()
                .map(|(from, to)| format!("{from}={to}"))
                .collect::<Vec<_>>()
                .join(",");
            properties.insert("convert".to_string(), convert);
        }

        properties
    }
}

/// A metric definition together with its rendered properties, which are
/// shared by every metric built from it.
#[derive(Clone, Debug)]
pub struct MetricDef {
    config: MetricConfig,
    properties: Arc<Properties>,
}

impl From<MetricConfig> for MetricDef {
    fn from(config: MetricConfig) -> Self {
        let properties = Arc::new(config.properties());

        Self { config, properties }
    }
}

impl MetricDef {
    #[inline]
    pub fn attr(&self) -> &str {
        &self.config.attr
    }

    #[inline]
    pub fn alias(&self) -> &str {
        &self.config.alias
    }

    #[inline]
    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StatConfig {
    name: String,

    #[serde(default)]
    metrics: Vec<MetricConfig>,
}

/// A named set of metric definitions collected from one endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "StatConfig")]
pub struct Stat {
    name: String,
    metrics: Vec<MetricDef>,
}

impl From<StatConfig> for Stat {
    fn from(config: StatConfig) -> Self {
        Stat::new(config.name, config.metrics)
    }
}

impl Stat {
    pub fn new(name: impl Into<String>, metrics: Vec<MetricConfig>) -> Self {
        Self {
            name: name.into(),
            metrics: metrics.into_iter().map(MetricDef::from).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &[MetricDef] {
        &self.metrics
    }
}
