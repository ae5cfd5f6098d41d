use std::sync::Arc;

use serde::Serialize;

use crate::stat::Properties;

/// A single flattened observation, ready to be handed to a sink.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metric {
    pub alias: String,

    /// Decimal text form of the observed value.
    pub value: String,

    /// Fully qualified name, components joined by [`crate::METRIC_SEPARATOR`].
    pub path: String,

    pub properties: Arc<Properties>,
}

impl Metric {
    pub fn new(
        alias: impl Into<String>,
        value: impl Into<String>,
        path: impl Into<String>,
        properties: Arc<Properties>,
    ) -> Self {
        Self {
            alias: alias.into(),
            value: value.into(),
            path: path.into(),
            properties,
        }
    }
}
