//! Turns the JSON document served by nginx's virtual host traffic status
//! module into flat, path-qualified metrics.
//!
//! The document has three sections, each visited in turn:
//!
//! ```text
//! connections                   -> Connections
//! serverZones.<zone>            -> Server Zones|<zone>
//! serverZones.<zone>.responses  -> Server Zones|<zone>|Responses
//! upstreamZones.<zone>[i]       -> Upstreams|<zone>|<server>
//! upstreamZones.<zone>[i].responses
//!                               -> Upstreams|<zone>|<server>|Responses
//! ```
//!
//! Every configured metric is looked up in every group object, a metric whose
//! `attr` is missing from the group is simply not produced.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::METRIC_SEPARATOR;
use crate::metric::Metric;
use crate::stat::MetricDef;

const CONNECTIONS: &str = "connections";
const SERVER_ZONES: &str = "serverZones";
const UPSTREAM_ZONES: &str = "upstreamZones";
const RESPONSES: &str = "responses";
const SERVER: &str = "server";

/// Aggregation of all server zones, it is not a zone itself.
const AGGREGATE_ZONE: &str = "*";

#[derive(Debug, Error, PartialEq)]
pub enum FlattenError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing key \"{0}\"")]
    MissingKey(String),

    #[error("value of \"{key}\" is not {expect}")]
    UnexpectedType { key: String, expect: &'static str },
}

/// Flatten the payload against the metric definitions. `prefix` is
/// prepended verbatim to every path, so it should be empty or end with
/// [`METRIC_SEPARATOR`].
///
/// Either all metrics of the payload are returned or none, a structural
/// problem anywhere fails the whole payload.
pub fn flatten(
    payload: &Value,
    prefix: &str,
    defs: &[MetricDef],
) -> Result<Vec<Metric>, FlattenError> {
    let root = payload.as_object().ok_or(FlattenError::NotAnObject)?;
    let mut flattener = Flattener {
        prefix,
        defs,
        metrics: vec![],
    };

    flattener.group(object_field(root, CONNECTIONS)?, "Connections");

    for (name, zone) in object_field(root, SERVER_ZONES)? {
        if name == AGGREGATE_ZONE {
            continue;
        }

        let zone = as_object(zone, name)?;
        let group = format!("Server Zones{METRIC_SEPARATOR}{name}");

        flattener.group(zone, &group);
        flattener.group(
            object_field(zone, RESPONSES)?,
            &format!("{group}{METRIC_SEPARATOR}Responses"),
        );
    }

    for (name, servers) in object_field(root, UPSTREAM_ZONES)? {
        let servers = servers.as_array().ok_or_else(|| unexpected(name, "an array"))?;
        let zone = name.replace(':', "");

        for server in servers {
            let server = as_object(server, name)?;
            let id = server
                .get(SERVER)
                .ok_or_else(|| FlattenError::MissingKey(SERVER.to_string()))?
                .as_str()
                .ok_or_else(|| unexpected(SERVER, "a string"))?
                .replace(':', "-");
            let group = format!("Upstreams{METRIC_SEPARATOR}{zone}{METRIC_SEPARATOR}{id}");

            flattener.group(server, &group);
            flattener.group(
                object_field(server, RESPONSES)?,
                &format!("{group}{METRIC_SEPARATOR}Responses"),
            );
        }
    }

    Ok(flattener.metrics)
}

struct Flattener<'a> {
    prefix: &'a str,
    defs: &'a [MetricDef],
    metrics: Vec<Metric>,
}

impl Flattener<'_> {
    fn group(&mut self, object: &Map<String, Value>, group: &str) {
        for def in self.defs {
            let Some(value) = object.get(def.attr()) else {
                continue;
            };

            self.metrics.push(Metric::new(
                def.alias(),
                render(value),
                format!("{}{group}{METRIC_SEPARATOR}{}", self.prefix, def.alias()),
                Arc::clone(def.properties()),
            ));
        }
    }
}

fn object_field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, FlattenError> {
    let value = object
        .get(key)
        .ok_or_else(|| FlattenError::MissingKey(key.to_string()))?;

    as_object(value, key)
}

fn as_object<'a>(value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, FlattenError> {
    value.as_object().ok_or_else(|| unexpected(key, "an object"))
}

fn unexpected(key: &str, expect: &'static str) -> FlattenError {
    FlattenError::UnexpectedType {
        key: key.to_string(),
        expect,
    }
}

/// Numbers are rendered in plain decimal notation, `f64`'s `Display`
/// never switches to an exponent. Strings lose their quotes, everything
/// else is compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(n) = n.as_u64() {
                n.to_string()
            } else if let Some(n) = n.as_i64() {
                n.to_string()
            } else {
                n.as_f64()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| n.to_string())
            }
        }
        other => other.to_string(),
    }
}
