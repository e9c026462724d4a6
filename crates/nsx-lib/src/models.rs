//! Core data models for the exporter
//!
//! Typed shapes for every controller response we consume, the batch request
//! we send, and the exposition record handed to the scrape renderer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name used when a resource id cannot be resolved to a name
pub const UNDETERMINED: &str = "UNDETERMINED";

/// Aggregation window requested from the metrics endpoint
pub const GRANULARITY: &str = "FIVE_MINUTES";

/// Only the most recent datapoint is ever requested
pub const MAX_DATA_POINTS: u32 = 1;

/// Endpoint for batch metric queries
pub const METRICS_DATA_PATH: &str = "/napp/api/v1/metrics/data";

/// Policy path listing tier-0 gateways
pub const TIER0_PATH: &str = "/policy/api/v1/infra/tier-0s/";

/// Policy path listing tier-1 gateways
pub const TIER1_PATH: &str = "/policy/api/v1/infra/tier-1s/";

/// Transport nodes filtered to edge nodes
pub const EDGE_NODES_PATH: &str = "/api/v1/transport-nodes?node_types=EdgeNode";

/// The monitored object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    EdgeNode,
    Tier0Interface,
    Tier1Gateway,
    Tier0Gateway,
}

impl ResourceClass {
    /// Collection order within one cycle
    pub const ALL: [ResourceClass; 4] = [
        ResourceClass::EdgeNode,
        ResourceClass::Tier0Interface,
        ResourceClass::Tier1Gateway,
        ResourceClass::Tier0Gateway,
    ];

    /// `resource_type` value used by the key-info and metrics-data endpoints
    pub fn resource_type(&self) -> &'static str {
        match self {
            ResourceClass::EdgeNode => "PolicyEdgeNode",
            ResourceClass::Tier0Interface => "Tier0Interface",
            ResourceClass::Tier1Gateway => "Tier1",
            ResourceClass::Tier0Gateway => "Tier0",
        }
    }

    /// Metric name prefix, without the trailing underscore
    pub fn metric_prefix(&self) -> &'static str {
        match self {
            ResourceClass::EdgeNode => "nsx_edge",
            ResourceClass::Tier0Interface => "nsx_tier0int",
            ResourceClass::Tier1Gateway => "nsx_tier1",
            ResourceClass::Tier0Gateway => "nsx_tier0",
        }
    }

    /// Value of the `resourcetype` label
    pub fn label_resource_type(&self) -> &'static str {
        match self {
            ResourceClass::EdgeNode => "EdgeNode",
            ResourceClass::Tier0Interface => "tier0interface",
            ResourceClass::Tier1Gateway => "tier1",
            ResourceClass::Tier0Gateway => "tier0",
        }
    }

    /// Label names, in the order label values are emitted
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            ResourceClass::EdgeNode => &["resourcename", "resourcetype", "nodeid"],
            ResourceClass::Tier0Interface => &[
                "resourcename",
                "resourcetype",
                "edgenode",
                "referringobject",
                "uplinkname",
                "gatewayname",
            ],
            ResourceClass::Tier1Gateway => &[
                "resourcename",
                "resourcetype",
                "edgenode",
                "referringobject",
                "tier1gwname",
            ],
            ResourceClass::Tier0Gateway => &[
                "resourcename",
                "resourcetype",
                "edgenode",
                "referringobject",
                "tier0gwname",
            ],
        }
    }

    /// Path listing the metric keys available for this class
    pub fn key_info_path(&self) -> String {
        format!(
            "/napp/api/v1/metrics/key-info?resource_type={}",
            self.resource_type()
        )
    }

    /// Health component name
    pub fn component_name(&self) -> &'static str {
        match self {
            ResourceClass::EdgeNode => "edge_node",
            ResourceClass::Tier0Interface => "tier0_interface",
            ResourceClass::Tier1Gateway => "tier1_gateway",
            ResourceClass::Tier0Gateway => "tier0_gateway",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component_name())
    }
}

/// Generic `{results: [...]}` list envelope used by every listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub results: Vec<T>,
}

/// One counter exposed by the controller for a resource class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricKeyDefinition {
    pub key: String,
    #[serde(default)]
    pub description: String,
}

/// Transport node entry; only the id is needed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportNode {
    pub id: String,
}

/// Policy object (gateway, locale service or interface)
///
/// `id` is only needed when a child path is built from it, so gateway
/// listings may omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Body of a batch metrics query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBatchRequest {
    pub granularity: String,
    pub max_num_data_points: u32,
    pub keys: Vec<String>,
    pub resource_ids: Vec<String>,
    pub resource_type: String,
}

impl MetricBatchRequest {
    pub fn new(class: ResourceClass, keys: Vec<String>, resource_ids: Vec<String>) -> Self {
        Self {
            granularity: GRANULARITY.to_string(),
            max_num_data_points: MAX_DATA_POINTS,
            keys,
            resource_ids,
            resource_type: class.resource_type().to_string(),
        }
    }
}

/// Response of a batch metrics query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricBatchResult {
    pub results: Vec<ResourceMetrics>,
}

/// Per-resource block of a batch result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub resource_id: String,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
}

/// Per-key block within a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub results: Vec<SeriesResult>,
}

/// Leaf series reported by one node for one object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResult {
    pub object_id: String,
    pub node_name: String,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

impl SeriesResult {
    /// Value of the first datapoint, accepting numbers or numeric strings
    pub fn latest_value(&self) -> Option<f64> {
        let point = self.data.first()?;
        match &point.value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A single datapoint; extra fields such as timestamps are ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub value: serde_json::Value,
}

/// One named, labelled sample ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ExpositionRecord {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub label_values: Vec<String>,
    pub value: f64,
}
