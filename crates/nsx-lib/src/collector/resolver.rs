//! Resource discovery per class
//!
//! Each class resolves its metric keys, the resource ids to query, and
//! whatever name lookups the shaper needs to build label values.

use crate::client::{get_typed, ControllerApi};
use crate::error::{CollectorError, Result};
use crate::models::{
    ListResponse, MetricKeyDefinition, PolicyObject, ResourceClass, TransportNode,
    EDGE_NODES_PATH, TIER0_PATH, TIER1_PATH, UNDETERMINED,
};
use std::collections::HashMap;
use tracing::debug;

/// Display names of a tier-0 interface and its owning gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceNames {
    pub interface: String,
    pub gateway: String,
}

/// Auxiliary naming data for label derivation, held for one cycle
#[derive(Debug, Clone, Default)]
pub enum LabelContext {
    /// Edge nodes are labelled from the series itself
    #[default]
    None,
    /// Gateway unique id → display name
    DisplayNames(HashMap<String, String>),
    /// Interface unique id → interface and gateway display names
    Interfaces(HashMap<String, InterfaceNames>),
}

impl LabelContext {
    /// Display name for a gateway, or the sentinel when unknown
    pub fn display_name(&self, resource_id: &str) -> &str {
        match self {
            LabelContext::DisplayNames(names) => names
                .get(resource_id)
                .map(String::as_str)
                .unwrap_or(UNDETERMINED),
            _ => UNDETERMINED,
        }
    }

    /// Interface and gateway names, or the sentinel for both when unknown
    pub fn interface_names(&self, resource_id: &str) -> (&str, &str) {
        match self {
            LabelContext::Interfaces(map) => match map.get(resource_id) {
                Some(names) => (names.interface.as_str(), names.gateway.as_str()),
                None => (UNDETERMINED, UNDETERMINED),
            },
            _ => (UNDETERMINED, UNDETERMINED),
        }
    }
}

/// Everything needed to query and label one resource class
#[derive(Debug, Clone)]
pub struct Resolution {
    pub keys: Vec<MetricKeyDefinition>,
    pub resource_ids: Vec<String>,
    pub labels: LabelContext,
}

/// Discovers resources through the controller API
pub struct Resolver<'a> {
    api: &'a dyn ControllerApi,
}

impl<'a> Resolver<'a> {
    pub fn new(api: &'a dyn ControllerApi) -> Self {
        Self { api }
    }

    /// Resolve keys, ids and label context for a class. Any failure aborts
    /// the whole resolution; there is no partial result.
    pub async fn resolve(&self, class: ResourceClass) -> Result<Resolution> {
        let keys = self.metric_keys(class).await?;

        let (resource_ids, labels) = match class {
            ResourceClass::EdgeNode => (self.edge_nodes().await?, LabelContext::None),
            ResourceClass::Tier0Interface => self.tier0_interfaces().await?,
            ResourceClass::Tier1Gateway => self.gateways(TIER1_PATH).await?,
            ResourceClass::Tier0Gateway => self.gateways(TIER0_PATH).await?,
        };

        debug!(
            class = %class,
            keys = keys.len(),
            resources = resource_ids.len(),
            "Resolved resource class"
        );

        Ok(Resolution {
            keys,
            resource_ids,
            labels,
        })
    }

    /// Metric keys the controller exposes for a class
    pub async fn metric_keys(&self, class: ResourceClass) -> Result<Vec<MetricKeyDefinition>> {
        let path = class.key_info_path();
        let list: ListResponse<MetricKeyDefinition> = get_typed(self.api, &path).await?;
        Ok(list.results)
    }

    async fn edge_nodes(&self) -> Result<Vec<String>> {
        let list: ListResponse<TransportNode> = get_typed(self.api, EDGE_NODES_PATH).await?;
        Ok(list.results.into_iter().map(|node| node.id).collect())
    }

    async fn gateways(&self, path: &str) -> Result<(Vec<String>, LabelContext)> {
        let list: ListResponse<PolicyObject> = get_typed(self.api, path).await?;

        let mut ids = Vec::with_capacity(list.results.len());
        let mut names = HashMap::new();
        for gateway in list.results {
            let unique_id = require(path, gateway.unique_id, "unique_id")?;
            if let Some(name) = gateway.display_name {
                names.insert(unique_id.clone(), name);
            }
            ids.push(unique_id);
        }

        Ok((ids, LabelContext::DisplayNames(names)))
    }

    /// Walk tier-0 gateways → locale services → interfaces
    async fn tier0_interfaces(&self) -> Result<(Vec<String>, LabelContext)> {
        let gateways: ListResponse<PolicyObject> = get_typed(self.api, TIER0_PATH).await?;

        let mut ids = Vec::new();
        let mut map = HashMap::new();

        for gateway in gateways.results {
            let gateway_id = require(TIER0_PATH, gateway.id, "id")?;
            let gateway_name = gateway
                .display_name
                .unwrap_or_else(|| UNDETERMINED.to_string());

            let services_path = format!("{}{}/locale-services/", TIER0_PATH, gateway_id);
            let services: ListResponse<PolicyObject> =
                get_typed(self.api, &services_path).await?;

            for service in services.results {
                let service_id = require(&services_path, service.id, "id")?;
                let interfaces_path = format!("{}{}/interfaces", services_path, service_id);
                let interfaces: ListResponse<PolicyObject> =
                    get_typed(self.api, &interfaces_path).await?;

                for interface in interfaces.results {
                    let unique_id = require(&interfaces_path, interface.unique_id, "unique_id")?;
                    map.insert(
                        unique_id.clone(),
                        InterfaceNames {
                            interface: interface
                                .display_name
                                .unwrap_or_else(|| UNDETERMINED.to_string()),
                            gateway: gateway_name.clone(),
                        },
                    );
                    ids.push(unique_id);
                }
            }
        }

        Ok((ids, LabelContext::Interfaces(map)))
    }
}

fn require(path: &str, value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| CollectorError::Shape {
        path: path.to_string(),
        reason: format!("policy object without {}", field),
    })
}
