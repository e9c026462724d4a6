//! Mapping batch results to exposition records
//!
//! Walks resource → key → series and yields one record per leaf datapoint.
//! Metric names and label values are derived with [`normalize`].

use super::resolver::LabelContext;
use crate::models::{
    ExpositionRecord, KeyResult, MetricBatchResult, ResourceClass, ResourceMetrics, SeriesResult,
};
use tracing::debug;

/// Prefix applied to every `resourcename` label value
pub const RESOURCE_NAME_PREFIX: &str = "nappmetrics_";

/// Replace `-`, `.`, `/` and space with `_`
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '-' | '.' | '/' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// Metric name for a key; edge node names also carry the object id
pub fn metric_name(class: ResourceClass, key: &str, object_id: &str) -> String {
    match class {
        ResourceClass::EdgeNode => format!(
            "{}_{}_{}",
            class.metric_prefix(),
            normalize(key),
            normalize(object_id)
        ),
        _ => format!("{}_{}", class.metric_prefix(), normalize(key)),
    }
}

/// Label values in the order of [`ResourceClass::label_names`]
pub fn label_values(
    class: ResourceClass,
    resource_id: &str,
    series: &SeriesResult,
    labels: &LabelContext,
) -> Vec<String> {
    let node = normalize(&series.node_name);

    match class {
        ResourceClass::EdgeNode => vec![
            format!("{}{}", RESOURCE_NAME_PREFIX, node),
            class.label_resource_type().to_string(),
            node,
        ],
        ResourceClass::Tier0Interface => {
            let (interface, gateway) = labels.interface_names(resource_id);
            let interface = normalize(interface);
            vec![
                format!("{}{}_{}", RESOURCE_NAME_PREFIX, interface, node),
                class.label_resource_type().to_string(),
                node,
                normalize(&series.object_id),
                interface,
                normalize(gateway),
            ]
        }
        ResourceClass::Tier1Gateway | ResourceClass::Tier0Gateway => {
            let gateway = normalize(labels.display_name(resource_id));
            vec![
                format!("{}{}_{}", RESOURCE_NAME_PREFIX, gateway, node),
                class.label_resource_type().to_string(),
                node,
                normalize(&series.object_id),
                gateway,
            ]
        }
    }
}

/// Lazily shape one batch result into records
pub fn shape<'a>(
    class: ResourceClass,
    batch: &'a MetricBatchResult,
    labels: &'a LabelContext,
) -> impl Iterator<Item = ExpositionRecord> + 'a {
    batch.results.iter().flat_map(move |resource: &'a ResourceMetrics| {
        resource.key_results.iter().flat_map(move |key: &'a KeyResult| {
            key.results
                .iter()
                .filter_map(move |series| record(class, resource, key, series, labels))
        })
    })
}

fn record(
    class: ResourceClass,
    resource: &ResourceMetrics,
    key: &KeyResult,
    series: &SeriesResult,
    labels: &LabelContext,
) -> Option<ExpositionRecord> {
    let Some(value) = series.latest_value() else {
        debug!(
            class = %class,
            key = %key.key,
            object_id = %series.object_id,
            "Skipping series without a numeric datapoint"
        );
        return None;
    };

    Some(ExpositionRecord {
        name: metric_name(class, &key.key, &series.object_id),
        help: key.description.clone(),
        label_names: class.label_names().iter().map(|s| s.to_string()).collect(),
        label_values: label_values(class, &resource.resource_id, series, labels),
        value,
    })
}
