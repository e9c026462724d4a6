//! Rendering exposition records in the Prometheus text format
//!
//! Records are grouped into one gauge family per metric name inside a
//! registry that lives only for the current scrape.

use crate::models::ExpositionRecord;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Accumulates records into gauge families for one scrape
pub struct ExpositionSink {
    registry: Registry,
    families: HashMap<String, GaugeVec>,
    seen: HashSet<(String, Vec<String>)>,
    accepted: usize,
    rejected: usize,
}

impl Default for ExpositionSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpositionSink {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            families: HashMap::new(),
            seen: HashSet::new(),
            accepted: 0,
            rejected: 0,
        }
    }

    /// Add a record. Records the exposition format rejects are logged and dropped,
    /// as are repeats of a series already observed in this scrape (first value wins).
    pub fn observe(&mut self, record: ExpositionRecord) {
        let Some(family) = self.family(&record) else {
            self.rejected += 1;
            return;
        };

        let gauge = {
            let values: Vec<&str> = record.label_values.iter().map(String::as_str).collect();
            family.get_metric_with_label_values(&values)
        };
        let gauge = match gauge {
            Ok(gauge) => gauge,
            Err(e) => {
                warn!(
                    metric = %record.name,
                    error = %e,
                    "Dropping record with mismatched labels"
                );
                self.rejected += 1;
                return;
            }
        };

        let series = (record.name, record.label_values);
        if self.seen.contains(&series) {
            warn!(
                metric = %series.0,
                labels = ?series.1,
                "Dropping record that repeats an exported series"
            );
            self.rejected += 1;
            return;
        }

        gauge.set(record.value);
        self.seen.insert(series);
        self.accepted += 1;
    }

    fn family(&mut self, record: &ExpositionRecord) -> Option<&GaugeVec> {
        if !self.families.contains_key(&record.name) {
            let help = if record.help.trim().is_empty() {
                record.name.clone()
            } else {
                record.help.clone()
            };
            let labels: Vec<&str> = record.label_names.iter().map(String::as_str).collect();

            let family = match GaugeVec::new(Opts::new(record.name.clone(), help), &labels) {
                Ok(family) => family,
                Err(e) => {
                    warn!(
                        metric = %record.name,
                        error = %e,
                        "Dropping record with invalid metric name"
                    );
                    return None;
                }
            };
            if let Err(e) = self.registry.register(Box::new(family.clone())) {
                warn!(metric = %record.name, error = %e, "Failed to register metric family");
                return None;
            }
            self.families.insert(record.name.clone(), family);
        }
        self.families.get(&record.name)
    }

    /// Records accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Records dropped so far
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Encode families in the text format
pub fn encode(families: &[MetricFamily], buffer: &mut Vec<u8>) -> prometheus::Result<()> {
    TextEncoder::new().encode(families, buffer)
}

/// Render records followed by the process-global self-metrics
pub fn render<I>(records: I) -> prometheus::Result<(Vec<u8>, usize)>
where
    I: IntoIterator<Item = ExpositionRecord>,
{
    let mut sink = ExpositionSink::new();
    for record in records {
        sink.observe(record);
    }

    let mut buffer = Vec::new();
    encode(&sink.gather(), &mut buffer)?;
    encode(&prometheus::gather(), &mut buffer)?;

    Ok((buffer, sink.accepted()))
}

/// Content type of the text exposition format
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, labels: &[(&str, &str)], value: f64) -> ExpositionRecord {
        ExpositionRecord {
            name: name.to_string(),
            help: format!("{} help", name),
            label_names: labels.iter().map(|(k, _)| k.to_string()).collect(),
            label_values: labels.iter().map(|(_, v)| v.to_string()).collect(),
            value,
        }
    }

    fn text(sink: &ExpositionSink) -> String {
        let mut buffer = Vec::new();
        encode(&sink.gather(), &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_records_with_same_name_share_a_family() {
        let mut sink = ExpositionSink::new();
        sink.observe(record("nsx_tier1_sessions", &[("tier1gwname", "T1_A")], 1.0));
        sink.observe(record("nsx_tier1_sessions", &[("tier1gwname", "T1_B")], 2.0));

        let families = sink.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_metric().len(), 2);
        assert_eq!(sink.accepted(), 2);

        let output = text(&sink);
        assert!(output.contains("# HELP nsx_tier1_sessions nsx_tier1_sessions help"));
        assert!(output.contains("# TYPE nsx_tier1_sessions gauge"));
        assert!(output.contains(r#"nsx_tier1_sessions{tier1gwname="T1_B"} 2"#));
    }

    #[test]
    fn test_empty_help_falls_back_to_name() {
        let mut sink = ExpositionSink::new();
        let mut r = record("nsx_tier0_x", &[("tier0gwname", "T0")], 1.0);
        r.help = String::new();
        sink.observe(r);

        assert!(text(&sink).contains("# HELP nsx_tier0_x nsx_tier0_x"));
    }

    #[test]
    fn test_invalid_metric_name_is_dropped() {
        let mut sink = ExpositionSink::new();
        sink.observe(record("nsx_edge_bad(name)", &[("nodeid", "e1")], 1.0));
        sink.observe(record("nsx_edge_good", &[("nodeid", "e1")], 1.0));

        assert_eq!(sink.accepted(), 1);
        assert_eq!(sink.rejected(), 1);
        assert_eq!(sink.gather().len(), 1);
    }

    #[test]
    fn test_label_count_mismatch_is_dropped() {
        let mut sink = ExpositionSink::new();
        sink.observe(record("nsx_tier0_y", &[("tier0gwname", "T0")], 1.0));
        let mut bad = record("nsx_tier0_y", &[("tier0gwname", "T0")], 1.0);
        bad.label_values.push("extra".to_string());
        sink.observe(bad);

        assert_eq!(sink.accepted(), 1);
        assert_eq!(sink.rejected(), 1);
    }

    #[test]
    fn test_repeated_series_is_dropped_and_keeps_first_value() {
        let mut sink = ExpositionSink::new();
        sink.observe(record("nsx_tier1_sessions", &[("tier1gwname", "T1_App")], 1.0));
        sink.observe(record("nsx_tier1_sessions", &[("tier1gwname", "T1_App")], 2.0));
        sink.observe(record("nsx_tier1_sessions", &[("tier1gwname", "T1_Web")], 3.0));

        assert_eq!(sink.accepted(), 2);
        assert_eq!(sink.rejected(), 1);

        let output = text(&sink);
        assert!(output.contains(r#"nsx_tier1_sessions{tier1gwname="T1_App"} 1"#));
        assert!(!output.contains(r#"nsx_tier1_sessions{tier1gwname="T1_App"} 2"#));
        assert!(output.contains(r#"nsx_tier1_sessions{tier1gwname="T1_Web"} 3"#));
    }

    #[test]
    fn test_render_reports_only_distinct_series() {
        let records = vec![
            record("nsx_tier0_x", &[("tier0gwname", "T0")], 1.0),
            record("nsx_tier0_x", &[("tier0gwname", "T0")], 2.0),
        ];

        let (_, accepted) = render(records).unwrap();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_render_counts_accepted_records() {
        let records = vec![
            record("nsx_edge_cpu_util_edge_1", &[("nodeid", "edge_1")], 12.0),
            record("nsx_edge_mem_edge_1", &[("nodeid", "edge_1")], 34.0),
        ];

        let (buffer, accepted) = render(records).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert_eq!(accepted, 2);
        assert!(output.contains(r#"nsx_edge_cpu_util_edge_1{nodeid="edge_1"} 12"#));
    }
}
