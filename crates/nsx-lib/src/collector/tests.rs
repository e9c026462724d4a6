//! Collection cycle tests
//!
//! These tests run the resolver, fetcher and shaper against an in-memory
//! controller that serves canned listings and synthesizes metric results
//! from each batch request.

#[cfg(test)]
mod fake_controller_tests {
    use crate::client::{async_trait, ControllerApi};
    use crate::collector::{ClassOutcome, CollectorConfig, LabelContext, NsxCollector, Resolver};
    use crate::error::{CollectorError, Result};
    use crate::health::{components, ComponentStatus, HealthRegistry};
    use crate::models::{ExpositionRecord, MetricBatchRequest, ResourceClass, METRICS_DATA_PATH};
    use crate::observability::StructuredLogger;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    enum Reply {
        Json(Value),
        Status(u16),
        Unreachable,
    }

    /// Controller double keyed by request path
    #[derive(Default)]
    struct FakeController {
        replies: HashMap<String, Reply>,
        posts: Mutex<Vec<MetricBatchRequest>>,
    }

    impl FakeController {
        fn with(mut self, path: &str, reply: Reply) -> Self {
            self.replies.insert(path.to_string(), reply);
            self
        }

        fn keys(self, class: ResourceClass, keys: &[&str]) -> Self {
            let results: Vec<Value> = keys
                .iter()
                .map(|k| json!({"key": k, "description": format!("{} description", k)}))
                .collect();
            self.with(&class.key_info_path(), Reply::Json(json!({ "results": results })))
        }

        fn posts(&self) -> Vec<MetricBatchRequest> {
            self.posts.lock().unwrap().clone()
        }

        /// Standard topology: one edge node, one tier-0 with one uplink, one tier-1
        fn topology() -> Self {
            FakeController::default()
                .keys(ResourceClass::EdgeNode, &["cpu.util"])
                .keys(ResourceClass::Tier0Interface, &["rx.bytes"])
                .keys(ResourceClass::Tier1Gateway, &["sessions"])
                .keys(ResourceClass::Tier0Gateway, &["bgp.neighbors"])
                .with(
                    "/api/v1/transport-nodes?node_types=EdgeNode",
                    Reply::Json(json!({"results": [{"id": "edge-1"}]})),
                )
                .with(
                    "/policy/api/v1/infra/tier-0s/",
                    Reply::Json(json!({"results": [
                        {"id": "t0-east", "unique_id": "u-t0-east", "display_name": "GW-East"}
                    ]})),
                )
                .with(
                    "/policy/api/v1/infra/tier-0s/t0-east/locale-services/",
                    Reply::Json(json!({"results": [{"id": "default"}]})),
                )
                .with(
                    "/policy/api/v1/infra/tier-0s/t0-east/locale-services/default/interfaces",
                    Reply::Json(json!({"results": [
                        {"id": "uplink1", "unique_id": "if-1", "display_name": "Uplink1"}
                    ]})),
                )
                .with(
                    "/policy/api/v1/infra/tier-1s/",
                    Reply::Json(json!({"results": [
                        {"id": "t1-app", "unique_id": "u-t1-app", "display_name": "T1-App"}
                    ]})),
                )
        }
    }

    fn transport_error(path: &str) -> CollectorError {
        let source = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        CollectorError::Transport {
            path: path.to_string(),
            source,
        }
    }

    #[async_trait]
    impl ControllerApi for FakeController {
        async fn get_json(&self, path: &str) -> Result<Value> {
            match self.replies.get(path) {
                Some(Reply::Json(value)) => Ok(value.clone()),
                Some(Reply::Status(status)) => Err(CollectorError::Api {
                    status: *status,
                    path: path.to_string(),
                }),
                Some(Reply::Unreachable) => Err(transport_error(path)),
                None => Err(CollectorError::Api {
                    status: 404,
                    path: path.to_string(),
                }),
            }
        }

        async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
            assert_eq!(path, METRICS_DATA_PATH);
            let request: MetricBatchRequest = serde_json::from_value(body.clone()).unwrap();
            self.posts.lock().unwrap().push(request.clone());

            // One series per (resource, key), reported by edge-a
            let results: Vec<Value> = request
                .resource_ids
                .iter()
                .map(|id| {
                    let key_results: Vec<Value> = request
                        .keys
                        .iter()
                        .map(|k| {
                            json!({
                                "key": k,
                                "description": format!("{} description", k),
                                "results": [{
                                    "object_id": id,
                                    "node_name": "edge-a",
                                    "data": [{"value": 1.5}]
                                }]
                            })
                        })
                        .collect();
                    json!({"resource_id": id, "key_results": key_results})
                })
                .collect();
            Ok(json!({ "results": results }))
        }
    }

    fn collector(api: Arc<FakeController>, health: HealthRegistry) -> NsxCollector {
        NsxCollector::new(
            api,
            CollectorConfig::default(),
            health,
            StructuredLogger::new("fake-controller"),
        )
    }

    fn label<'a>(record: &'a ExpositionRecord, name: &str) -> &'a str {
        let idx = record.label_names.iter().position(|n| n == name).unwrap();
        &record.label_values[idx]
    }

    #[tokio::test]
    async fn test_twelve_keys_issue_three_batches() {
        let keys: Vec<String> = (0..12).map(|i| format!("key.{}", i)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let api = Arc::new(FakeController::topology().keys(ResourceClass::EdgeNode, &key_refs));
        let config = CollectorConfig {
            classes: vec![ResourceClass::EdgeNode],
            ..Default::default()
        };
        let collector = NsxCollector::new(
            api.clone(),
            config,
            HealthRegistry::new(),
            StructuredLogger::new("fake-controller"),
        );

        let report = collector.collect().await;

        let posts = api.posts();
        let sizes: Vec<usize> = posts.iter().map(|p| p.keys.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);

        let sent: Vec<String> = posts.iter().flat_map(|p| p.keys.clone()).collect();
        assert_eq!(sent, keys);

        assert_eq!(report.records().count(), 12);
    }

    #[tokio::test]
    async fn test_tier0_interface_resolution_joins_gateway_names() {
        let api = FakeController::topology();
        let resolution = Resolver::new(&api)
            .resolve(ResourceClass::Tier0Interface)
            .await
            .unwrap();

        assert_eq!(resolution.resource_ids, vec!["if-1".to_string()]);
        assert_eq!(resolution.keys[0].key, "rx.bytes");
        match &resolution.labels {
            LabelContext::Interfaces(map) => {
                assert_eq!(map["if-1"].interface, "Uplink1");
                assert_eq!(map["if-1"].gateway, "GW-East");
            }
            other => panic!("unexpected label context {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tier0_interface_names_fall_back_to_sentinel() {
        let api = FakeController::topology()
            .with(
                "/policy/api/v1/infra/tier-0s/",
                Reply::Json(json!({"results": [{"id": "t0-east", "unique_id": "u-t0-east"}]})),
            )
            .with(
                "/policy/api/v1/infra/tier-0s/t0-east/locale-services/default/interfaces",
                Reply::Json(json!({"results": [{"id": "uplink1", "unique_id": "if-1"}]})),
            );

        let resolution = Resolver::new(&api)
            .resolve(ResourceClass::Tier0Interface)
            .await
            .unwrap();

        assert_eq!(resolution.resource_ids, vec!["if-1".to_string()]);
        assert_eq!(
            resolution.labels.interface_names("if-1"),
            ("UNDETERMINED", "UNDETERMINED")
        );
    }

    #[tokio::test]
    async fn test_gateway_listing_does_not_need_id() {
        let api = FakeController::topology().with(
            "/policy/api/v1/infra/tier-1s/",
            Reply::Json(json!({"results": [{"unique_id": "u-t1-app", "display_name": "T1-App"}]})),
        );

        let resolution = Resolver::new(&api)
            .resolve(ResourceClass::Tier1Gateway)
            .await
            .unwrap();

        assert_eq!(resolution.resource_ids, vec!["u-t1-app".to_string()]);
        assert_eq!(resolution.labels.display_name("u-t1-app"), "T1-App");
    }

    #[tokio::test]
    async fn test_tier0_without_id_fails_interface_resolution() {
        let api = FakeController::topology().with(
            "/policy/api/v1/infra/tier-0s/",
            Reply::Json(json!({"results": [
                {"unique_id": "u-t0-east", "display_name": "GW-East"}
            ]})),
        );

        let err = Resolver::new(&api)
            .resolve(ResourceClass::Tier0Interface)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Shape { .. }));

        let gateways = Resolver::new(&api)
            .resolve(ResourceClass::Tier0Gateway)
            .await
            .unwrap();
        assert_eq!(gateways.resource_ids, vec!["u-t0-east".to_string()]);
    }

    #[tokio::test]
    async fn test_gateway_without_unique_id_fails_resolution() {
        let api = FakeController::topology().with(
            "/policy/api/v1/infra/tier-1s/",
            Reply::Json(json!({"results": [{"id": "t1-app", "display_name": "T1-App"}]})),
        );

        let err = Resolver::new(&api)
            .resolve(ResourceClass::Tier1Gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Shape { .. }));
    }

    #[tokio::test]
    async fn test_listing_without_results_is_malformed() {
        let api = FakeController::topology().with(
            "/api/v1/transport-nodes?node_types=EdgeNode",
            Reply::Json(json!({"error_code": 98})),
        );

        let err = Resolver::new(&api)
            .resolve(ResourceClass::EdgeNode)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_full_cycle_emits_every_class() {
        let api = Arc::new(FakeController::topology());
        let report = collector(api, HealthRegistry::new()).collect().await;

        assert_eq!(report.succeeded(), 4);
        let records: Vec<ExpositionRecord> = report.records().collect();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "nsx_edge_cpu_util_edge_1",
                "nsx_tier0int_rx_bytes",
                "nsx_tier1_sessions",
                "nsx_tier0_bgp_neighbors",
            ]
        );

        let interface = &records[1];
        assert_eq!(label(interface, "uplinkname"), "Uplink1");
        assert_eq!(label(interface, "gatewayname"), "GW_East");
        assert_eq!(label(interface, "edgenode"), "edge_a");

        let tier1 = &records[2];
        assert_eq!(label(tier1, "tier1gwname"), "T1_App");
        assert_eq!(label(tier1, "resourcename"), "nappmetrics_T1_App_edge_a");

        let tier0 = &records[3];
        assert_eq!(label(tier0, "tier0gwname"), "GW_East");
        assert_eq!(tier0.value, 1.5);
    }

    #[tokio::test]
    async fn test_api_error_in_one_class_does_not_stop_others() {
        let api = Arc::new(
            FakeController::topology().with("/policy/api/v1/infra/tier-1s/", Reply::Status(500)),
        );
        let health = HealthRegistry::new();
        let collector = collector(api, health.clone());
        collector.register_health().await;

        let report = collector.collect().await;

        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_total_failure());
        assert!(matches!(
            report.classes[2].outcome,
            ClassOutcome::Failed(CollectorError::Api { status: 500, .. })
        ));
        assert!(report.records().all(|r| !r.name.starts_with("nsx_tier1_")));
        assert_eq!(report.records().count(), 3);

        let status = health.health().await;
        assert_eq!(status.status, ComponentStatus::Degraded);
        assert_eq!(
            status.components["tier1_gateway"].status,
            ComponentStatus::Degraded
        );
        assert_eq!(
            status.components[components::CONTROLLER].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_transport_error_skips_remaining_classes() {
        let api = Arc::new(FakeController::topology().with(
            &ResourceClass::Tier0Interface.key_info_path(),
            Reply::Unreachable,
        ));
        let health = HealthRegistry::new();
        let report = collector(api, health.clone()).collect().await;

        let outcomes: Vec<&str> = report
            .classes
            .iter()
            .map(|c| match c.outcome {
                ClassOutcome::Collected { .. } => "collected",
                ClassOutcome::Failed(_) => "failed",
                ClassOutcome::Skipped => "skipped",
            })
            .collect();
        assert_eq!(outcomes, vec!["collected", "failed", "skipped", "skipped"]);
        assert_eq!(report.records().count(), 1);

        let status = health.health().await;
        assert_eq!(
            status.components[components::CONTROLLER].status,
            ComponentStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_every_class_failing_is_total_failure() {
        let api = Arc::new(FakeController::default());
        let report = collector(api, HealthRegistry::new()).collect().await;

        assert_eq!(report.failed(), 4);
        assert!(report.is_total_failure());
        assert_eq!(report.records().count(), 0);
    }

    #[tokio::test]
    async fn test_class_without_resources_sends_no_batches() {
        let api = Arc::new(FakeController::topology().with(
            "/api/v1/transport-nodes?node_types=EdgeNode",
            Reply::Json(json!({"results": []})),
        ));
        let config = CollectorConfig {
            classes: vec![ResourceClass::EdgeNode],
            ..Default::default()
        };
        let collector = NsxCollector::new(
            api.clone(),
            config,
            HealthRegistry::new(),
            StructuredLogger::new("fake-controller"),
        );

        let report = collector.collect().await;

        assert!(api.posts().is_empty());
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.records().count(), 0);
    }

    #[tokio::test]
    async fn test_custom_chunk_size_is_respected() {
        let api = Arc::new(
            FakeController::topology().keys(ResourceClass::Tier1Gateway, &["a", "b", "c"]),
        );
        let config = CollectorConfig {
            chunk_size: 2,
            classes: vec![ResourceClass::Tier1Gateway],
        };
        let collector = NsxCollector::new(
            api.clone(),
            config,
            HealthRegistry::new(),
            StructuredLogger::new("fake-controller"),
        );

        collector.collect().await;

        let posts = api.posts();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.resource_type == "Tier1"));
        assert!(posts.iter().all(|p| p.resource_ids == vec!["u-t1-app".to_string()]));
    }
}
