//! Metric collection from the controller
//!
//! One collection cycle walks the four resource classes in order. For each
//! class the resolver discovers keys and resources, the fetcher issues the
//! chunked batch queries, and the shaper turns results into exposition
//! records. A failing class is recorded and skipped; a transport failure
//! also skips every class after it.

mod fetcher;
mod resolver;
mod shaper;

#[cfg(test)]
mod tests;

pub use fetcher::{build_requests, chunk, MetricFetcher, DEFAULT_CHUNK_SIZE};
pub use resolver::{InterfaceNames, LabelContext, Resolution, Resolver};
pub use shaper::{label_values, metric_name, normalize, shape, RESOURCE_NAME_PREFIX};

use crate::client::ControllerApi;
use crate::error::CollectorError;
use crate::health::{components, HealthRegistry};
use crate::models::{ExpositionRecord, MetricBatchResult, ResourceClass};
use crate::observability::{ExporterMetrics, StructuredLogger};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Configuration for a collection cycle
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Metric keys per batch request (default: 5)
    pub chunk_size: usize,
    /// Classes collected each cycle, in order
    pub classes: Vec<ResourceClass>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            classes: ResourceClass::ALL.to_vec(),
        }
    }
}

/// What happened to one class during a cycle
#[derive(Debug)]
pub enum ClassOutcome {
    /// Batches fetched; records are shaped lazily from them
    Collected {
        batches: Vec<MetricBatchResult>,
        labels: LabelContext,
    },
    /// Resolution or fetching failed
    Failed(CollectorError),
    /// Not attempted because an earlier class lost the controller
    Skipped,
}

/// Per-class result within a cycle
#[derive(Debug)]
pub struct ClassReport {
    pub class: ResourceClass,
    pub outcome: ClassOutcome,
}

impl ClassReport {
    /// Lazily shaped records; empty unless the class was collected
    pub fn records(&self) -> Box<dyn Iterator<Item = ExpositionRecord> + '_> {
        match &self.outcome {
            ClassOutcome::Collected { batches, labels } => {
                let class = self.class;
                Box::new(
                    batches
                        .iter()
                        .flat_map(move |batch| shape(class, batch, labels)),
                )
            }
            _ => Box::new(std::iter::empty()),
        }
    }
}

/// Result of one full collection cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    pub classes: Vec<ClassReport>,
}

impl CycleReport {
    /// All records of all collected classes, shaped on demand
    pub fn records(&self) -> impl Iterator<Item = ExpositionRecord> + '_ {
        self.classes.iter().flat_map(ClassReport::records)
    }

    pub fn succeeded(&self) -> usize {
        self.classes
            .iter()
            .filter(|c| matches!(c.outcome, ClassOutcome::Collected { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.classes
            .iter()
            .filter(|c| matches!(c.outcome, ClassOutcome::Failed(_)))
            .count()
    }

    /// True when classes were attempted and none of them succeeded
    pub fn is_total_failure(&self) -> bool {
        !self.classes.is_empty() && self.succeeded() == 0
    }
}

/// Runs collection cycles against the controller
pub struct NsxCollector {
    api: Arc<dyn ControllerApi>,
    config: CollectorConfig,
    health: HealthRegistry,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
}

impl NsxCollector {
    pub fn new(
        api: Arc<dyn ControllerApi>,
        config: CollectorConfig,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            api,
            config,
            health,
            metrics: ExporterMetrics::new(),
            logger,
        }
    }

    /// Register health components for every configured class
    pub async fn register_health(&self) {
        self.health.register(components::CONTROLLER).await;
        for class in &self.config.classes {
            self.health.register(class.component_name()).await;
        }
    }

    /// Run one cycle over all configured classes, sequentially
    pub async fn collect(&self) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::default();
        let mut controller_lost = false;

        for &class in &self.config.classes {
            if controller_lost {
                report.classes.push(ClassReport {
                    class,
                    outcome: ClassOutcome::Skipped,
                });
                continue;
            }

            let outcome = match self.collect_class(class).await {
                Ok((batches, labels)) => {
                    self.health.set_healthy(class.component_name()).await;
                    ClassOutcome::Collected { batches, labels }
                }
                Err(e) => {
                    self.metrics.inc_class_failure(class.component_name());
                    self.logger.log_class_failure(class.component_name(), &e);
                    self.health
                        .set_degraded(class.component_name(), e.to_string())
                        .await;
                    if e.is_transport() {
                        controller_lost = true;
                    }
                    ClassOutcome::Failed(e)
                }
            };
            report.classes.push(ClassReport { class, outcome });
        }

        if controller_lost {
            self.health
                .set_unhealthy(components::CONTROLLER, "Controller unreachable")
                .await;
        } else {
            self.health.set_healthy(components::CONTROLLER).await;
        }

        let elapsed = start.elapsed();
        self.metrics.observe_scrape_duration(elapsed.as_secs_f64());
        info!(
            event = "cycle_complete",
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Collection cycle complete"
        );

        report
    }

    async fn collect_class(
        &self,
        class: ResourceClass,
    ) -> Result<(Vec<MetricBatchResult>, LabelContext), CollectorError> {
        let resolution = Resolver::new(self.api.as_ref()).resolve(class).await?;

        if resolution.keys.is_empty() || resolution.resource_ids.is_empty() {
            debug!(class = %class, "Nothing to query for resource class");
            return Ok((Vec::new(), resolution.labels));
        }

        let batches = MetricFetcher::new(self.api.as_ref(), self.config.chunk_size)
            .fetch_all(class, &resolution.keys, &resolution.resource_ids)
            .await?;

        Ok((batches, resolution.labels))
    }
}
