// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Table rendering of the dashboard views

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Section, Tabular};
use crate::config::Config;
use crate::correlator::EventSummary;
use crate::kubernetes::resources::RESOURCE_REGISTRY;
use crate::metrics::{CPU_USAGE, MEMORY_USAGE, Metric};
use crate::workloads::{
    ControllerDetail, ControllerView, CronJobView, Listing, ObjectSummary, Overview, PodView,
    ResourceList,
};

/// A value that renders as a single table row
trait Row {
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

fn rows_section<T: Row>(items: &[T]) -> Section {
    Section {
        rows: items.iter().map(Row::cells).collect(),
        ..Section::new(T::COLUMNS)
    }
}

fn timestamp(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn namespace(object: &ObjectSummary) -> String {
    object.namespace.clone().unwrap_or_default()
}

fn millicores(value: f64) -> String {
    format!("{:.0}m", value)
}

fn mebibytes(value: f64) -> String {
    format!("{:.0}Mi", value / (1024.0 * 1024.0))
}

fn metric_value(metric_name: &str, value: f64) -> String {
    match metric_name {
        CPU_USAGE => millicores(value),
        MEMORY_USAGE => mebibytes(value),
        _ => format!("{:.2}", value),
    }
}

fn warning_messages(warnings: &[EventSummary]) -> String {
    warnings
        .iter()
        .map(|w| w.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Row for ObjectSummary {
    const COLUMNS: &'static [&'static str] = &["namespace", "name", "status", "created", "labels"];

    fn cells(&self) -> Vec<String> {
        vec![
            namespace(self),
            self.name.clone(),
            self.status.clone(),
            timestamp(self.creation_timestamp),
            labels(&self.labels),
        ]
    }
}

impl Row for PodView {
    const COLUMNS: &'static [&'static str] = &[
        "namespace", "name", "status", "restarts", "node", "cpu", "memory", "created", "warnings",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            namespace(&self.object),
            self.object.name.clone(),
            self.object.status.clone(),
            self.restart_count.to_string(),
            self.node_name.clone().unwrap_or_default(),
            self.cpu_millicores.map(millicores).unwrap_or_else(|| "-".into()),
            self.memory_bytes.map(mebibytes).unwrap_or_else(|| "-".into()),
            timestamp(self.object.creation_timestamp),
            warning_messages(&self.warnings),
        ]
    }
}

impl Row for ControllerView {
    const COLUMNS: &'static [&'static str] = &[
        "namespace", "name", "pods", "running", "pending", "failed", "images", "created",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            namespace(&self.object),
            self.object.name.clone(),
            format!("{}/{}", self.pods.current, self.pods.desired),
            self.pods.running.to_string(),
            self.pods.pending.to_string(),
            self.pods.failed.to_string(),
            self.container_images.join(","),
            timestamp(self.object.creation_timestamp),
        ]
    }
}

impl Row for CronJobView {
    const COLUMNS: &'static [&'static str] = &[
        "namespace",
        "name",
        "schedule",
        "suspend",
        "active",
        "jobs",
        "succeeded",
        "failed",
        "last schedule",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            namespace(&self.object),
            self.object.name.clone(),
            self.schedule.clone(),
            self.suspend.to_string(),
            self.active.to_string(),
            self.jobs.len().to_string(),
            self.pods.succeeded.to_string(),
            self.pods.failed.to_string(),
            timestamp(self.last_schedule),
        ]
    }
}

impl Row for EventSummary {
    const COLUMNS: &'static [&'static str] =
        &["type", "reason", "object", "count", "last seen", "message"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.type_.clone(),
            self.reason.clone(),
            format!("{}/{}", self.object_kind, self.object_name),
            self.count.to_string(),
            timestamp(self.last_seen),
            self.message.clone(),
        ]
    }
}

impl Row for Metric {
    const COLUMNS: &'static [&'static str] = &["metric", "aggregation", "points", "latest"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.metric_name.clone(),
            self.aggregation.to_string(),
            self.data_points.len().to_string(),
            self.data_points
                .last()
                .map(|p| metric_value(&self.metric_name, p.value))
                .unwrap_or_else(|| "-".into()),
        ]
    }
}

/// Registry entry of one listable kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindRow {
    pub name: String,
    pub aliases: Vec<String>,
    pub api_version: String,
    pub namespaced: bool,
}

impl KindRow {
    /// Every registered kind, sorted by plural name
    pub fn all() -> Vec<Self> {
        RESOURCE_REGISTRY
            .list()
            .into_iter()
            .map(|info| KindRow {
                name: info.plural.clone(),
                aliases: info.aliases.clone(),
                api_version: info.api_version().to_string(),
                namespaced: info.namespaced,
            })
            .collect()
    }
}

impl Row for KindRow {
    const COLUMNS: &'static [&'static str] = &["name", "aliases", "api version", "namespaced"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.aliases.join(","),
            self.api_version.clone(),
            self.namespaced.to_string(),
        ]
    }
}

impl<T: Row> Tabular for Vec<T> {
    fn sections(&self) -> Vec<Section> {
        vec![rows_section(self)]
    }
}

/// Items section plus a metrics section when any series came back
fn list_sections<T: Row>(list: &ResourceList<T>, title: Option<&str>) -> Vec<Section> {
    let mut items = rows_section(&list.items);
    items.total = Some(list.list_meta.total_items);
    items.title = title.map(String::from);

    let mut sections = vec![items];
    if !list.cumulative_metrics.is_empty() {
        let metrics_title = match title {
            Some(title) => format!("{} metrics", title),
            None => "metrics".to_string(),
        };
        sections.push(rows_section(&list.cumulative_metrics).titled(metrics_title));
    }
    sections
}

impl<T: Row> Tabular for ResourceList<T> {
    fn sections(&self) -> Vec<Section> {
        list_sections(self, None)
    }
}

impl Tabular for Listing {
    fn sections(&self) -> Vec<Section> {
        match self {
            Listing::Pods(list) => list.sections(),
            Listing::Controllers(list) => list.sections(),
            Listing::CronJobs(list) => list.sections(),
            Listing::Objects(list) => list.sections(),
        }
    }
}

impl Tabular for ControllerDetail {
    fn sections(&self) -> Vec<Section> {
        let summary = Section {
            rows: vec![vec![
                namespace(&self.object),
                self.object.name.clone(),
                format!("{}/{}", self.pods.current, self.pods.desired),
                self.pods.running.to_string(),
                self.pods.pending.to_string(),
                self.pods.failed.to_string(),
                self.pods.succeeded.to_string(),
                self.container_images.join(","),
            ]],
            ..Section::new(&[
                "namespace",
                "name",
                "pods",
                "running",
                "pending",
                "failed",
                "succeeded",
                "images",
            ])
        }
        .titled(self.object.kind.to_string());

        let mut sections = vec![summary];
        sections.extend(list_sections(&self.pod_list, Some("pods")));
        sections.push(rows_section(&self.events).titled("events"));
        sections
    }
}

impl Tabular for Overview {
    fn sections(&self) -> Vec<Section> {
        let lists = [
            ("namespaces", &self.cluster.namespaces),
            ("nodes", &self.cluster.nodes),
            ("persistent volumes", &self.cluster.persistent_volumes),
            ("storage classes", &self.cluster.storage_classes),
            ("services", &self.discovery.services),
            ("ingresses", &self.discovery.ingresses),
            ("config maps", &self.config.config_maps),
            ("secrets", &self.config.secrets),
            ("persistent volume claims", &self.config.persistent_volume_claims),
        ];
        lists
            .into_iter()
            .flat_map(|(title, list)| list_sections(list, Some(title)))
            .collect()
    }
}

impl Tabular for Config {
    fn sections(&self) -> Vec<Section> {
        let setting = |name: &str, value: String| vec![name.to_string(), value];
        let rows = vec![
            setting("context", self.context.clone().unwrap_or_default()),
            setting(
                "default_namespace",
                self.default_namespace.clone().unwrap_or_default(),
            ),
            setting("items_per_page", self.items_per_page.to_string()),
            setting("metrics_enabled", self.metrics_enabled.to_string()),
            setting("metric_resolution_secs", self.metric_resolution_secs.to_string()),
            setting("created_by_policy", format!("{:?}", self.created_by_policy)),
        ];
        vec![Section {
            rows,
            ..Section::new(&["setting", "value"])
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::PodInfo;
    use crate::kubernetes::ResourceKind;
    use crate::metrics::{AggregationMode, DataPoint};
    use crate::workloads::ListMeta;

    fn summary(name: &str) -> ObjectSummary {
        ObjectSummary {
            kind: ResourceKind::Deployment,
            name: name.to_string(),
            namespace: Some("default".to_string()),
            labels: BTreeMap::from([("app".to_string(), name.to_string())]),
            creation_timestamp: None,
            status: String::new(),
        }
    }

    fn controller(name: &str) -> ControllerView {
        ControllerView {
            object: summary(name),
            container_images: vec!["nginx:1.27".to_string(), "envoy:1.30".to_string()],
            pods: PodInfo {
                current: 2,
                desired: 3,
                running: 2,
                ..PodInfo::default()
            },
        }
    }

    #[test]
    fn test_controller_row() {
        assert_eq!(
            controller("web").cells(),
            vec!["default", "web", "2/3", "2", "0", "0", "nginx:1.27,envoy:1.30", ""]
        );
    }

    #[test]
    fn test_list_sections_carry_total_and_metrics() {
        let list = ResourceList {
            list_meta: ListMeta { total_items: 5 },
            items: vec![controller("web")],
            cumulative_metrics: vec![Metric {
                metric_name: CPU_USAGE.to_string(),
                aggregation: AggregationMode::Sum,
                data_points: vec![DataPoint {
                    timestamp: 60,
                    value: 250.0,
                }],
                resources: Vec::new(),
            }],
        };
        let sections = list.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].total, Some(5));
        assert_eq!(sections[0].columns.len(), ControllerView::COLUMNS.len());
        assert_eq!(sections[1].title.as_deref(), Some("metrics"));
        assert_eq!(sections[1].rows[0], vec!["cpu/usage_rate", "sum", "1", "250m"]);
    }

    #[test]
    fn test_object_row_renders_labels() {
        let cells = summary("api").cells();
        assert_eq!(cells[4], "app=api");
    }

    #[test]
    fn test_metric_units() {
        assert_eq!(metric_value(MEMORY_USAGE, 128.0 * 1024.0 * 1024.0), "128Mi");
        assert_eq!(metric_value(CPU_USAGE, 12.4), "12m");
        assert_eq!(metric_value("other", 1.5), "1.50");
    }

    #[test]
    fn test_every_kind_is_listed() {
        let kinds = KindRow::all();
        assert_eq!(kinds.len(), ResourceKind::ALL.len());
        let deployments = kinds.iter().find(|k| k.name == "deployments").unwrap();
        assert_eq!(deployments.api_version, "apps/v1");
        assert!(deployments.namespaced);
        assert_eq!(kinds.sections()[0].rows.len(), kinds.len());
    }

    #[test]
    fn test_config_sections() {
        let rows = &Config::default().sections()[0].rows;
        assert!(rows.contains(&vec!["items_per_page".to_string(), "20".to_string()]));
    }
}
