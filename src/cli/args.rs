// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::dataselect::{DataSelectQuery, FilterQuery, MetricQuery, PaginationQuery, SortQuery};

#[derive(Parser, Debug)]
#[command(name = "kubedash")]
#[command(author, version, about = "Kubernetes workload overviews with pod and metric aggregates")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Kubernetes context to use; defaults to the configured or current context
    #[arg(short, long, value_name = "CONTEXT", global = true)]
    pub context: Option<String>,

    /// Namespaces to list, comma separated. Empty means all namespaces.
    /// Examples: -n default, -n "prod,staging"
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Omit column headers in output
    #[arg(long, global = true)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Sort keys as direction,property pairs, e.g. "a,name,d,creationTimestamp"
    #[arg(long, value_name = "SPEC", global = true)]
    pub sortby: Option<String>,

    /// Filter terms as property,value pairs, e.g. "name,nginx,namespace,default"
    #[arg(long, value_name = "SPEC", global = true)]
    pub filterby: Option<String>,

    /// 1-based page to show; an unparsable page lists everything
    #[arg(long, global = true)]
    pub page: Option<String>,

    /// Items per page; 0 disables pagination
    #[arg(long, global = true)]
    pub items_per_page: Option<usize>,

    /// Metrics to aggregate, e.g. "cpu/usage_rate,memory/usage"
    #[arg(long, value_name = "NAMES", global = true)]
    pub metric_names: Option<String>,

    /// Aggregations to apply across the listed resources, e.g. "sum,max"
    #[arg(long, value_name = "MODES", global = true)]
    pub aggregations: Option<String>,

    /// Skip the metrics API entirely
    #[arg(long, global = true)]
    pub no_metrics: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the resource kinds that can be listed
    Kinds,

    /// List resources of one kind with their pod and metric aggregates
    List {
        /// Kind name or alias (e.g. deployments, deploy, po)
        kind: String,
    },

    /// Show one pod controller with its pods and events
    Pods {
        /// Controller kind (deployment, replicaset, daemonset, statefulset,
        /// replicationcontroller or job)
        kind: String,

        /// Controller name
        name: String,
    },

    /// Cluster, discovery and config categories in one view
    Overview,

    /// Show the effective configuration
    Config {
        /// Persist the effective configuration to ~/.kubedash/config.json
        #[arg(long)]
        save: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl Args {
    /// Config file values overridden by the flags given on the command line
    pub fn merge_into(&self, mut config: Config) -> Config {
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.default_namespace = Some(namespace.clone());
        }
        if let Some(items) = self.items_per_page {
            config.items_per_page = items;
        }
        if self.no_metrics {
            config.metrics_enabled = false;
        }
        config
    }

    /// Selection for list requests: newest first, one page, standard metrics
    /// unless the flags say otherwise
    pub fn data_select_query(&self, config: &Config) -> DataSelectQuery {
        let mut query = DataSelectQuery::default_page(config.items_per_page);

        if let Some(page) = &self.page {
            let items = config.items_per_page.to_string();
            query.pagination = PaginationQuery::parse(Some(&items), Some(page));
        }
        if let Some(spec) = &self.sortby {
            query.sort = SortQuery::parse(spec);
        }
        if let Some(spec) = &self.filterby {
            query.filter = FilterQuery::parse(spec);
        }

        query.metrics = if !config.metrics_enabled {
            MetricQuery::none()
        } else if self.metric_names.is_none() && self.aggregations.is_none() {
            MetricQuery::standard()
        } else {
            let standard = MetricQuery::standard().metric_names.join(",");
            let names = self.metric_names.as_deref().unwrap_or(&standard);
            MetricQuery::parse(Some(names), self.aggregations.as_deref())
        };
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AggregationMode, CPU_USAGE};

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("kubedash").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["kinds"]).command, Command::Kinds);
        assert_eq!(
            parse(&["list", "deploy"]).command,
            Command::List {
                kind: "deploy".to_string()
            }
        );
        assert_eq!(
            parse(&["pods", "deployment", "web", "-n", "prod"]).command,
            Command::Pods {
                kind: "deployment".to_string(),
                name: "web".to_string()
            }
        );
        assert_eq!(parse(&["config", "--save"]).command, Command::Config { save: true });
        assert!(Args::try_parse_from(["kubedash"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["list", "pods", "-o", "json", "-n", "kube-system", "--no-headers"]);
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.namespace.as_deref(), Some("kube-system"));
        assert!(args.no_headers);
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            context: Some("file-ctx".to_string()),
            default_namespace: Some("default".to_string()),
            ..Config::default()
        };
        let merged = parse(&["overview", "-c", "prod", "--items-per-page", "5", "--no-metrics"])
            .merge_into(config);
        assert_eq!(merged.context.as_deref(), Some("prod"));
        assert_eq!(merged.default_namespace.as_deref(), Some("default"));
        assert_eq!(merged.items_per_page, 5);
        assert!(!merged.metrics_enabled);
    }

    #[test]
    fn test_default_query() {
        let query = parse(&["list", "pods"]).data_select_query(&Config::default());
        assert_eq!(
            query.pagination,
            PaginationQuery::Window {
                offset: 0,
                limit: 20
            }
        );
        assert_eq!(query.sort, SortQuery::parse("d,creationTimestamp"));
        assert!(query.filter.is_empty());
        assert_eq!(query.metrics, MetricQuery::standard());
    }

    #[test]
    fn test_query_from_flags() {
        let args = parse(&[
            "list",
            "pods",
            "--sortby",
            "a,name",
            "--filterby",
            "name,web",
            "--page",
            "3",
            "--metric-names",
            CPU_USAGE,
            "--aggregations",
            "max,min",
        ]);
        let query = args.data_select_query(&args.merge_into(Config::default()));
        assert_eq!(
            query.pagination,
            PaginationQuery::Window {
                offset: 40,
                limit: 20
            }
        );
        assert_eq!(query.sort, SortQuery::parse("a,name"));
        assert_eq!(query.filter, FilterQuery::parse("name,web"));
        assert_eq!(query.metrics.metric_names, vec![CPU_USAGE.to_string()]);
        assert_eq!(
            query.metrics.aggregations,
            vec![AggregationMode::Max, AggregationMode::Min]
        );
    }

    #[test]
    fn test_aggregations_alone_keep_standard_metrics() {
        let query = parse(&["list", "nodes", "--aggregations", "average"])
            .data_select_query(&Config::default());
        assert_eq!(query.metrics.metric_names, MetricQuery::standard().metric_names);
        assert_eq!(query.metrics.aggregations, vec![AggregationMode::Average]);
    }

    #[test]
    fn test_disabled_metrics_win_over_names() {
        let args = parse(&["list", "pods", "--metric-names", CPU_USAGE, "--no-metrics"]);
        let query = args.data_select_query(&args.merge_into(Config::default()));
        assert!(query.metrics.is_empty());
    }

    #[test]
    fn test_zero_items_per_page_lists_everything() {
        let args = parse(&["list", "pods", "--items-per-page", "0"]);
        let query = args.data_select_query(&args.merge_into(Config::default()));
        assert_eq!(query.pagination, PaginationQuery::NoPagination);
    }
}
