// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
pub mod config;
mod correlator;
mod dataselect;
mod kubernetes;
mod metrics;
mod output;
pub mod progress;
mod workloads;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

use cli::{Args, Command};
use config::Config;
use kubernetes::{KubeClusterClient, NamespaceQuery, ResourceKind};
use metrics::KubeMetricsClient;
use output::{KindRow, Tabular};
use progress::{ProgressHandle, ProgressUpdate, create_progress_handle, create_spinner};
use workloads::Dashboard;

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::log_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // Rotate daily or at 10MB, keeping up to 5 files
    let log_path = log_dir.join("kubedash.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024);

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
    // Leak the guard to keep the background writer alive
    std::mem::forget(_guard);

    let filter = if verbose {
        "kubedash=debug"
    } else {
        "kubedash=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();

    // Always log to ~/.kubedash/log/kubedash.log, with -v also to stderr
    init_logging(args.verbose);

    let config = args.merge_into(Config::load()?);
    let namespaces = config.namespace_query();
    let query = args.data_select_query(&config);
    let progress = create_progress_handle();
    // stderr belongs to the log output in verbose mode
    let show_spinner = !args.verbose;

    match &args.command {
        Command::Kinds => print(&KindRow::all(), &args),

        Command::Config { save } => {
            if *save {
                config.save()?;
                info!(path = %Config::config_path()?.display(), "Saved configuration");
            }
            print(&config, &args)
        }

        Command::List { kind } => {
            let kind = parse_kind(kind)?;
            let listing = with_spinner(&progress, show_spinner, async {
                let dashboard = connect(&config, &progress).await?;
                Ok(dashboard.list(kind, &namespaces, &query).await?)
            })
            .await?;
            print(&listing, &args)
        }

        Command::Pods { kind, name } => {
            let kind = parse_kind(kind)?;
            if !kind.is_pod_controller() {
                bail!("{} do not own pods through a selector", kind);
            }
            let namespace = detail_namespace(&namespaces)?;
            let detail = with_spinner(&progress, show_spinner, async {
                let dashboard = connect(&config, &progress).await?;
                Ok(dashboard
                    .controller_detail(kind, namespace, name, &query)
                    .await?)
            })
            .await?;
            print(&detail, &args)
        }

        Command::Overview => {
            let overview = with_spinner(&progress, show_spinner, async {
                let dashboard = connect(&config, &progress).await?;
                Ok(dashboard.overview(&namespaces, &query).await?)
            })
            .await?;
            print(&overview, &args)
        }
    }
}

fn print<T: Serialize + Tabular>(value: &T, args: &Args) -> Result<()> {
    println!("{}", output::format(value, &args.output, args.no_headers)?);
    Ok(())
}

fn parse_kind(name: &str) -> Result<ResourceKind> {
    ResourceKind::from_name(name).with_context(|| {
        format!(
            "Unknown resource kind '{}', run `kubedash kinds` for the list",
            name
        )
    })
}

/// A controller lives in exactly one namespace
fn detail_namespace(namespaces: &NamespaceQuery) -> Result<&str> {
    match namespaces {
        NamespaceQuery::Single(namespace) => Ok(namespace),
        NamespaceQuery::All => Ok("default"),
        NamespaceQuery::List(_) => bail!("pods takes a single namespace"),
    }
}

/// Connect to the configured context and wire up the metrics backend
async fn connect(config: &Config, progress: &ProgressHandle) -> Result<Dashboard> {
    let client = KubeClusterClient::connect(config.context.as_deref(), progress.clone()).await?;
    let kube_client = client.client();
    let context = client.context().to_string();

    let mut dashboard =
        Dashboard::new(Arc::new(client)).with_created_by_policy(config.created_by_policy);
    if config.metrics_enabled {
        dashboard = dashboard.with_metrics(Arc::new(KubeMetricsClient::new(
            kube_client,
            config.metric_resolution(),
            progress.clone(),
        )));
    }
    debug!(context = %context, metrics = config.metrics_enabled, "Dashboard ready");
    Ok(dashboard)
}

/// Drive `work` to completion while a spinner follows the progress updates
async fn with_spinner<T>(
    progress: &ProgressHandle,
    enabled: bool,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    if !enabled {
        return work.await;
    }

    let spinner = create_spinner("Connecting to Kubernetes...");
    let mut progress_rx = progress.subscribe();
    let mut work = std::pin::pin!(work);

    let result = loop {
        tokio::select! {
            biased;
            update = progress_rx.recv() => {
                match update {
                    Ok(ProgressUpdate::Connecting { cluster }) => {
                        spinner.set_message(format!("Connecting to {}...", cluster));
                    }
                    Ok(ProgressUpdate::Connected { cluster, elapsed_ms }) => {
                        spinner.set_message(format!("Connected to {} ({}ms)", cluster, elapsed_ms));
                    }
                    Ok(ProgressUpdate::FetchStarted { kind })
                    | Ok(ProgressUpdate::FetchComplete { kind, .. }) => {
                        let (done, started) = progress.progress();
                        spinner.set_message(format!("Fetching {} ({}/{})...", kind, done, started));
                    }
                    Ok(ProgressUpdate::MetricsResolved { series, elapsed_ms }) => {
                        spinner.set_message(format!(
                            "Resolved {} metric series ({}ms)",
                            series, elapsed_ms
                        ));
                    }
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break (&mut work).await,
                }
            }
            result = &mut work => {
                break result;
            }
        }
    };

    spinner.finish_and_clear();
    result
}
