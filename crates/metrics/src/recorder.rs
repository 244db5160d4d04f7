//! Metrics recorder initialization.

use std::net::SocketAddr;

use {anyhow::Result, tracing::info};

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address of the Prometheus scrape endpoint
    pub listen: Option<SocketAddr>,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup, from inside the tokio runtime: the Prometheus
/// exporter spawns its HTTP listener onto it. Without a recorder every
/// `counter!`/`gauge!` call is a no-op.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or its address bound.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        init_prometheus(config)
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics requested but the prometheus feature is not compiled in");
        Ok(())
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(config: MetricsRecorderConfig) -> Result<()> {
    use {
        crate::{buckets, monitor},
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(monitor::POLL_CYCLE_DURATION_SECONDS.to_string()),
        &buckets::POLL_CYCLE_DURATION,
    )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    match config.listen {
        Some(addr) => {
            builder.with_http_listener(addr).install()?;
            info!(%addr, "prometheus metrics exporter listening");
        },
        None => {
            builder.install_recorder()?;
            info!("prometheus recorder installed without scrape endpoint");
        },
    }
    Ok(())
}
