use std::net::SocketAddr;
use tracing::{info, warn};

/// Installs a Prometheus exporter when `AUTOS_METRICS_PORT` is set.
/// Without it the `metrics` macros record nothing.
pub fn init_metrics() -> bool {
    let Some(port) = std::env::var("AUTOS_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return false;
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            info!("Prometheus exporter listening on http://{}/metrics", addr);
            true
        }
        Err(e) => {
            warn!("Prometheus exporter install failed: {}", e);
            false
        }
    }
}
