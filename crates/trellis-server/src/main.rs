use clap::Parser;
use trellis::service::{self, ServiceConfig};

mod routes;
mod trace;

/// HTTP shell for the trellis live-coding runtime.
#[derive(Parser)]
#[command(name = "trellis-server")]
#[command(about = "Serve the trellis runtime over HTTP")]
struct Args {
    /// Port for the HTTP server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Grid rows
    #[arg(long, default_value_t = 20)]
    rows: usize,

    /// Grid columns
    #[arg(long, default_value_t = 20)]
    cols: usize,

    /// Clock interval in milliseconds
    #[arg(long = "interval-ms", default_value_t = 100)]
    interval_ms: u64,

    /// OSC client host
    #[arg(long, default_value = "localhost")]
    osc_host: String,

    /// OSC client port
    #[arg(long, default_value_t = 7001)]
    osc_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trace::init();
    let args = Args::parse();

    let handle = service::spawn(ServiceConfig {
        rows: args.rows,
        cols: args.cols,
        interval_ms: args.interval_ms,
        osc_host: args.osc_host,
        osc_port: args.osc_port,
        start_clock: true,
    })?;

    let app = routes::router(handle);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    tracing::info!("trellis server listening on port {}", args.port);
    axum::serve(listener, app).await?;

    Ok(())
}
