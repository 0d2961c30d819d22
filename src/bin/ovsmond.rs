//! ovsmond - HTTP metrics exporter daemon for Open vSwitch.
//!
//! Serves the current metric snapshot on the telemetry path. Collection is
//! rate-limited by the exporter core, so scrape frequency does not translate
//! into backend load.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use chrono::Utc;
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use ovsmon::client::{OvsClient, OvsdbClient};
use ovsmon::collector::Exporter;
use ovsmon::config::Config;
use ovsmon::emit;

/// Open vSwitch metrics exporter daemon.
#[derive(Parser)]
#[command(name = "ovsmond", about = "Open vSwitch metrics exporter daemon", version = ovsmon::VERSION)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9475", env = "OVSMON_LISTEN")]
    listen: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics")]
    telemetry_path: String,

    /// Minimum interval between collections from the vswitch, in seconds.
    #[arg(long, default_value = "15", env = "OVSMON_POLL_INTERVAL")]
    poll_interval: i64,

    /// Timeout on backend requests, in seconds.
    #[arg(long, default_value = "2")]
    timeout: u64,

    /// Collect process, log and administrative metrics.
    /// Disable with --process-metrics=false.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    process_metrics: bool,

    /// Vswitch run directory (pidfiles, control sockets).
    #[arg(long, default_value = "/var/run/openvswitch")]
    run_dir: PathBuf,

    /// OVN run directory.
    #[arg(long, default_value = "/var/run/ovn")]
    ovn_run_dir: PathBuf,

    /// JSON-RPC unix socket of the database server.
    #[arg(long, default_value = "/var/run/openvswitch/db.sock")]
    db_socket: PathBuf,

    /// Name of the vswitch database.
    #[arg(long, default_value = "Open_vSwitch")]
    db_name: String,

    /// File holding the persistent system id.
    #[arg(long, default_value = "/etc/openvswitch/system-id.conf")]
    system_id_file: PathBuf,

    /// ovsdb-server log file.
    #[arg(long, default_value = "/var/log/openvswitch/ovsdb-server.log")]
    ovsdb_log: PathBuf,

    /// ovsdb-server pid file.
    #[arg(long, default_value = "/var/run/openvswitch/ovsdb-server.pid")]
    ovsdb_pid: PathBuf,

    /// ovs-vswitchd log file.
    #[arg(long, default_value = "/var/log/openvswitch/ovs-vswitchd.log")]
    vswitchd_log: PathBuf,

    /// ovs-vswitchd pid file.
    #[arg(long, default_value = "/var/run/openvswitch/ovs-vswitchd.pid")]
    vswitchd_pid: PathBuf,

    /// ovn-controller log file.
    #[arg(long, default_value = "/var/log/ovn/ovn-controller.log")]
    ovn_controller_log: PathBuf,

    /// ovn-controller pid file.
    #[arg(long, default_value = "/var/run/ovn/ovn-controller.pid")]
    ovn_controller_pid: PathBuf,

    /// Plain-text database listener port probed for reachability.
    #[arg(long, default_value = "6640")]
    db_port: u16,

    /// TLS database listener port probed for reachability.
    #[arg(long, default_value = "6632")]
    db_ssl_port: u16,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("ovsmond={}", level).parse().unwrap())
        .add_directive(format!("ovsmon={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(args: &Args) -> Config {
    Config {
        poll_interval_secs: args.poll_interval,
        timeout: Duration::from_secs(args.timeout),
        collect_process_metrics: args.process_metrics,
        run_dir: args.run_dir.clone(),
        ovn_run_dir: args.ovn_run_dir.clone(),
        db_socket: args.db_socket.clone(),
        db_name: args.db_name.clone(),
        system_id_file: args.system_id_file.clone(),
        log_files: [
            args.ovsdb_log.clone(),
            args.vswitchd_log.clone(),
            args.ovn_controller_log.clone(),
        ],
        pid_files: [
            args.ovsdb_pid.clone(),
            args.vswitchd_pid.clone(),
            args.ovn_controller_pid.clone(),
        ],
        db_port: args.db_port,
        db_ssl_port: args.db_ssl_port,
        ..Config::default()
    }
}

type SharedExporter = Arc<Exporter<OvsdbClient>>;

async fn handle_root() -> Html<&'static str> {
    Html(
        "<html>\
         <head><title>OVS Exporter</title></head>\
         <body><h1>OVS Exporter</h1><p><a href='/metrics'>Metrics</a></p></body>\
         </html>",
    )
}

async fn handle_metrics(State(exporter): State<SharedExporter>) -> Response {
    // The pass talks to unix sockets synchronously; keep it off the runtime.
    let result =
        tokio::task::spawn_blocking(move || emit::render(&exporter, Utc::now().timestamp())).await;

    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics collection task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {}", e);
        return;
    }
    info!("Received shutdown signal");
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("ovsmond {} starting", ovsmon::VERSION);
    info!(
        "Config: interval={}s, timeout={}s, process_metrics={}, db={}",
        args.poll_interval,
        args.timeout,
        args.process_metrics,
        args.db_socket.display()
    );

    let config = build_config(&args);
    let client = OvsdbClient::new(config.clone());

    // Verify the database is reachable before serving; a broken setup
    // should fail loudly at startup rather than export zeros forever.
    match client.system_info() {
        Ok(system) => info!("Connected, system_id={}", system.system_id),
        Err(e) => {
            error!("Failed to reach the vswitch database: {}", e);
            process::exit(1);
        }
    }

    let exporter: SharedExporter = Arc::new(Exporter::new(client, &config));

    let app = Router::new()
        .route("/", get(handle_root))
        .route(&args.telemetry_path, get(handle_metrics))
        .with_state(exporter);

    let listener = match tokio::net::TcpListener::bind(&args.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", args.listen, e);
            process::exit(1);
        }
    };
    info!("Listening on {}{}", args.listen, args.telemetry_path);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server failed: {}", e);
        process::exit(1);
    }

    info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::{Args, build_config};
    use clap::Parser;

    #[test]
    fn test_build_config_defaults() {
        let args = Args::parse_from(["ovsmond"]);
        let config = build_config(&args);

        assert_eq!(config.poll_interval_secs, 15);
        assert!(config.collect_process_metrics);
        assert_eq!(config.db_name, "Open_vSwitch");
        assert_eq!(config.db_port, 6640);
        assert!(
            config
                .log_file(ovsmon::config::Daemon::OvnController)
                .starts_with("/var/log/ovn")
        );
    }

    #[test]
    fn test_build_config_overrides() {
        let args = Args::parse_from([
            "ovsmond",
            "--poll-interval",
            "30",
            "--process-metrics",
            "false",
            "--db-socket",
            "/tmp/db.sock",
        ]);
        let config = build_config(&args);

        assert_eq!(config.poll_interval_secs, 30);
        assert!(!config.collect_process_metrics);
        assert_eq!(config.db_socket.to_str(), Some("/tmp/db.sock"));
    }
}
