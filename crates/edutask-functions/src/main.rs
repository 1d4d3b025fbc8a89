//! edutask-functions: run the EduTask API the way the hosting runtime does.
//!
//! # Usage
//!
//! ```text
//! edutask-functions serve --port 5001
//! edutask-functions invoke GET /api/health -H "Origin: http://localhost:5173"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use edutask_functions::{function_entry, global_options, FunctionsConfig, LocalTrigger};
use edutask_gateway::InboundRequest;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,edutask_functions=debug,edutask_gateway=debug";

#[derive(Parser)]
#[command(name = "edutask-functions", about = "EduTask function host")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the function over HTTP, emulating the hosting runtime.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,

        /// Port to listen on.
        #[arg(long, default_value = "5001")]
        port: u16,

        /// Path to functions.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Invoke the function once and print the assembled response.
    Invoke {
        /// HTTP method.
        method: String,

        /// Request path, e.g. /api/health.
        path: String,

        /// Raw query string, without the leading `?`.
        #[arg(long, default_value = "")]
        query: String,

        /// Request header as "Name: value". Repeatable.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body.
        #[arg(long, default_value = "")]
        body: String,

        /// Path to functions.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve { host, port, config } => {
            let config = FunctionsConfig::load(config.as_deref())?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;
            runtime.block_on(run_serve(SocketAddr::new(host, port), config))
        }
        Command::Invoke {
            method,
            path,
            query,
            headers,
            body,
            config,
        } => {
            let config = FunctionsConfig::load(config.as_deref())?;
            run_invoke(&config, method, path, query, &headers, body)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run_serve(addr: SocketAddr, config: FunctionsConfig) -> anyhow::Result<()> {
    let adapter = function_entry(&config)?;
    let options = global_options()
        .cloned()
        .context("function options were not installed")?;
    info!(region = %options.region, "EduTask function host starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let trigger = LocalTrigger::new(addr, adapter, options);
    let mut server = tokio::spawn(trigger.serve(shutdown_rx));

    tokio::select! {
        result = &mut server => {
            // Only reached when binding or accepting failed.
            return result.context("local trigger task panicked")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    server.await.context("local trigger task panicked")??;
    info!("EduTask function host stopped");
    Ok(())
}

fn run_invoke(
    config: &FunctionsConfig,
    method: String,
    path: String,
    query: String,
    headers: &[String],
    body: String,
) -> anyhow::Result<()> {
    let adapter = function_entry(config)?;

    let mut request = InboundRequest::new(method, path)
        .with_query_string(query)
        .with_body(body);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header {header:?} is not in \"Name: value\" form"))?;
        request = request.with_header(name.trim(), value.trim().to_string());
    }

    let response = adapter.handle_blocking(request);
    let body = match serde_json::from_slice::<serde_json::Value>(response.body()) {
        Ok(json) => json,
        Err(_) => serde_json::Value::String(String::from_utf8_lossy(response.body()).into_owned()),
    };
    let printed = serde_json::json!({
        "status": response.status(),
        "headers": response.headers(),
        "body": body,
    });
    println!("{}", serde_json::to_string_pretty(&printed)?);
    Ok(())
}
