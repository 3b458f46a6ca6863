use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use relay_router::config::load_or_default;
use relay_router::observability::logging;
use relay_router::{RequestBody, RouteRequest, RouterRuntime};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Send requests through the multi-path router and inspect its health state", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay-router.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route one POST request to TARGET_URL
    Send {
        target_url: String,

        /// Request header as `name:value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body; sent as JSON when it parses as JSON
        #[arg(short, long, default_value = "{}")]
        data: String,

        /// Send the body as plain text even if it parses as JSON
        #[arg(long)]
        text: bool,

        /// Print the health snapshot after the request
        #[arg(long)]
        diagnostics: bool,
    },
    /// Print the persisted health snapshot
    Diagnostics,
    /// Set (or with no argument, clear) the private relay endpoint
    SetRelay { endpoint: Option<String> },
    /// Probe penalized relays once
    Probe,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_or_default(&cli.config)?;
    // One-shot commands never need the background prober.
    config.prober.enabled = false;

    logging::init_logging(&config.observability);
    let runtime = RouterRuntime::start(&config)?;
    let router = runtime.router();

    match cli.command {
        Commands::Send {
            target_url,
            headers,
            data,
            text,
            diagnostics,
        } => {
            let body = match serde_json::from_str::<Value>(&data) {
                Ok(value) if !text => RequestBody::Json(value),
                _ => RequestBody::Text(data),
            };
            let mut request = RouteRequest::new(target_url, body);
            for header in &headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| format!("invalid header `{header}`, expected name:value"))?;
                request = request.with_header(name.trim(), value.trim());
            }

            let result = router.route(&request).await;

            if diagnostics {
                eprintln!("{}", serde_json::to_string_pretty(&router.diagnostics())?);
            }

            match result {
                Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
                Err(e) => {
                    eprintln!("Error: {e}");
                    if let Some(status) = e.status() {
                        eprintln!("Status: {status}");
                    }
                    if let Some(body) = e.body() {
                        eprintln!("Response: {}", serde_json::to_string_pretty(body)?);
                    }
                    runtime.shutdown().await;
                    return Err(e.into());
                }
            }
        }
        Commands::Diagnostics => {
            println!("{}", serde_json::to_string_pretty(&router.diagnostics())?);
        }
        Commands::SetRelay { endpoint } => match router.set_private_endpoint(endpoint.as_deref()) {
            Some(url) => println!("Private relay set to {url}"),
            None if endpoint.is_some() => {
                runtime.shutdown().await;
                return Err("endpoint is not a valid http(s) URL".into());
            }
            None => println!("Private relay cleared"),
        },
        Commands::Probe => {
            let recovered = router.probe_now().await;
            println!("{recovered} path(s) recovered");
        }
    }

    runtime.shutdown().await;
    Ok(())
}
