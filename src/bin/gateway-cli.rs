use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspection CLI for the service gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway name, version and registered services
    Status,
    /// Health summary across services
    Health,
    /// Registry listing with per-instance health
    Services,
    /// Plain-text health gauges
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let path = match cli.command {
        Commands::Status => "/",
        Commands::Health => "/health",
        Commands::Services => "/services",
        Commands::Metrics => "/metrics",
    };

    let res = client.get(format!("{}{}", base, path)).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if is_json {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", res.text().await?);
    }
    Ok(())
}
