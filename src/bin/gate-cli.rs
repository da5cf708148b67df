use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for the ledger gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gate switches and counts
    Status,
    /// Inspect limits, allowance and whitelist status of one principal
    Principal { asset: String, address: String },
    /// Add accounts to the whitelist (or remove with --remove)
    Whitelist {
        accounts: Vec<String>,
        #[arg(long)]
        remove: bool,
    },
    /// Exempt accounts from limits on an asset (or revoke with --revoke)
    Exempt {
        asset: String,
        accounts: Vec<String>,
        #[arg(long)]
        revoke: bool,
    },
    /// Reject every balance-changing operation
    Pause,
    /// Resume normal operation
    Unpause,
    /// Write a state snapshot now
    Snapshot,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path, body) = match cli.command {
        Commands::Status => (Method::GET, "status".to_string(), None),
        Commands::Principal { asset, address } => (Method::GET, format!("principals/{asset}/{address}"), None),
        Commands::Whitelist { accounts, remove } => (
            Method::POST,
            "whitelist".to_string(),
            Some(json!({ "accounts": accounts, "whitelisted": !remove })),
        ),
        Commands::Exempt { asset, accounts, revoke } => {
            let exempt = vec![!revoke; accounts.len()];
            (
                Method::POST,
                "exemptions".to_string(),
                Some(json!({ "asset": asset, "accounts": accounts, "exempt": exempt })),
            )
        }
        Commands::Pause => (Method::POST, "pause".to_string(), None),
        Commands::Unpause => (Method::POST, "unpause".to_string(), None),
        Commands::Snapshot => (Method::POST, "snapshot".to_string(), None),
    };

    let mut request = client
        .request(method, format!("{}/admin/{}", cli.url.trim_end_matches('/'), path))
        .headers(headers);
    if let Some(body) = body {
        request = request.json(&body);
    }
    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
