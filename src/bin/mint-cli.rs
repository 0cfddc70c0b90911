use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use token_minter::http::{SseDecoder, SseFrame};

#[derive(Parser)]
#[command(name = "mint-cli")]
#[command(about = "Command-line client for a running token minter", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a wallet by public key
    Connect {
        /// Base58 public key that will own the token account
        public_key: String,
    },
    /// Disconnect the wallet
    Disconnect,
    /// Start a mint and follow its progress
    Mint {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 0)]
        decimals: u8,
        #[arg(long, default_value = "")]
        uri: String,
        /// Return once the mint is accepted instead of waiting for the result
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the current status
    Status,
    /// Stream progress events
    Watch,
    /// Show the fee-paying authority and its balance
    Authority,
    /// Abandon an unfinished mint
    Abandon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Connect { public_key } => {
            let res = client
                .post(format!("{}/api/wallet/connect", cli.url))
                .json(&json!({ "public_key": public_key }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Disconnect => {
            let res = client
                .post(format!("{}/api/wallet/disconnect", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Mint {
            name,
            symbol,
            decimals,
            uri,
            no_wait,
        } => {
            // Subscribe first so no event between accept and watch is missed
            let events = if no_wait {
                None
            } else {
                Some(client.get(format!("{}/api/events", cli.url)).send().await?)
            };
            let res = client
                .post(format!("{}/api/mint", cli.url))
                .json(&json!({
                    "name": name,
                    "symbol": symbol,
                    "decimals": decimals,
                    "uri": uri,
                }))
                .send()
                .await?;
            if !print_response(res).await? {
                return Ok(());
            }
            if let Some(events) = events {
                follow(events, true).await?;
            }
        }
        Commands::Status => {
            let res = client.get(format!("{}/api/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Watch => {
            let events = client.get(format!("{}/api/events", cli.url)).send().await?;
            follow(events, false).await?;
        }
        Commands::Authority => {
            let res = client.get(format!("{}/api/authority", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Abandon => {
            let res = client
                .delete(format!("{}/api/checkpoint", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Print a JSON response. Returns false for error statuses.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: minter returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(false);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(true)
}

/// Print SSE events as they arrive. With `until_done`, stop at the first
/// terminal event.
async fn follow(
    mut res: reqwest::Response,
    until_done: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = res.chunk().await? {
        for SseFrame { event, data } in decoder.push(&chunk) {
            let value: Value = serde_json::from_str(&data)?;
            match event.as_str() {
                "progress" => println!("{}", value["message"].as_str().unwrap_or_default()),
                "completed" => {
                    let outcome = &value["outcome"];
                    println!("Token minted successfully!");
                    println!("Mint: {}", outcome["mint"].as_str().unwrap_or_default());
                    println!(
                        "Token Account: {}",
                        outcome["token_account"].as_str().unwrap_or_default()
                    );
                    println!(
                        "Metadata URI: {}",
                        outcome["metadata_uri"].as_str().unwrap_or_default()
                    );
                }
                "failed" => eprintln!(
                    "Error: {}",
                    value["error"].as_str().unwrap_or("Error during minting")
                ),
                _ => {}
            }
            if until_done && (event == "completed" || event == "failed") {
                return Ok(());
            }
        }
    }
    Ok(())
}
