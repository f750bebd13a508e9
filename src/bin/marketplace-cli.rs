use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "marketplace-cli")]
#[command(about = "Command-line client for the listing gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all model listings
    List,
    /// Create a listing and wait for confirmation
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Price in display units, e.g. 0.5
        #[arg(long)]
        price: String,
    },
    /// Purchase a listing at its current price
    Purchase {
        /// Listing id
        id: String,
    },
    /// Show the active signing account
    Account,
    /// Check provider health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::List => client.get(format!("{}/listings", base)).send().await?,
        Commands::Create {
            name,
            description,
            price,
        } => {
            client
                .post(format!("{}/listings", base))
                .json(&json!({ "name": name, "description": description, "price": price }))
                .send()
                .await?
        }
        Commands::Purchase { id } => {
            client
                .post(format!("{}/listings/{}/purchase", base, id))
                .send()
                .await?
        }
        Commands::Account => client.get(format!("{}/account", base)).send().await?,
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", body);
        std::process::exit(1);
    }
    Ok(())
}
