use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "mock-cli")]
#[command(about = "Management CLI for the mock API server", long_about = None)]
struct Cli {
    #[arg(short, long, env = "MOCK_API_URL", default_value = "http://localhost:3003")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all endpoint configurations
    List,
    /// Create an endpoint
    Add {
        name: String,
        #[arg(short, long)]
        method: Option<String>,
        #[arg(short, long)]
        status: Option<u16>,
        /// Response delay in milliseconds
        #[arg(short, long)]
        delay: Option<u64>,
        /// Response body as JSON
        #[arg(short, long)]
        body: Option<String>,
        /// Required request fields as a JSON array
        #[arg(short, long)]
        expected_fields: Option<String>,
    },
    /// Delete an endpoint
    Remove { name: String },
    /// Show currently bound routes
    Routes,
    /// Check server status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api", cli.url.trim_end_matches('/'));

    let res = match cli.command {
        Commands::List => client.get(format!("{}/endpoints", api)).send().await?,
        Commands::Add {
            name,
            method,
            status,
            delay,
            body,
            expected_fields,
        } => {
            let mut config = Map::new();
            if let Some(method) = method {
                config.insert("method".into(), json!(method.to_uppercase()));
            }
            if let Some(status) = status {
                config.insert("statusCode".into(), json!(status));
            }
            if let Some(delay) = delay {
                config.insert("delay".into(), json!(delay));
            }
            if let Some(body) = body {
                config.insert("body".into(), serde_json::from_str(&body)?);
            }
            if let Some(fields) = expected_fields {
                config.insert("expectedFields".into(), serde_json::from_str(&fields)?);
            }

            client
                .post(format!("{}/endpoints", api))
                .json(&json!({ "endpoint": name, "config": config }))
                .send()
                .await?
        }
        Commands::Remove { name } => {
            client
                .delete(format!("{}/endpoints/{}", api, name))
                .send()
                .await?
        }
        Commands::Routes => client.get(format!("{}/routes", api)).send().await?,
        Commands::Status => client.get(format!("{}/status", api)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
