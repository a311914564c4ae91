use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "query-cli")]
#[command(about = "Send queries through a running query proxy", long_about = None)]
struct Cli {
    /// Proxy endpoint, including the route path.
    #[arg(short, long, default_value = "http://localhost:8080/graphql")]
    url: String,

    /// Value for the `user` header.
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a query envelope
    Query {
        /// Query text
        query: String,
        /// Operation name to put in the envelope
        #[arg(short, long)]
        operation_name: Option<String>,
    },
    /// Post a file's contents verbatim as the request body
    Raw {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(user) = &cli.user {
        headers.insert("user", HeaderValue::from_str(user)?);
    }

    let body = match cli.command {
        Commands::Query { query, operation_name } => {
            let envelope = json!({
                "operationName": operation_name.unwrap_or_default(),
                "query": query,
            });
            serde_json::to_vec(&envelope)?
        }
        Commands::Raw { file } => std::fs::read(file)?,
    };

    let res = client.post(&cli.url).headers(headers).body(body).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: proxy returned status {} (request {})", status, request_id);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    println!("Status: {} (request {})", status, request_id);
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
