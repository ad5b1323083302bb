use clap::{Parser, Subcommand};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the GitLab SSE gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// Open an SSE session and print every frame until it closes
    Listen,
    /// Inject a JSON message into an open session
    Send {
        /// Session id from the endpoint event
        session: String,
        /// JSON payload
        json: String,
    },
    /// List the tools the gateway serves
    Tools,
    /// Call the hello tool
    Hello {
        /// Name to greet
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Listen => {
            let mut res = client
                .get(format!("{base}/sse"))
                .header(ACCEPT, "text/event-stream")
                .send()
                .await?;
            if !res.status().is_success() {
                eprintln!("Error: gateway returned status {}", res.status());
                return Ok(());
            }
            while let Some(chunk) = res.chunk().await? {
                print!("{}", String::from_utf8_lossy(&chunk));
            }
            eprintln!("Stream closed");
        }
        Commands::Send { session, json } => {
            // Validate locally so typos do not look like a missing session.
            let payload: Value = serde_json::from_str(&json)?;
            let res = client
                .post(format!("{base}/messages/{session}"))
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_string())
                .send()
                .await?;
            let status = res.status();
            if status.is_success() {
                println!("Delivered ({status})");
            } else {
                print_response(res).await?;
            }
        }
        Commands::Tools => {
            let res = client.get(format!("{base}/tools")).send().await?;
            print_response(res).await?;
        }
        Commands::Hello { name } => {
            let res = client
                .post(format!("{base}/tool/hello"))
                .json(&json!({ "name": name }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
