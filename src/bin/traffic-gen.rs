//! Sends game-score traffic through the balancer and prints each reply.

use std::time::Duration;

use clap::Parser;
use serde_json::json;

#[derive(Parser)]
#[command(name = "traffic-gen")]
#[command(about = "Traffic generator for the round-robin load balancer", long_about = None)]
struct Cli {
    /// Balancer base URL.
    #[arg(short, long, default_value = "http://localhost:8082")]
    url: String,

    /// Number of requests to send (points 1..=count).
    #[arg(short, long, default_value_t = 100)]
    count: u32,

    /// Delay between requests in milliseconds.
    #[arg(short, long, default_value_t = 2000)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/create", cli.url.trim_end_matches('/'));

    for points in 1..=cli.count {
        match send_score(&client, &endpoint, points).await {
            Ok((status, body)) => {
                println!("Response status for points {}: {}", points, status);
                println!("Response body: {}", body);
            }
            Err(e) => eprintln!("Error for points {}: {}", points, e),
        }
        tokio::time::sleep(Duration::from_millis(cli.delay_ms)).await;
    }

    Ok(())
}

async fn send_score(
    client: &reqwest::Client,
    endpoint: &str,
    points: u32,
) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    let payload = json!({
        "game": "Mobile Legends",
        "gamerID": "GYUTDTE",
        "points": points,
    });

    let res = client.post(endpoint).json(&payload).send().await?;
    let status = res.status();
    let body = res.text().await?;
    Ok((status, body))
}
