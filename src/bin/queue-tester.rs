//! Queue Tester CLI Tool
//!
//! Command-line tool for driving a running matchmaking service over HTTP.
//!
//! Usage:
//!   cargo run --bin queue-tester -- --help
//!   cargo run --bin queue-tester enqueue --queue killer --id 1001 --rating 600 --course 2
//!   cargo run --bin queue-tester seed --count 20 --seed 7
//!   cargo run --bin queue-tester lengths

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use killer_matchmaking::types::{PlayerId, PlayerPayload, MAX_COURSE, MIN_COURSE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

const PLAYER_TYPES: [&str; 4] = ["бакалавр", "магистр", "специалитет", "иное"];
const GROUPS: [&str; 5] = ["ИИ", "ПИ", "БИ", "ИБ", "ПМ"];

#[derive(Parser)]
#[command(name = "queue-tester")]
#[command(about = "Queue testing tool for a running killer matchmaking service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the matchmaking service
    #[arg(long, default_value = "http://localhost:6543")]
    url: String,
}

#[derive(Args)]
struct PlayerArgs {
    /// Player ID
    #[arg(short, long)]
    id: PlayerId,
    /// Player rating
    #[arg(short, long, default_value = "1000.0")]
    rating: f64,
    /// Academic type label
    #[arg(short = 't', long = "type")]
    player_type: Option<String>,
    /// Course number
    #[arg(short, long)]
    course: Option<i64>,
    /// Group name
    #[arg(short, long)]
    group: Option<String>,
}

impl PlayerArgs {
    fn into_payload(self) -> PlayerPayload {
        PlayerPayload {
            id: self.id,
            rating: self.rating,
            player_type: self.player_type,
            course_number: self.course,
            group_name: self.group,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a player into one queue
    Enqueue {
        /// Queue name (killer or victim)
        #[arg(short, long)]
        queue: String,
        #[command(flatten)]
        player: PlayerArgs,
    },
    /// Enqueue a player into both queues
    EnqueueBoth {
        #[command(flatten)]
        player: PlayerArgs,
    },
    /// Remove a player from one queue
    Remove {
        #[arg(short, long)]
        queue: String,
        #[arg(short, long)]
        id: PlayerId,
    },
    /// Show whether a player is queued
    Status {
        #[arg(short, long)]
        id: PlayerId,
    },
    /// Show queue lengths
    Lengths,
    /// Show both queues
    Snapshot,
    /// Clear both queues
    Reset,
    /// Reconcile queues against the bot
    Reconcile,
    /// Enqueue random players into both queues
    Seed {
        /// Number of players
        #[arg(short, long, default_value = "10")]
        count: u64,
        /// First player ID
        #[arg(long, default_value = "1000")]
        first_id: PlayerId,
        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Check the service answers
    Ping,
}

struct QueueClient {
    client: Client,
    base_url: String,
}

impl QueueClient {
    fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(response: Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            Err(anyhow!("{}: {}", status, body))
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        Self::read(self.client.get(self.url(path)).send().await?).await
    }

    async fn post(&self, path: &str, body: Option<&PlayerPayload>) -> Result<Value> {
        let request = self.client.post(self.url(path));
        let request = match body {
            Some(payload) => request.json(payload),
            None => request,
        };
        Self::read(request.send().await?).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        Self::read(self.client.delete(self.url(path)).send().await?).await
    }

    async fn ping(&self) -> Result<String> {
        let response = self.client.get(self.url("/ping")).send().await?;
        Ok(response.error_for_status()?.text().await?)
    }
}

fn random_player(rng: &mut StdRng, id: PlayerId) -> PlayerPayload {
    let player_type = PLAYER_TYPES.choose(rng).map(|s| s.to_string());
    let group_name = if rng.gen_bool(0.8) {
        GROUPS.choose(rng).map(|s| s.to_string())
    } else {
        None
    };

    PlayerPayload {
        id,
        rating: rng.gen_range(0.0..2000.0_f64).round(),
        player_type,
        course_number: Some(rng.gen_range(MIN_COURSE..=MAX_COURSE) as i64),
        group_name,
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = QueueClient::new(&cli.url)?;

    match cli.command {
        Commands::Enqueue { queue, player } => {
            let payload = player.into_payload();
            let result = client
                .post(&format!("/queues/{}", queue), Some(&payload))
                .await?;
            println!("✅ Enqueued {} into {}", payload.id, queue);
            print_json(&result);
        }
        Commands::EnqueueBoth { player } => {
            let payload = player.into_payload();
            let result = client.post("/queues/both", Some(&payload)).await?;
            println!("✅ Enqueued {} into both queues", payload.id);
            print_json(&result);
        }
        Commands::Remove { queue, id } => {
            let result = client.delete(&format!("/queues/{}/{}", queue, id)).await?;
            print_json(&result);
        }
        Commands::Status { id } => {
            print_json(&client.get(&format!("/players/{}", id)).await?);
        }
        Commands::Lengths => {
            print_json(&client.get("/queues/len").await?);
        }
        Commands::Snapshot => {
            print_json(&client.get("/queues").await?);
        }
        Commands::Reset => {
            print_json(&client.post("/queues/reset", None).await?);
            println!("🧹 Queues reset");
        }
        Commands::Reconcile => {
            print_json(&client.post("/queues/reconcile", None).await?);
        }
        Commands::Seed {
            count,
            first_id,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let mut failures = 0;
            for offset in 0..count {
                let payload = random_player(&mut rng, first_id + offset);
                match client.post("/queues/both", Some(&payload)).await {
                    Ok(_) => println!(
                        "  + {} rating {} {:?}",
                        payload.id,
                        payload.rating,
                        payload.player_type.as_deref().unwrap_or("-")
                    ),
                    Err(e) => {
                        failures += 1;
                        eprintln!("  ❌ {}: {}", payload.id, e);
                    }
                }
            }

            println!("🌱 Seeded {} players ({} failed)", count - failures, failures);
            print_json(&client.get("/queues/len").await?);
        }
        Commands::Ping => {
            let answer = client.ping().await?;
            println!("🏓 {}", answer);
        }
    }

    Ok(())
}
