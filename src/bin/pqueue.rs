//! pqueue CLI: operator interface to the priority queues.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pqueue_rs::QueueService;
use pqueue_rs::config::secrets::ExposeSecret;
use pqueue_rs::config::{Config, StoreKind};
use pqueue_rs::db::Db;
use pqueue_rs::model::*;
use pqueue_rs::store::memory::MemoryStore;
use pqueue_rs::store::redis::RedisStore;
use pqueue_rs::store::{KeySpace, QueueStore};
use pqueue_rs::telemetry::{TelemetryConfig, init_telemetry};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pqueue", about = "Priority queues over a score-ordered set store")]
struct Cli {
    /// Print responses as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a member, or move it to a new score
    Enqueue {
        queue: String,
        member: String,
        /// Priority score (lower = dequeued first)
        #[arg(allow_negative_numbers = true)]
        score: f64,
    },
    /// Remove members from the head of a queue
    Dequeue {
        queue: String,
        /// Take up to N members
        #[arg(long, conflicts_with = "release_all")]
        first: Option<usize>,
        /// Take every member and flag the queue as released
        #[arg(long)]
        release_all: bool,
    },
    /// Show the next member without removing it
    Peek { queue: String },
    /// Show a member's zero-based rank
    Position { queue: String, member: String },
    /// Change a member's score
    SetPriority {
        queue: String,
        member: String,
        #[arg(allow_negative_numbers = true)]
        score: f64,
    },
    /// Cancel a member without recording a dequeue
    Delete { queue: String, member: String },
    /// Empty a queue and flag it as released
    Clear { queue: String },
    /// Check whether a member already left through a dequeue
    IsDequeued { queue: String, member: String },
    /// Run a short scripted walkthrough against a queue
    Demo {
        #[arg(default_value = "demo")]
        queue: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "pqueue".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let service = connect(&config).await?;

    let request = match cli.command {
        Command::Demo { queue } => return cmd_demo(&service, &queue).await,
        Command::Enqueue {
            queue,
            member,
            score,
        } => Request::Enqueue(EnqueueReq {
            queue_id: queue,
            member_id: member,
            score,
        }),
        Command::Dequeue {
            queue,
            first,
            release_all,
        } => Request::Dequeue(DequeueReq {
            queue_id: queue,
            mode: match (release_all, first) {
                (true, _) => DequeueMode::ReleaseAll,
                (false, Some(n)) => DequeueMode::First(n),
                (false, None) => DequeueMode::Single,
            },
        }),
        Command::Peek { queue } => Request::Peek { queue_id: queue },
        Command::Position { queue, member } => Request::Position(PositionReq {
            queue_id: queue,
            member_id: member,
        }),
        Command::SetPriority {
            queue,
            member,
            score,
        } => Request::SetPriority(SetPriorityReq {
            queue_id: queue,
            member_id: member,
            score,
        }),
        Command::Delete { queue, member } => Request::Delete(DeleteReq {
            queue_id: queue,
            member_id: member,
        }),
        Command::Clear { queue } => Request::Clear { queue_id: queue },
        Command::IsDequeued { queue, member } => Request::IsDequeued(IsDequeuedReq {
            queue_id: queue,
            member_id: member,
        }),
    };

    let queue_id = request.queue_id().to_string();
    let response = service
        .execute(request)
        .await
        .with_context(|| format!("queue {queue_id}"))?;

    if cli.json {
        println!("{}", serde_json::to_string(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<QueueService> {
    let url = || {
        config
            .store_url
            .as_ref()
            .map(|url| url.expose_secret().to_string())
            .ok_or_else(|| anyhow::anyhow!("no store URL configured for {}", config.store))
    };

    let store: Arc<dyn QueueStore> = match config.store {
        StoreKind::Redis => {
            Arc::new(RedisStore::connect(&url()?, KeySpace::new(config.key_prefix.as_str())).await?)
        }
        StoreKind::Postgres => Arc::new(Db::connect(&url()?).await?),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };

    let service = QueueService::new(store).await?;
    service.health_check().await?;
    Ok(service)
}

fn print_response(response: &Response) {
    match response {
        Response::Enqueued => println!("Enqueued"),
        Response::PrioritySet => println!("Priority set"),
        Response::Deleted => println!("Deleted"),
        Response::Dequeued(members) if members.is_empty() => println!("Queue is empty."),
        Response::Dequeued(members) => {
            for member in members {
                println!("{member}");
            }
            println!("\n{} member(s) dequeued", members.len());
        }
        Response::Position(rank) => println!("{rank}"),
        Response::Peeked(member) => println!("{member}"),
        Response::IsDequeued(dequeued) => println!("{dequeued}"),
        Response::Cleared(count) => println!("Cleared {count} member(s)"),
    }
}

/// Enqueue a handful of members, drain them, then exercise every other
/// operation on a fresh pair.
async fn cmd_demo(service: &QueueService, queue: &str) -> anyhow::Result<()> {
    let enqueue = |member: &str, score: f64| EnqueueReq {
        queue_id: queue.to_string(),
        member_id: member.to_string(),
        score,
    };

    for (member, score) in [
        ("task-a", 1.0),
        ("task-b", 2.0),
        ("task-c", 2.0),
        ("task-d", 2.0),
    ] {
        service.enqueue(&enqueue(member, score)).await?;
    }

    let members = service
        .dequeue(&DequeueReq {
            queue_id: queue.to_string(),
            mode: DequeueMode::First(5),
        })
        .await?;
    println!("Dequeued:   {members:?}");

    service.enqueue(&enqueue("task-e", 5.0)).await?;
    service.enqueue(&enqueue("task-f", 3.0)).await?;

    let head = service.peek(queue).await?;
    println!("Peeked:     {head}");

    let position = service
        .get_position(&PositionReq {
            queue_id: queue.to_string(),
            member_id: "task-e".to_string(),
        })
        .await?;
    println!("Position:   {position}");

    service
        .set_priority(&SetPriorityReq {
            queue_id: queue.to_string(),
            member_id: "task-e".to_string(),
            score: 3.0,
        })
        .await?;

    service
        .delete(&DeleteReq {
            queue_id: queue.to_string(),
            member_id: "task-e".to_string(),
        })
        .await?;

    for member in ["task-e", "task-a"] {
        let status = service
            .audit(&IsDequeuedReq {
                queue_id: queue.to_string(),
                member_id: member.to_string(),
            })
            .await?;
        println!("{member}: {status}");
    }

    Ok(())
}
