//! Structured Query Example
//!
//! The most basic use of the SDK:
//! - Describing the expected answer with a JSON schema
//! - Connecting a session to the Claude Code CLI
//! - Decoding the structured result into a Rust type
//! - Shutting the session down
//!
//! Run with: RUST_LOG=structclaude=debug cargo run --example structured_query

use serde::Deserialize;
use structclaude::{AgentError, AgentSession, ErrorRecovery, SessionConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Capital {
    country: String,
    capital: String,
    population_millions: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Step 1: Describe the answer
    let config = SessionConfig::new().with_json_schema(serde_json::json!({
        "type": "object",
        "properties": {
            "country": {"type": "string"},
            "capital": {"type": "string"},
            "population_millions": {"type": "number"}
        },
        "required": ["country", "capital", "population_millions"]
    }));

    // Step 2: Connect
    let session = match AgentSession::connect(config).await {
        Ok(session) => session,
        Err(err @ AgentError::ExecutableNotFound { .. }) => {
            eprintln!("{err}");
            eprintln!("Hint: {}", err.suggested_action());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    // Step 3: Ask and decode
    println!("Asking Claude...");
    let capital: Capital = session
        .respond("What is the capital of Japan, and roughly how many people live there?")
        .await?;
    println!(
        "{} -> {} (~{:.1}M people)",
        capital.country, capital.capital, capital.population_millions
    );

    // Step 4: Shut down
    let state = session.state().await;
    println!("Session {:?}: {} line(s) read", state.session_id, state.lines_seen);
    session.shutdown().await?;

    Ok(())
}
