//! Interactive storefront assistant over stdin/stdout.
//!
//! Wires the Postgres store and the Ollama-compatible provider into the
//! orchestrator and loops on user queries. `exit` or EOF quits.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shelf_agent::ai::{OllamaChat, OllamaEmbedder};
use shelf_agent::config::Settings;
use shelf_agent::store::{PgStore, Store};
use shelf_agent::Orchestrator;

const DEFAULT_USER_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::from_env();
    info!(provider = %settings.provider_base_url, "starting shelf agent");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await
        .context("connecting to database")?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let embedder = Arc::new(OllamaEmbedder::new(
        &settings.provider_base_url,
        &settings.embedding_model,
        settings.provider_timeout_secs,
    )?);
    let chat = Arc::new(OllamaChat::new(
        &settings.provider_base_url,
        &settings.chat_model,
        settings.provider_timeout_secs,
    )?);

    let orchestrator = Orchestrator::new(store, embedder, chat, &settings);

    println!("Asistente de librería listo. Escribe tu consulta (o \"exit\" para salir).");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("salir") {
            break;
        }

        match orchestrator.handle_query(query, DEFAULT_USER_ID, None).await {
            Ok(result) => {
                println!("{}\n", result.response);
            }
            Err(e) => {
                eprintln!("error: {e}\n");
            }
        }
    }

    println!("Hasta luego!");
    Ok(())
}
