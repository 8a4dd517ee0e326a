use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sieve::api::create_router;
use sieve::config::{CONFIG, log_level_from_env};
use sieve::context::build_context;
use sieve::resolver::ProviderResolver;
use sieve::web_context::WebContextService;

#[derive(Parser)]
#[command(name = "sieve")]
#[command(about = "Search the web, scrape, chunk and rank passages for LLM context")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and print the result and the assembled context
    Retrieve {
        query: String,
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Subscriber first: CONFIG logs a warning for every value it cannot parse.
    // fmt().init() also installs the log -> tracing bridge
    tracing_subscriber::fmt()
        .with_max_level(log_level_from_env())
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let resolver = Arc::new(ProviderResolver::new(CONFIG.clone()).context("invalid configuration")?);

    match cli.command {
        Commands::Retrieve { query, max_results } => {
            let pipeline = resolver
                .pipeline()
                .await
                .context("web retrieval is not available, check WEB_RAG_PROVIDER and the search provider settings")?;
            let max_results = max_results.unwrap_or(CONFIG.max_results);
            let result = pipeline.retrieve_context(&query, max_results).await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            let (block, _) = build_context(&result, &query);
            println!("{block}");
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| CONFIG.listen_addr.clone());
            let service = Arc::new(WebContextService::new(resolver));
            let app = create_router(service);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            log::info!("listening on {addr}");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
