//! # Arbitration Estimator CLI (`arbx`)
//!
//! ## Usage
//!
//! ```bash
//! arbx --config ./config/arbx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `arbx estimate "<case>"` | Run the full pipeline and print ranked cases plus the report |
//! | `arbx check` | Show which provider credentials are configured |
//! | `arbx serve` | Start the HTTP API |
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SERPAPI_API_KEY` | Search credential. Without it every run fails. |
//! | `GROQ_API_KEY` | LLM credential. Without it expansion and synthesis fall back. |
//! | `GROQ_MODEL` | Overrides `[llm].model`. |
//! | `RUST_LOG` | Log filter (logs go to stderr). |

use anyhow::Result;
use arbitration_core::state::WorkflowState;
use arbitration_estimator::config::{self, Credentials};
use arbitration_estimator::embedding::create_embedder;
use arbitration_estimator::logging;
use arbitration_estimator::pipeline::Pipeline;
use arbitration_estimator::server;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Estimate arbitration award amounts from comparable published cases.
///
/// Settings are read from `--config` when the file exists, otherwise
/// built-in defaults apply. See `config/arbx.example.toml`.
#[derive(Parser)]
#[command(name = "arbx", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/arbx.toml")]
    config: PathBuf,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the estimation pipeline for one case description.
    Estimate {
        /// Free-text description of the dispute.
        query: String,

        /// Print the final workflow state as JSON instead of a report.
        #[arg(long)]
        json: bool,
    },

    /// Show which credentials and providers are configured.
    Check,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Check => {
            let creds = Credentials::from_env(&cfg);
            print_check(&cfg, &creds);
        }
        Commands::Estimate { query, json } => {
            let embedder = create_embedder(&cfg.embedding)?;
            let pipeline = Pipeline::from_config(&cfg, embedder)?;
            let state = pipeline.run(&query).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_report(&state);
            }
            if state.is_failed() {
                std::process::exit(1);
            }
        }
        Commands::Serve => {
            let embedder = create_embedder(&cfg.embedding)?;
            let pipeline = Pipeline::from_config(&cfg, embedder)?;
            server::run_server(Arc::new(pipeline)).await?;
        }
    }

    Ok(())
}

fn configured(present: bool) -> &'static str {
    if present {
        "configured"
    } else {
        "missing"
    }
}

fn print_check(cfg: &config::Config, creds: &Credentials) {
    println!(
        "search     {:<20} {}",
        cfg.search.api_key_env,
        configured(creds.search_api_key.is_some())
    );
    println!(
        "llm        {:<20} {}",
        cfg.llm.api_key_env,
        configured(creds.llm_api_key.is_some())
    );
    println!("llm model  {}", cfg.llm.effective_model());
    println!(
        "embedding  {} ({})",
        cfg.embedding.provider,
        cfg.embedding.model.as_deref().unwrap_or("default model")
    );
}

fn print_report(state: &WorkflowState) {
    if let Some(error) = &state.error {
        eprintln!("Error: {}", error);
        return;
    }

    if let Some(main) = &state.enhanced_query {
        println!("Main query:   {}", main);
    }
    if let Some(amount) = &state.amount_query {
        println!("Amount query: {}", amount);
    }
    println!();

    println!("Ranked cases ({}):", state.ranked.len());
    for (i, doc) in state.ranked.iter().enumerate() {
        let title = if doc.title.is_empty() {
            "Untitled"
        } else {
            doc.title.as_str()
        };
        let kind = if doc.full_fetch { "full" } else { "snippet" };
        println!(
            "{:>2}. [{:>5.1}%] {} (score {}, {}, {})",
            i + 1,
            doc.similarity_or_zero() * 100.0,
            title,
            doc.score,
            doc.source,
            kind
        );
        println!("    {}", doc.url);
    }
    println!();

    if let Some(report) = &state.llm_response {
        println!("{}", report);
    }
}
