use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// Import from our modular crates
use municode_core::{AttributeSelection, Model};
use municode_cortex::{CortexClient, CortexConfig};
use municode_rag::{
    CONTEXT_LENGTH_OPTIONS, ChatEngine, ChatSession, DEFAULT_CONTEXT_LENGTH, DEFAULT_LIMIT,
    SearchForm, SearchSession,
};

#[derive(Parser)]
#[command(name = "municode")]
#[command(about = "Search and chat over the San Diego municipal code", long_about = None)]
struct Cli {
    /// Database holding the search service
    #[arg(long, global = true)]
    database: Option<String>,

    /// Schema holding the search service
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Cortex Search service name
    #[arg(long, global = true)]
    service: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask questions answered from retrieved municipal code passages
    Chat {
        /// Completion model (mistral-large2, llama3.1-70b, llama3.1-8b)
        #[arg(short, long, default_value_t = Model::default())]
        model: Model,

        /// Number of context chunks to retrieve
        #[arg(long, default_value_t = ChatSession::DEFAULT_CHUNKS as u8,
              value_parser = clap::value_parser!(u8).range(1..=10))]
        chunks: u8,

        /// Answer a single question and exit
        #[arg(short, long)]
        question: Option<String>,
    },

    /// Search the municipal code and show matching excerpts
    Search {
        /// Run a single query and exit
        query: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_LIMIT as u32,
              value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,

        /// Characters of each result shown before truncation
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LENGTH, value_parser = parse_context_length)]
        context_length: usize,

        /// Attribute filter, repeatable
        #[arg(short, long = "filter", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,

        /// Column holding multi-valued attributes, repeatable
        #[arg(long = "array-attribute", value_name = "COLUMN")]
        array_attributes: Vec<String>,

        /// Print the untruncated text of result N after the query
        #[arg(long, value_name = "N", requires = "query",
              value_parser = clap::value_parser!(u32).range(1..))]
        full: Option<u32>,
    },
}

fn parse_context_length(raw: &str) -> std::result::Result<usize, String> {
    let value: usize = raw.parse().map_err(|_| format!("'{}' is not a number", raw))?;
    if CONTEXT_LENGTH_OPTIONS.contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be one of {:?}", CONTEXT_LENGTH_OPTIONS))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,municode=debug,municode_core=debug,municode_cortex=debug,municode_rag=debug,municode_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<CortexConfig> {
    let config = CortexConfig::from_env()?;
    let database = cli.database.clone().unwrap_or_else(|| config.database.clone());
    let schema = cli.schema.clone().unwrap_or_else(|| config.schema.clone());
    let service = cli.service.clone().unwrap_or_else(|| config.service.clone());
    Ok(config.with_service(database, schema, service))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let client = Arc::new(CortexClient::new(config)?);

    match cli.command {
        Commands::Chat {
            model,
            chunks,
            question,
        } => {
            let engine = ChatEngine::new(client.clone(), client);
            let mut session = ChatSession::new(model, chunks as usize)?;
            municode_cli::run_chat(&engine, &mut session, question).await?;
        }
        Commands::Search {
            query,
            limit,
            context_length,
            filters,
            array_attributes,
            full,
        } => {
            let mut attributes = AttributeSelection::new();
            for pair in &filters {
                attributes.select_pair(pair)?;
            }

            let mut form = SearchForm::default();
            form.query = query.unwrap_or_default();
            form.set_limit(limit as usize)?;
            form.set_context_length(context_length)?;
            form.attributes = attributes;
            form.array_attributes = array_attributes.into_iter().collect();

            let mut session = SearchSession::start(client, form)
                .await
                .context("could not describe the search service")?;
            municode_cli::run_search(&mut session, full.map(|n| n as usize)).await?;
        }
    }

    Ok(())
}
