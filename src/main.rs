use anyhow::{Context, Result};
use promptchain::agent::{AgentExecutor, CurrentTimeTool};
use promptchain::chat::ChatSession;
use promptchain::cli::commands::{
    AgentCommand, ChatCommand, IngestCommand, QueryCommand, RunCommand, ValidateCommand,
};
use promptchain::cli::output::*;
use promptchain::cli::{Cli, Command};
use promptchain::core::{AppConfig, Payload, Step, Variables};
use promptchain::persistence::{InMemoryHistory, MessageHistory};
use promptchain::provider::{CompletionProvider, EmbeddingProvider, OpenAiChat, OpenAiEmbeddings};
use promptchain::retrieval::{
    ingest, DirectorySource, DocumentSource, FileSource, SimilarityStore, WebSource,
};
use promptchain::steps::RetrieveStep;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_chain(cmd, &cli).await?,
        Command::Validate(cmd) => validate_config(cmd, &cli)?,
        Command::Chat(cmd) => chat(cmd, &cli).await?,
        Command::Ingest(cmd) => ingest_documents(cmd, &cli).await?,
        Command::Query(cmd) => query_store(cmd, &cli).await?,
        Command::Agent(cmd) => ask_agent(cmd, &cli).await?,
    }

    Ok(())
}

/// `--config`, else the default path when present, else built-in defaults
fn load_config(cli: &Cli) -> Result<AppConfig> {
    if let Some(path) = &cli.config {
        return AppConfig::from_file(path).context("Failed to load config");
    }

    match AppConfig::default_path() {
        Some(path) if path.exists() => {
            debug!("Using config at {}", path.display());
            AppConfig::from_file(&path).context("Failed to load config")
        }
        _ => {
            debug!("No config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn completion_provider(config: &AppConfig) -> Result<Arc<dyn CompletionProvider>> {
    let chat = OpenAiChat::from_config(&config.provider)
        .context("Failed to configure completion provider")?;
    Ok(Arc::new(chat))
}

fn embedding_provider(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embeddings = OpenAiEmbeddings::from_config(&config.embeddings)
        .context("Failed to configure embedding provider")?;
    Ok(Arc::new(embeddings))
}

#[cfg(feature = "sqlite")]
async fn open_store(config: &AppConfig, collection: Option<&str>) -> Result<Arc<dyn SimilarityStore>> {
    let collection = collection.unwrap_or(&config.store.collection);
    let directory = config.store_directory();
    debug!("Opening store {} in {}", collection, directory.display());
    let store = promptchain::retrieval::SqliteStore::open(&directory, collection)
        .await
        .context("Failed to open document store")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_store(config: &AppConfig, collection: Option<&str>) -> Result<Arc<dyn SimilarityStore>> {
    let collection = collection.unwrap_or(&config.store.collection);
    tracing::warn!("Built without sqlite, collection {} is not persisted", collection);
    Ok(Arc::new(promptchain::retrieval::InMemoryStore::new()))
}

async fn run_chain(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let provider = completion_provider(&config)?;
    let pipeline = config
        .chain(&cmd.chain, provider)
        .context("Failed to build chain")?;

    println!(
        "{} Loaded chain: {} ({} steps)",
        INFO,
        style(pipeline.name()).bold(),
        style(pipeline.len()).cyan()
    );

    let mut variables = Variables::new();
    for (key, value) in &cmd.vars {
        println!(
            "{} Variable: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
        variables.insert(key.clone(), value.clone());
    }

    println!("{} Running {}", ROCKET, style(pipeline.name()).bold());
    match pipeline.run(Payload::Variables(variables)).await {
        Ok(output) => {
            println!("\n{}", format_payload(&output));
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(pipeline.name()).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{}", format_error(&e));
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn validate_config(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    println!("{} Validating configuration...", INFO);

    match load_config(cli) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Model: {}", style(&config.provider.model).bold());
            println!("  Templates: {}", style(config.templates.len()).cyan());
            println!("  Chains: {}", style(config.chains.len()).cyan());
            for (name, steps) in &config.chains {
                let kinds: Vec<&str> = steps.iter().map(|s| s.kind_name()).collect();
                println!("    {} {}", style(name).bold(), style(kinds.join(" -> ")).dim());
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn chat(cmd: &ChatCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let provider = completion_provider(&config)?;

    let history: Arc<dyn MessageHistory> = if cmd.ephemeral {
        Arc::new(InMemoryHistory::new())
    } else {
        persistent_history().await?
    };

    if cmd.reset {
        history
            .clear(&cmd.session)
            .await
            .context("Failed to reset session")?;
        println!("{} Cleared session {}", INFO, style(&cmd.session).cyan());
    }

    let session = ChatSession::start(provider, history, &cmd.session, cmd.system.as_deref())
        .await
        .context("Failed to open chat session")?;

    let transcript = session.transcript().await?;
    println!(
        "{} Session {} ({} messages). Type {} to quit.",
        INFO,
        style(session.session()).cyan(),
        transcript.len(),
        style("exit").bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("you>").green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.send(line).await {
            Ok(reply) => println!("{} {}\n", style("ai>").cyan().bold(), reply),
            Err(e) => println!("{} {}", CROSS, style(e).red()),
        }
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn persistent_history() -> Result<Arc<dyn MessageHistory>> {
    let history = promptchain::persistence::SqliteHistory::with_default_path()
        .await
        .context("Failed to open chat history")?;
    Ok(Arc::new(history))
}

#[cfg(not(feature = "sqlite"))]
async fn persistent_history() -> Result<Arc<dyn MessageHistory>> {
    tracing::warn!("Built without sqlite, chat history is not persisted");
    Ok(Arc::new(InMemoryHistory::new()))
}

async fn ingest_documents(cmd: &IngestCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let chunker = config.chunking.chunker()?;
    let embedder = embedding_provider(&config)?;
    let store = open_store(&config, cmd.collection.as_deref()).await?;

    let source: Box<dyn DocumentSource> = match (&cmd.file, &cmd.dir, &cmd.url) {
        (Some(file), _, _) => Box::new(FileSource::new(file)),
        (_, Some(dir), _) => Box::new(DirectorySource::new(dir)),
        (_, _, Some(url)) => Box::new(WebSource::new(url)),
        _ => anyhow::bail!("one of --file, --dir or --url is required"),
    };

    println!("{} Ingesting {}", ROCKET, style(source.describe()).bold());

    let mut progress = None;
    let report = ingest(
        source.as_ref(),
        &chunker,
        embedder.as_ref(),
        store.as_ref(),
        cmd.force,
        |done, total| {
            progress
                .get_or_insert_with(|| create_progress_bar(total))
                .set_position(done as u64);
        },
    )
    .await;
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    match report {
        Ok(report) if report.skipped => {
            println!(
                "{} Store already has entries, nothing ingested (use {} to add anyway)",
                WARN,
                style("--force").bold()
            );
            Ok(())
        }
        Ok(report) => {
            println!(
                "{} Stored {} chunks from {} documents",
                CHECK,
                style(report.chunks).cyan(),
                style(report.documents).cyan()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", CROSS, style(&e).red());
            std::process::exit(1);
        }
    }
}

async fn query_store(cmd: &QueryCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let embedder = embedding_provider(&config)?;
    let store = open_store(&config, cmd.collection.as_deref()).await?;

    let retrieve = RetrieveStep::new("query", embedder, store)
        .with_k(cmd.k.unwrap_or(config.retrieval.k))
        .with_min_score(cmd.min_score.unwrap_or(config.retrieval.min_score));

    match retrieve.execute(cmd.query.clone()).await {
        Ok(documents) if documents.is_empty() => {
            println!("{} No relevant documents found", INFO);
            Ok(())
        }
        Ok(documents) => {
            println!("{} {} relevant documents:\n", INFO, style(documents.len()).cyan());
            println!("{}", format_documents(&documents, 10));
            Ok(())
        }
        Err(e) => {
            println!("{}", format_error(&e));
            std::process::exit(1);
        }
    }
}

async fn ask_agent(cmd: &AgentCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let provider = completion_provider(&config)?;
    let agent = AgentExecutor::new(provider)
        .with_tool(Arc::new(CurrentTimeTool))
        .with_max_iterations(cmd.max_iterations.unwrap_or(config.agent.max_iterations));

    println!("{} {}", ROCKET, style(&cmd.question).bold());
    match agent.run(&cmd.question).await {
        Ok(outcome) => {
            for step in &outcome.steps {
                println!(
                    "{} {}({}) -> {}",
                    SPINNER,
                    style(&step.tool).cyan(),
                    style(&step.input).dim(),
                    format_output(&step.observation, 3)
                );
            }
            println!("\n{} {}", CHECK, outcome.answer);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", CROSS, style(&e).red());
            std::process::exit(1);
        }
    }
}
