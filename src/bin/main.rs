use clap::{Parser, Subcommand};
use finance_rag_agent::{
    index::{embedding, LocalIndexService, VectorIndexService},
    ingest::create_index,
    llm, search, AnswerEnvelope, ConversationHistory, CorpusId, Orchestrator,
    OrchestratorOptions, Settings,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finance-agent", about = "Question answering over financial reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the vector index for a report (or `all`)
    Index {
        corpus: String,
        /// Rebuild even if an index already exists
        #[arg(long)]
        force: bool,
    },
    /// Ask one question
    Ask { corpus: String, question: String },
    /// Interactive chat; follow-up questions are rewritten against the history
    Chat { corpus: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    info!(llm = %settings.llm_backend, "Financial report assistant starting");

    let embedder = embedding::from_settings(&settings)?;
    let index = Arc::new(LocalIndexService::new(
        settings.db_path.clone(),
        embedder,
        settings.index_cache_capacity,
    ));

    match cli.command {
        Command::Index { corpus, force } => {
            let corpus = CorpusId::from_optional(Some(corpus.as_str()));
            if create_index(index.as_ref(), &settings, &corpus, force).await? {
                println!("Successfully indexed {} documents", corpus);
            } else {
                println!("Index for {} already exists; use --force to rebuild", corpus);
            }
        }
        Command::Ask { corpus, question } => {
            let corpus = CorpusId::from_optional(Some(corpus.as_str()));
            let orchestrator = build_orchestrator(&settings, index)?;
            let envelope = orchestrator.agentic_answer(&question, &corpus, None).await;
            print_envelope(&envelope);
        }
        Command::Chat { corpus } => {
            let corpus = CorpusId::from_optional(Some(corpus.as_str()));
            if !index.exists(&corpus).await? {
                create_index(index.as_ref(), &settings, &corpus, false).await?;
            }
            let orchestrator = build_orchestrator(&settings, index)?;
            chat(&orchestrator, &corpus).await?;
        }
    }

    Ok(())
}

fn build_orchestrator(
    settings: &Settings,
    index: Arc<LocalIndexService>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    Ok(Orchestrator::new(
        llm::from_settings(settings)?,
        index,
        search::from_settings(settings)?,
        OrchestratorOptions::from(settings),
    ))
}

async fn chat(orchestrator: &Orchestrator, corpus: &CorpusId) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut history = ConversationHistory::new();

    println!("Chatting about {}. Empty line or Ctrl-D to quit.", corpus);
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        let envelope = orchestrator
            .answer_with_history(question, corpus, &history)
            .await;
        print_envelope(&envelope);

        history.push_user(question);
        history.push_assistant(envelope.response);
    }
    Ok(())
}

fn print_envelope(envelope: &AnswerEnvelope) {
    println!("\n{}\n", envelope.response);
    let sources = envelope.source_summaries();
    if sources.is_empty() {
        return;
    }
    println!("Sources:");
    for source in sources {
        match source.page {
            Some(page) => println!("  [{}] {} (page {})", source.number, source.content, page),
            None => println!("  [{}] {}", source.number, source.content),
        }
    }
    println!();
}
