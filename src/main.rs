//! studium CLI application
//!
//! Command-line interface for the studium library.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use studium::api::assistant::{CHAT_TOP_K, SEARCH_TOP_K};
use studium::config::{Config, LlmConfig};
use studium::utils::{format_file_size, is_supported_document, truncate_chars};
use studium::{
    AnswerEvent, Citation, DocumentDescriptor, DocumentText, LlmProvider, ScriptedProvider,
    StudiumError, StudyAssistant,
};

#[derive(Parser)]
#[command(name = "studium")]
#[command(about = "AI study assistant: ingest course documents, ask cited questions, build quizzes")]
#[command(version)]
struct Cli {
    /// Directory holding the per-document indices
    #[arg(long, global = true, default_value = "vector_stores")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a course document into the index store
    Ingest {
        /// Input text/markdown file; form feed characters mark page breaks
        input: PathBuf,

        /// Document id (defaults to the file stem)
        #[arg(long)]
        document_id: Option<String>,
    },

    /// Ask a question against ingested documents
    Ask {
        /// The question to ask
        question: String,

        /// Document to search, as ID or ID:DISPLAY_NAME (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<String>,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long, default_value_t = CHAT_TOP_K)]
        top_k: usize,

        /// Stream the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Search for matching passages across documents
    Search {
        /// Search query
        query: String,

        /// Document to search, as ID or ID:DISPLAY_NAME (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<String>,

        /// Number of results to return
        #[arg(short = 'k', long, default_value_t = SEARCH_TOP_K)]
        top_k: usize,
    },

    /// Generate a multiple-choice quiz from documents
    Quiz {
        /// Document to draw from, as ID or ID:DISPLAY_NAME (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<String>,

        /// Number of questions
        #[arg(long, default_value_t = 5)]
        count: usize,
    },

    /// Interactive chat with your documents
    Chat {
        /// Document to search, as ID or ID:DISPLAY_NAME (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { input, document_id } => {
            ingest_command(&cli.store, input, document_id).await?;
        }
        Commands::Ask {
            question,
            docs,
            top_k,
            stream,
        } => {
            let assistant = assistant_with_llm(&cli.store)?;
            let documents = parse_descriptors(&assistant, &docs);
            if stream {
                ask_stream_command(&assistant, &question, &documents, top_k).await?;
            } else {
                ask_command(&assistant, &question, &documents, top_k).await?;
            }
        }
        Commands::Search { query, docs, top_k } => {
            let assistant = assistant_without_llm(&cli.store)?;
            let documents = parse_descriptors(&assistant, &docs);
            search_command(&assistant, &query, &documents, top_k).await?;
        }
        Commands::Quiz { docs, count } => {
            let assistant = assistant_with_llm(&cli.store)?;
            let documents = parse_descriptors(&assistant, &docs);
            quiz_command(&assistant, &documents, count).await?;
        }
        Commands::Chat { docs } => {
            let assistant = assistant_with_llm(&cli.store)?;
            let documents = parse_descriptors(&assistant, &docs);
            chat_command(&assistant, &documents).await?;
        }
    }

    Ok(())
}

/// Build an assistant with the environment-selected completion backend
fn assistant_with_llm(store: &Path) -> anyhow::Result<StudyAssistant> {
    let mut config = Config::default();
    config.storage.root = store.to_path_buf();
    config.llm = LlmConfig::from_env();
    let provider = LlmProvider::from_config(&config.llm)?;
    Ok(StudyAssistant::new(&config, provider)?)
}

/// Build an assistant for commands that never call the completion backend
fn assistant_without_llm(store: &Path) -> anyhow::Result<StudyAssistant> {
    let mut config = Config::default();
    config.storage.root = store.to_path_buf();
    let provider = LlmProvider::Scripted(ScriptedProvider::new(""));
    Ok(StudyAssistant::new(&config, provider)?)
}

/// Parse `ID` or `ID:DISPLAY_NAME` document arguments
fn parse_descriptors(assistant: &StudyAssistant, docs: &[String]) -> Vec<DocumentDescriptor> {
    docs.iter()
        .map(|spec| {
            let (id, display_name) = match spec.split_once(':') {
                Some((id, display_name)) => (id, display_name),
                None => (spec.as_str(), spec.as_str()),
            };
            assistant.describe(id, display_name)
        })
        .collect()
}

async fn ingest_command(
    store: &Path,
    input: PathBuf,
    document_id: Option<String>,
) -> anyhow::Result<()> {
    if !is_supported_document(&input) {
        anyhow::bail!("Unsupported document format: {}", input.display());
    }

    let raw = std::fs::read_to_string(&input)?;
    let document = if raw.contains('\x0c') {
        DocumentText::paginated(raw.split('\x0c').map(str::to_string).collect())
    } else {
        DocumentText::plain(raw)
    };

    let document_id = document_id.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string())
    });

    let assistant = assistant_without_llm(store)?;
    let handle = assistant.ingest(&document, &document_id).await?;

    let index_size = std::fs::metadata(handle.path()).map(|m| m.len()).unwrap_or(0);
    println!(
        "Indexed '{}' -> {} ({})",
        document_id,
        handle.path().display(),
        format_file_size(index_size)
    );
    println!("Query it with: studium ask \"...\" --doc {}", document_id);
    Ok(())
}

async fn ask_command(
    assistant: &StudyAssistant,
    question: &str,
    documents: &[DocumentDescriptor],
    top_k: usize,
) -> anyhow::Result<()> {
    match assistant.ask(question, documents, top_k).await {
        Ok(answer) => {
            println!("{}", answer.answer);
            print_sources(&answer.sources);
        }
        Err(StudiumError::NoMaterials) => print_no_materials(),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn ask_stream_command(
    assistant: &StudyAssistant,
    question: &str,
    documents: &[DocumentDescriptor],
    top_k: usize,
) -> anyhow::Result<()> {
    let mut events = match assistant.ask_stream(question, documents, top_k).await {
        Ok(events) => events,
        Err(StudiumError::NoMaterials) => {
            print_no_materials();
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut completed = false;
    while let Some(event) = events.recv().await {
        match event {
            Ok(AnswerEvent::Delta(delta)) => {
                print!("{}", delta);
                io::stdout().flush()?;
            }
            Ok(AnswerEvent::Sources(sources)) => {
                println!();
                print_sources(&sources);
                completed = true;
            }
            Err(e) => {
                println!();
                return Err(e.into());
            }
        }
    }

    if !completed {
        anyhow::bail!("Answer stream ended before the source list");
    }
    Ok(())
}

async fn search_command(
    assistant: &StudyAssistant,
    query: &str,
    documents: &[DocumentDescriptor],
    top_k: usize,
) -> anyhow::Result<()> {
    let start_time = std::time::Instant::now();
    match assistant.search(query, documents, top_k).await {
        Ok(results) => {
            let elapsed = start_time.elapsed();
            println!(
                "Found {} results in {:.3}s:\n",
                results.len(),
                elapsed.as_secs_f64()
            );
            for (i, result) in results.iter().enumerate() {
                let location = match result.page {
                    Some(page) => format!("{}, page {}", result.display_name, page),
                    None => result.display_name.clone(),
                };
                println!(
                    "{}. [Score: {:.3}] ({}) {}",
                    i + 1,
                    result.similarity,
                    location,
                    truncate_chars(&result.text, 100)
                );
            }
        }
        Err(StudiumError::NoMaterials) => print_no_materials(),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn quiz_command(
    assistant: &StudyAssistant,
    documents: &[DocumentDescriptor],
    count: usize,
) -> anyhow::Result<()> {
    match assistant.quiz(documents, count).await {
        Ok(questions) => {
            for (i, question) in questions.iter().enumerate() {
                println!("{}. {}", i + 1, question.question);
                for (key, option) in &question.options {
                    println!("   {}. {}", key, option);
                }
                println!("   Answer: {}\n", question.answer);
            }
        }
        Err(StudiumError::NoMaterials) => print_no_materials(),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn chat_command(
    assistant: &StudyAssistant,
    documents: &[DocumentDescriptor],
) -> anyhow::Result<()> {
    println!("Interactive chat over {} document(s)", documents.len());
    println!("Type 'help' for commands, 'exit' to quit");
    println!("{}", "-".repeat(50));

    loop {
        print!("\nYou: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("\nCommands:");
                println!("  search <query> - Show raw search results");
                println!("  help           - Show this help");
                println!("  exit/quit      - End session");
                continue;
            }
            _ => {
                if let Some(query) = input.strip_prefix("search ") {
                    search_command(assistant, query, documents, CHAT_TOP_K).await?;
                    continue;
                }

                let start_time = std::time::Instant::now();
                match assistant.ask(input, documents, CHAT_TOP_K).await {
                    Ok(answer) => {
                        let elapsed = start_time.elapsed();
                        println!("\nAssistant: {}", answer.answer);
                        print_sources(&answer.sources);
                        println!("[{:.1}s]", elapsed.as_secs_f64());
                    }
                    Err(StudiumError::NoMaterials) => print_no_materials(),
                    Err(e) => println!("Error: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn print_sources(sources: &[Citation]) {
    if sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for source in sources {
        let pages = if source.pages.is_empty() {
            String::new()
        } else {
            let pages: Vec<String> = source.pages.iter().map(|p| p.to_string()).collect();
            format!(" (pages {})", pages.join(", "))
        };
        println!(
            "  [{}] {}{}",
            source.citation_number, source.display_name, pages
        );
    }
}

fn print_no_materials() {
    println!("No course materials found. Please ingest documents first.");
}
