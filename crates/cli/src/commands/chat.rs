//! `kangae chat` — ask once, or talk to the agent interactively.

use futures::StreamExt;
use kangae_agent::{Reasoner, ReasonerOptions, Step, Strategy};
use kangae_config::{AppConfig, MemoryKind, TotLevel};
use kangae_core::memory::Memory;
use kangae_memory::{ConversationMemory, VectorMemory};
use kangae_tools::default_registry;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::model::CommandModel;

/// Command-line overrides for one chat session.
#[derive(Debug, Default)]
pub struct ChatArgs {
    pub message: Option<String>,
    pub strategy: Option<Strategy>,
    pub memory: Option<MemoryKind>,
    pub memory_file: Option<PathBuf>,
    pub max_turns: Option<usize>,
    pub depth: Option<usize>,
    pub breadth: Option<usize>,
    pub tot_level: Option<TotLevel>,
    pub stream: bool,
}

/// Settings after command-line flags have been laid over the config.
#[derive(Debug, PartialEq)]
struct Session {
    strategy: Strategy,
    memory: MemoryKind,
    memory_file: Option<PathBuf>,
    options: ReasonerOptions,
}

impl Session {
    fn resolve(config: &AppConfig, args: &ChatArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let strategy = match args.strategy {
            Some(strategy) => strategy,
            None => config.agent.strategy.parse::<Strategy>()?,
        };

        let mut tot = config.tot.clone();
        if args.tot_level.is_some() {
            tot.level = args.tot_level;
        }
        if args.depth.is_some() {
            tot.depth = args.depth;
        }
        if args.breadth.is_some() {
            tot.breadth = args.breadth;
        }
        let (max_depth, breadth) = tot.resolved();

        Ok(Self {
            strategy,
            memory: args.memory.unwrap_or(config.memory.kind),
            memory_file: args.memory_file.clone().or_else(|| config.memory.file.clone()),
            options: ReasonerOptions {
                max_turns: args.max_turns.unwrap_or(config.agent.max_turns),
                recall_limit: config.agent.recall_limit,
                max_depth,
                breadth,
            },
        })
    }
}

/// clap value parser for budgets that must be at least 1.
pub fn positive(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("'{value}' is not a positive integer")),
    }
}

pub(crate) fn open_memory(kind: MemoryKind) -> Arc<dyn Memory> {
    match kind {
        MemoryKind::Conversation => Arc::new(ConversationMemory::new()),
        MemoryKind::Vector => Arc::new(VectorMemory::new()),
    }
}

/// Load a saved log into `memory`. A missing file is a fresh session; any
/// other failure is logged and the session starts empty.
async fn restore(memory: &dyn Memory, path: &Path) {
    if !path.exists() {
        debug!("No memory file at {}, starting fresh", path.display());
        return;
    }
    match memory.load(path).await {
        Ok(()) => info!("Loaded memory from {}", path.display()),
        Err(e) => warn!("Failed to load memory from {}: {e}", path.display()),
    }
}

/// How a step is shown in streaming mode.
fn render(step: &Step) -> String {
    match step {
        Step::Answer(answer) => format!("答え: {answer}"),
        other => other.to_string(),
    }
}

async fn ask(reasoner: &Reasoner, question: &str, stream: bool) {
    if stream {
        let mut steps = reasoner.run_iter(question);
        while let Some(step) = steps.next().await {
            for line in render(&step).lines() {
                println!("  {line}");
            }
        }
        return;
    }

    eprint!("  ...");
    let result = reasoner.run(question).await;
    eprint!("\r     \r");
    match result {
        Ok(answer) => {
            for line in format!("答え: {answer}").lines() {
                println!("  {line}");
            }
        }
        Err(failure) => println!("  {failure}"),
    }
}

pub async fn run(config: AppConfig, args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::resolve(&config, &args)?;

    let Some(model) = CommandModel::from_config(&config.model) else {
        eprintln!();
        eprintln!("  ERROR: No language model configured!");
        eprintln!();
        eprintln!("  Kangae runs a command per completion: the prompt goes to its");
        eprintln!("  stdin and its stdout is taken as the model's reply.");
        eprintln!();
        eprintln!("  Set the environment variable:");
        eprintln!("    KANGAE_MODEL_COMMAND=ollama-prompt");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("    [model]");
        eprintln!("    command = \"ollama\"");
        eprintln!("    args = [\"run\", \"llama3\"]");
        eprintln!();
        return Err("No language model configured".into());
    };

    let memory = open_memory(session.memory);
    if let Some(path) = &session.memory_file {
        restore(memory.as_ref(), path).await;
    }

    let tools = Arc::new(default_registry(Some(memory.clone())));
    let tool_names = tools.names().join(", ");
    let reasoner = Reasoner::build(
        session.strategy,
        Arc::new(model),
        tools,
        Some(memory.clone()),
        session.options,
    );
    info!(strategy = %session.strategy, memory = %session.memory, "Session ready");

    if let Some(question) = args.message {
        ask(&reasoner, &question, args.stream).await;
    } else {
        println!();
        println!("  ╔══════════════════════════════════════════════╗");
        println!("  ║          Kangae — Interactive Mode           ║");
        println!("  ╚══════════════════════════════════════════════╝");
        println!();
        println!("  Strategy:  {} ({})", session.strategy, session.strategy.description());
        println!("  Memory:    {}", session.memory);
        if session.strategy == Strategy::React {
            println!("  Tools:     {tool_names}");
        }
        if session.strategy == Strategy::Tot {
            println!(
                "  Search:    depth {}, breadth {}",
                session.options.max_depth, session.options.breadth
            );
        }
        println!();
        println!("  Type your question and press Enter.");
        println!("  An empty line or Ctrl+D quits.");
        println!();

        converse(&reasoner, BufReader::new(tokio::io::stdin()), args.stream).await;

        println!();
        println!("  Goodbye!");
        println!();
    }

    if let Some(path) = &session.memory_file {
        persist(memory.as_ref(), path).await;
    }

    Ok(())
}

/// Answer questions line by line until an empty line, end of input, or a
/// read error. Never fails, so the caller always reaches [`persist`].
async fn converse<R>(reasoner: &Reasoner, input: R, stream: bool)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        print!("  質問: ");
        if let Err(e) = std::io::stdout().flush() {
            warn!("Failed to flush stdout: {e}");
            break;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                println!();
                break;
            }
            Err(e) => {
                println!();
                warn!("Failed to read input: {e}");
                break;
            }
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        println!();
        ask(reasoner, question, stream).await;
        println!();
    }
}

async fn persist(memory: &dyn Memory, path: &Path) {
    match memory.save(path).await {
        Ok(()) => info!("Saved memory to {}", path.display()),
        Err(e) => warn!("Failed to save memory to {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kangae_agent::Failure;
    use kangae_core::message::Role;

    #[test]
    fn config_supplies_defaults() {
        let session = Session::resolve(&AppConfig::default(), &ChatArgs::default()).unwrap();
        assert_eq!(session.strategy, Strategy::React);
        assert_eq!(session.memory, MemoryKind::Conversation);
        assert_eq!(session.memory_file, None);
        assert_eq!(session.options, ReasonerOptions::default());
    }

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        config.agent.strategy = "cot".into();
        config.tot.level = Some(TotLevel::High);
        config.memory.file = Some(PathBuf::from("/tmp/configured.json"));

        let args = ChatArgs {
            strategy: Some(Strategy::Tot),
            memory: Some(MemoryKind::Vector),
            max_turns: Some(9),
            breadth: Some(1),
            ..ChatArgs::default()
        };
        let session = Session::resolve(&config, &args).unwrap();
        assert_eq!(session.strategy, Strategy::Tot);
        assert_eq!(session.memory, MemoryKind::Vector);
        assert_eq!(session.memory_file, Some(PathBuf::from("/tmp/configured.json")));
        assert_eq!(session.options.max_turns, 9);
        assert_eq!(session.options.max_depth, 4);
        assert_eq!(session.options.breadth, 1);
    }

    #[test]
    fn tot_level_flag_replaces_configured_level() {
        let mut config = AppConfig::default();
        config.tot.level = Some(TotLevel::Extreme);
        let args = ChatArgs {
            tot_level: Some(TotLevel::Low),
            ..ChatArgs::default()
        };
        let session = Session::resolve(&config, &args).unwrap();
        assert_eq!((session.options.max_depth, session.options.breadth), (2, 2));
    }

    #[test]
    fn positive_rejects_zero() {
        assert_eq!(positive("3"), Ok(3));
        assert!(positive("0").is_err());
        assert!(positive("-1").is_err());
        assert!(positive("many").is_err());
    }

    #[test]
    fn answers_are_labelled() {
        assert_eq!(render(&Step::Answer("42".into())), "答え: 42");
        assert_eq!(render(&Step::Observation("4".into())), "観察: 4");
        assert_eq!(
            render(&Step::Failed(Failure::MaxTurnsExceeded)),
            "エラー: 最大試行回数に達しました"
        );
    }

    #[tokio::test]
    async fn restore_tolerates_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let memory = open_memory(MemoryKind::Vector);

        restore(memory.as_ref(), &dir.path().join("absent.json")).await;

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "not json").unwrap();
        restore(memory.as_ref(), &corrupt).await;
        assert!(memory.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_input_ends_the_session_and_memory_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let memory = open_memory(MemoryKind::Conversation);
        let model: Arc<dyn kangae_core::model::LanguageModel> =
            Arc::new(|_: &str| "最終的な答え: 2".to_string());
        let reasoner = Reasoner::build(
            Strategy::Cot,
            model,
            Arc::new(default_registry(None)),
            Some(memory.clone()),
            ReasonerOptions::default(),
        );

        let input: &[u8] = b"1+1\n\xff\xfe\nnever asked\n";
        converse(&reasoner, BufReader::new(input), false).await;
        persist(memory.as_ref(), &path).await;

        let saved = open_memory(MemoryKind::Conversation);
        saved.load(&path).await.unwrap();
        assert_eq!(saved.search("1+1", 5).await.unwrap(), vec!["1+1"]);
        assert_eq!(saved.search("2", 5).await.unwrap(), vec!["2"]);
        assert!(saved.search("never", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restore_loads_saved_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let first = open_memory(MemoryKind::Conversation);
        first.add(Role::User, "円周率は3.14").await.unwrap();
        first.save(&path).await.unwrap();

        let second = open_memory(MemoryKind::Conversation);
        restore(second.as_ref(), &path).await;
        assert_eq!(second.search("円周率", 5).await.unwrap(), vec!["円周率は3.14"]);
    }
}
