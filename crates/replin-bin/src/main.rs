//! Demo REPL wrapping the line editor around an echo evaluator.
use anyhow::Result;
use clap::Parser;
use replin_complete::WordCompleter;
use replin_config::load_from;
use replin_history::{MemoryHistory, SharedHistory};
use replin_modal::{ModalEditor, PromptConfig, run_interface};
use replin_term::{CrosstermTerm, StdinReader};
use std::sync::Arc;
use tracing::info;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "replin", version, about = "Interactive line editor demo")]
struct Args {
    /// Configuration file path (overrides discovery of `replin.toml`).
    #[arg(long = "config")]
    config: Option<std::path::PathBuf>,
    /// Disable background completion hints.
    #[arg(long = "no-hints")]
    no_hints: bool,
}

const COMMANDS: &[&str] = &[
    "help", "hello", "history", "print", "println", "printf", "quit", "clear", "version",
];

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = std::path::Path::new("replin.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(log_path);
    }
    let file_appender = tracing_appender::rolling::never(".", "replin.log");
    let (nb_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .init();
    info!(target: "runtime", "startup");

    // log panics before the terminal is restored by the backend's Drop
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(target: "runtime.panic", ?info, "panic");
        default_panic(info);
    }));

    let args = Args::parse();
    let opts = load_from(args.config)?;

    let history = SharedHistory::new(MemoryHistory::default());
    let completer = Arc::new(WordCompleter::new(COMMANDS.iter().copied()));
    loop {
        let prompt = PromptConfig {
            prompt: "replin> ".to_string(),
            prompt_prefix: "\x1b[32m".to_string(),
            prompt_suffix: "\x1b[0m".to_string(),
            // a trailing backslash continues the line
            on_enter: Some(Box::new(|line: &str| !line.trim_end().ends_with('\\'))),
            ..Default::default()
        };
        let mut editor = ModalEditor::new(prompt, Box::new(history.clone()))
            .with_options(opts.clone())
            .with_completer(completer.clone());
        if args.no_hints {
            editor = editor.without_hints();
        }

        let term = Box::new(CrosstermTerm::new());
        let reader = Box::new(StdinReader::new());
        match run_interface(term, reader, editor).await? {
            Some(line) => {
                let trimmed = line.trim();
                if trimmed == "quit" {
                    break;
                }
                if !trimmed.is_empty() {
                    println!("{trimmed}");
                }
            }
            None => break,
        }
    }
    info!(target: "runtime", "shutdown");
    Ok(())
}
