//! Quire - replays an edit script against the built-in extensions.
//!
//! Usage: quire [-c FILE] [--disable NAME]... [SCRIPT]
//!
//! Without SCRIPT the steps are read from standard input.

mod script;

use anyhow::{Context, Result};
use clap::Parser;
use quire_extensions::builtin::{self, autocomplete, character_limit, history};
use quire_extensions::{compose, Composition, Overrides};
use quire_reactive::{effect, Disposer};
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quire", about, long_about = None)]
struct Args {
    /// JSON file with per-extension config overrides
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable an extension by name (repeatable)
    #[arg(long = "disable", value_name = "NAME")]
    disabled: Vec<String>,

    /// Edit script to replay; standard input when omitted
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,
}

fn overrides(args: &Args) -> Result<Overrides> {
    let mut overrides = match &args.config {
        Some(path) => {
            log::info!("Loading config overrides: {}", path.display());
            Overrides::from_path(path)?
        }
        None => Overrides::new(),
    };
    for name in &args.disabled {
        overrides = overrides.set(name.as_str(), "disabled", json!(true));
    }
    Ok(overrides)
}

fn report(composition: &Composition) -> Result<()> {
    let editor = composition.editor()?;
    println!("{}", editor.state().text_content());
    println!("---");
    if let Ok(limit) = composition.output::<character_limit::CharacterLimitOutput>(character_limit::NAME) {
        println!(
            "characters: {} ({} remaining)",
            limit.count.peek(),
            limit.remaining.peek()
        );
    }
    if let Ok(history) = composition.output::<history::HistoryOutput>(history::NAME) {
        println!(
            "can undo: {}, can redo: {}",
            history.can_undo.peek(),
            history.can_redo.peek()
        );
    }
    if let Ok(complete) = composition.output::<autocomplete::AutocompleteOutput>(autocomplete::NAME) {
        if let Some(suggestion) = complete.suggestion.peek() {
            println!("suggestion: {}", suggestion);
        }
    }
    Ok(())
}

fn run() -> Result<()> {
    let args = Args::parse();
    let source = match &args.script {
        Some(path) => {
            log::info!("Replaying script: {}", path.display());
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?
        }
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            source
        }
    };
    let steps = script::parse(&source)?;

    let mut composition = compose(&builtin::all()?, overrides(&args)?)?;
    log::info!(
        "Composed extensions: {}",
        composition.names()?.collect::<Vec<_>>().join(", ")
    );

    let watcher = match composition.output::<character_limit::CharacterLimitOutput>(character_limit::NAME) {
        Ok(limit) => Some(effect(move || {
            if limit.is_over_limit() {
                log::warn!("over the character limit by {}", -limit.remaining.get());
            }
            Disposer::noop()
        })),
        Err(_) => None,
    };

    let editor = composition.editor()?.clone();
    for step in &steps {
        if !script::apply(&editor, step) {
            log::warn!("step not handled: {:?}", step);
        }
    }

    report(&composition)?;
    if let Some(watcher) = watcher {
        watcher.stop();
    }
    composition.dispose()?;
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Quire");

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }

    log::info!("Quire exited");
}
