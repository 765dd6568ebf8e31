//! Refiner - conversational prompt refinement
//!
//! CLI entry point: interactive refinement sessions and history management.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use refiner::cli::{
    Cli, Command, HistoryCommand, RefineArgs, generate_after_help, get_log_path, pick_answer, resolve_history_id,
};
use refiner::collab::{EnvCredentials, JsonHistoryStore};
use refiner::config::Config;
use refiner::context::library::{self, EXAMPLES, TEMPLATES};
use refiner::context::stacks::{COMBINED_STACKS, KNOWN_STACKS};
use refiner::context::{EntryKind, LibraryEntry, Placeholders};
use refiner::domain::{AnswerSubmission, RefinementQuestion};
use refiner::events::{EventBus, NullTelemetry, Telemetry, create_event_bus, spawn_event_logger};
use refiner::llm::create_client;
use refiner::session::{RefinementSession, SessionOptions, SessionState};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // The after_help shows credential status for whatever config is discoverable
    let help_config = Config::load(None).unwrap_or_default();
    let cmd = Cli::command().after_help(generate_after_help(&help_config));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!(model = %config.llm.model, "Refiner loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Refine(args)) => cmd_refine(config, &args).await,
        Some(Command::History { command }) => cmd_history(&config, command),
        Some(Command::Stacks) => cmd_stacks(),
        Some(Command::Templates { id }) => cmd_templates(id.as_deref()),
        Some(Command::Config) => cmd_config(&config),
        None => {
            debug!("main: no command specified, starting interactive refinement");
            cmd_refine(config, &RefineArgs::default()).await
        }
    }
}

/// Background JSONL logger fed by the event bus
struct EventRecording {
    bus: Arc<EventBus>,
    handle: JoinHandle<()>,
}

impl EventRecording {
    async fn finish(self) {
        drop(self.bus);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Event logger task failed");
        }
    }
}

fn open_session(config: &Config, telemetry: Arc<dyn Telemetry>) -> Result<RefinementSession> {
    debug!("open_session: called");
    let client = create_client(&config.llm).context("Failed to create LLM client")?;
    let credentials = Arc::new(EnvCredentials::from_config(&config.llm));
    let store = Arc::new(JsonHistoryStore::new(config.storage.history_path.clone()));
    let session = RefinementSession::new(client, credentials, store, telemetry, SessionOptions::from_config(config))
        .context("Failed to open refinement session")?;
    Ok(session)
}

/// Run one interactive refinement from idea to final prompts
async fn cmd_refine(mut config: Config, args: &RefineArgs) -> Result<()> {
    debug!(?args, "cmd_refine: called");
    args.apply(&mut config);
    config.validate()?;

    let (telemetry, recording): (Arc<dyn Telemetry>, Option<EventRecording>) = if config.telemetry.enabled {
        let bus = create_event_bus();
        let handle = spawn_event_logger(bus.clone(), &config.telemetry.events_dir)?;
        let sink: Arc<dyn Telemetry> = bus.clone();
        (sink, Some(EventRecording { bus, handle }))
    } else {
        (Arc::new(NullTelemetry), None)
    };

    let mut session = open_session(&config, telemetry)?;
    let mut editor: Option<DefaultEditor> = None;
    let outcome = match seed_idea(args, &mut editor) {
        Ok(idea) => drive(&mut session, &mut editor, idea.as_deref()).await,
        Err(e) => Err(e),
    };

    drop(session);
    if let Some(recording) = recording {
        recording.finish().await;
    }
    outcome
}

fn editor(slot: &mut Option<DefaultEditor>) -> Result<&mut DefaultEditor> {
    if slot.is_none() {
        *slot = Some(DefaultEditor::new().context("Failed to open line editor")?);
    }
    slot.as_mut().ok_or_else(|| eyre::eyre!("line editor unavailable"))
}

/// Read one line; `None` when the user pressed Ctrl-C or Ctrl-D
fn read_line(slot: &mut Option<DefaultEditor>, prompt: &str) -> Result<Option<String>> {
    match editor(slot)?.readline(prompt) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The idea given on the command line, or one built from a library entry
fn seed_idea(args: &RefineArgs, slot: &mut Option<DefaultEditor>) -> Result<Option<String>> {
    let Some(id) = &args.template else {
        return Ok(args.idea.clone());
    };
    let Some(entry) = library::lookup(id) else {
        bail!("Unknown template '{}'. Run `refiner templates` to list them.", id);
    };
    debug!(id = entry.id, "seed_idea: using library entry");

    let placeholders = Placeholders::new().context("Failed to compile placeholder pattern")?;
    let mut values: HashMap<String, String> = args.values.iter().cloned().collect();
    let missing: Vec<_> = placeholders
        .find(entry.prompt)
        .into_iter()
        .filter(|p| !values.contains_key(&p.name))
        .collect();

    if !missing.is_empty() {
        println!("{} {}", "Template:".bold(), entry.title);
        println!("{}", "Fill in the blanks (Enter keeps the placeholder):".dimmed());
    }
    for placeholder in missing {
        let label = match &placeholder.hint {
            Some(hint) => format!("{} ({})> ", placeholder.name, hint),
            None => format!("{}> ", placeholder.name),
        };
        let Some(value) = read_line(slot, &label)? else {
            break;
        };
        values.insert(placeholder.name, value);
    }

    Ok(Some(placeholders.fill(entry.prompt, &values)))
}

async fn drive(session: &mut RefinementSession, slot: &mut Option<DefaultEditor>, idea: Option<&str>) -> Result<()> {
    let idea = match idea {
        Some(idea) => idea.to_string(),
        None => {
            println!("{}", "Describe what you want the AI to help with:".bold());
            match read_line(slot, "idea> ")? {
                Some(line) => line,
                None => return Ok(()),
            }
        }
    };

    println!("{}", "Thinking...".dimmed());
    let mut state = session.start(&idea).await?.clone();

    loop {
        match state {
            SessionState::Refining { questions } => {
                let round = session.context().map(|c| c.round()).unwrap_or(1);
                println!();
                println!("{}", format!("Round {}", round).cyan().bold());
                let Some(answers) = ask_questions(slot, &questions)? else {
                    println!("{}", "Refinement abandoned.".yellow());
                    return Ok(());
                };
                println!("{}", "Thinking...".dimmed());
                state = session.submit(answers).await?.clone();
            }
            SessionState::Final {
                prompts,
                confidence,
                approach,
                next_steps,
            } => {
                print_prompts(&prompts, confidence, approach.as_str(), &next_steps);
                session.acknowledge()?;
                return Ok(());
            }
            SessionState::Error { kind, message } => {
                session.acknowledge()?;
                bail!("{} ({})", message, kind);
            }
            SessionState::Idle | SessionState::Loading => {
                bail!("session settled in unexpected state '{}'", state);
            }
        }
    }
}

/// Ask every question in the batch; `None` when the user aborted
fn ask_questions(
    slot: &mut Option<DefaultEditor>,
    questions: &[RefinementQuestion],
) -> Result<Option<Vec<AnswerSubmission>>> {
    let mut answers = Vec::with_capacity(questions.len());
    for (i, question) in questions.iter().enumerate() {
        println!();
        let marker = if question.required { " *".red().to_string() } else { String::new() };
        println!(
            "{} {}{} {}",
            format!("[{}/{}]", i + 1, questions.len()).dimmed(),
            question.question.bold(),
            marker,
            format!("({})", question.kind).dimmed()
        );
        for (n, answer) in question.answers.iter().enumerate() {
            println!("  {}. {}", n + 1, answer);
        }
        if question.allow_custom {
            println!("  {}", "or type your own answer".dimmed());
        }

        loop {
            let Some(line) = read_line(slot, "> ")? else {
                return Ok(None);
            };
            match pick_answer(question, &line) {
                Ok(Some(answer)) => {
                    answers.push(AnswerSubmission::new(question.id.clone(), answer));
                    break;
                }
                Ok(None) => break,
                Err(reason) => println!("{}", reason.yellow()),
            }
        }
    }
    Ok(Some(answers))
}

fn print_prompts(prompts: &[String], confidence: u8, approach: &str, next_steps: &[String]) {
    println!();
    println!(
        "{} {}",
        "Your refined prompts".green().bold(),
        format!("(confidence {}%, {})", confidence, approach).dimmed()
    );
    for (i, prompt) in prompts.iter().enumerate() {
        println!();
        println!("{}", format!("--- Prompt {} ---", i + 1).cyan());
        println!("{}", prompt);
    }
    if !next_steps.is_empty() {
        println!();
        println!("{}", "Next steps:".bold());
        for step in next_steps {
            println!("  - {}", step);
        }
    }
}

fn cmd_history(config: &Config, command: HistoryCommand) -> Result<()> {
    debug!(?command, "cmd_history: called");
    let mut session = open_session(config, Arc::new(NullTelemetry))?;

    match command {
        HistoryCommand::List => {
            if session.history().is_empty() {
                println!("No history yet.");
                return Ok(());
            }
            for item in session.history() {
                println!(
                    "{}  {}  {}  {}",
                    item.id.yellow(),
                    item.timestamp.format("%Y-%m-%d %H:%M"),
                    item.title(60),
                    format!("({} prompts)", item.prompts.len()).dimmed()
                );
            }
        }
        HistoryCommand::Show { id } => {
            let id = resolve_history_id(session.history(), &id).map_err(|e| eyre::eyre!(e))?;
            let Some(item) = session.view_history(&id) else {
                bail!("History entry '{}' disappeared", id);
            };
            println!("{} {}", "Idea:".bold(), item.idea);
            println!("{} {}", "Created:".bold(), item.timestamp.to_rfc3339());
            if !item.turns.is_empty() {
                println!();
                println!("{}", "Conversation:".bold());
                for turn in &item.turns {
                    println!("  [Round {}] Q: {}", turn.round(), turn.question());
                    println!("            A: {}", turn.answer());
                }
            }
            for (i, prompt) in item.prompts.iter().enumerate() {
                println!();
                println!("{}", format!("--- Prompt {} ---", i + 1).cyan());
                println!("{}", prompt);
            }
        }
        HistoryCommand::Delete { id } => {
            let id = resolve_history_id(session.history(), &id).map_err(|e| eyre::eyre!(e))?;
            if session.delete_history(&id)? {
                println!("Deleted {}", id);
            }
        }
        HistoryCommand::Clear => {
            let count = session.history().len();
            session.clear_history()?;
            println!("Cleared {} entries", count);
        }
    }
    Ok(())
}

fn cmd_stacks() -> Result<()> {
    debug!("cmd_stacks: called");
    for knowledge in KNOWN_STACKS {
        println!("{}", knowledge.name.bold());
        for practice in knowledge.best_practices {
            println!("  - {}", practice);
        }
        println!();
    }
    println!("{}", "Combined contexts:".bold());
    for knowledge in COMBINED_STACKS {
        println!("  {} {}", knowledge.name, format!("({})", knowledge.stacks.join(" + ")).dimmed());
    }
    Ok(())
}

fn cmd_templates(id: Option<&str>) -> Result<()> {
    debug!(?id, "cmd_templates: called");
    if let Some(id) = id {
        let Some(entry) = library::lookup(id) else {
            bail!("Unknown template '{}'. Run `refiner templates` to list them.", id);
        };
        println!("{} {}", entry.title.bold(), format!("({})", entry.kind.as_str()).dimmed());
        if !entry.description.is_empty() {
            println!("{}", entry.description);
        }
        println!();
        println!("{}", entry.prompt);
        return Ok(());
    }

    println!("{}", "Quick start templates:".bold());
    for entry in TEMPLATES {
        print_entry(entry);
    }
    println!();
    println!("{}", "Detailed examples:".bold());
    for entry in EXAMPLES {
        print_entry(entry);
    }
    println!();
    println!("{}", "Start one with: refiner refine --template <ID>".dimmed());
    Ok(())
}

fn print_entry(entry: &LibraryEntry) {
    match entry.kind {
        EntryKind::Template => println!("  {} {:<18} {}", entry.icon, entry.id.yellow(), entry.title),
        EntryKind::Example => {
            println!("  {:<20} {}", entry.id.yellow(), entry.title);
            println!("  {:<20} {}", "", entry.description.dimmed());
        }
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}
