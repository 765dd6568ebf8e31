//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::{Config, data_dir};
use crate::domain::{Complexity, OutputFormat, OutputStyle, PromptHistoryItem, RefinementQuestion};

/// Refiner - conversational prompt refinement
#[derive(Parser)]
#[command(
    name = "refiner",
    about = "Turn a rough idea into ready-to-use AI prompts through a short Q&A",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refine an idea into final prompts (interactive)
    Refine(RefineArgs),

    /// Browse and manage completed refinements
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// List known technologies and their best practices
    Stacks,

    /// List starter templates and examples, or show one in full
    Templates {
        /// Template or example ID
        id: Option<String>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Options for `refiner refine`
#[derive(Debug, Default, clap::Args)]
pub struct RefineArgs {
    /// The idea to refine (read interactively when omitted)
    pub idea: Option<String>,

    /// Start from a library template or example instead of an idea
    #[arg(short, long, value_name = "ID", conflicts_with = "idea")]
    pub template: Option<String>,

    /// Fill a template placeholder (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment, requires = "template")]
    pub values: Vec<(String, String)>,

    /// Technology in use (repeatable)
    #[arg(short, long = "stack", value_name = "NAME")]
    pub stacks: Vec<String>,

    /// basic, detailed, comprehensive
    #[arg(long)]
    pub complexity: Option<Complexity>,

    /// professional, casual, technical, educational
    #[arg(long)]
    pub style: Option<OutputStyle>,

    /// markdown, json, plain-text
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Rounds after which the model is told to finish
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,
}

impl RefineArgs {
    /// Layer command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut Config) {
        debug!(?self, "RefineArgs::apply: called");
        if !self.stacks.is_empty() {
            config.session.stacks = self.stacks.clone();
        }
        if let Some(complexity) = self.complexity {
            config.session.complexity = complexity;
        }
        if let Some(style) = self.style {
            config.session.style = style;
        }
        if let Some(format) = self.format {
            config.session.format = format;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.session.max_rounds = max_rounds;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}

/// Parse `NAME=VALUE`; the name is upper-cased to match placeholder names
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing placeholder name in '{}'", raw));
    }
    Ok((name.to_ascii_uppercase(), value.to_string()))
}

/// History management subcommands
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List completed refinements, newest first
    List,

    /// Show one refinement with its conversation and prompts
    Show {
        /// History entry ID (or unique prefix)
        id: String,
    },

    /// Delete one refinement
    Delete {
        /// History entry ID (or unique prefix)
        id: String,
    },

    /// Delete every refinement
    Clear,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = data_dir().join("logs").join("refiner.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with credential and path information
pub fn generate_after_help(config: &Config) -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Credentials:\n");
    let key_set = std::env::var(&config.llm.api_key_env)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    let icon = if key_set { "\u{2705}" } else { "\u{274C}" };
    help.push_str(&format!("  {} {}\n", icon, config.llm.api_key_env));
    if let Some(file) = &config.llm.api_key_file {
        let icon = if file.exists() { "\u{2705}" } else { "\u{274C}" };
        help.push_str(&format!("  {} {}\n", icon, file.display()));
    }

    help.push('\n');
    help.push_str(&format!("History is stored in: {}\n", config.storage.history_path.display()));
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));

    debug!("generate_after_help: returning help text");
    help
}

/// Interpret one line typed in answer to a question.
///
/// A number selects a suggested answer; other text is a custom answer when the
/// question allows it. `Ok(None)` skips an optional question.
pub fn pick_answer(question: &RefinementQuestion, input: &str) -> Result<Option<String>, &'static str> {
    debug!(question_id = %question.id, input_len = input.len(), "pick_answer: called");
    let input = input.trim();
    if input.is_empty() {
        return if question.required {
            Err("This question requires an answer")
        } else {
            Ok(None)
        };
    }

    if let Ok(n) = input.parse::<usize>()
        && (1..=question.answers.len()).contains(&n)
    {
        return Ok(Some(question.answers[n - 1].clone()));
    }

    if question.allow_custom {
        Ok(Some(input.to_string()))
    } else {
        Err("Pick one of the numbered answers")
    }
}

/// Find a history entry by full ID or unique prefix
pub fn resolve_history_id(items: &[PromptHistoryItem], query: &str) -> Result<String, String> {
    debug!(%query, count = items.len(), "resolve_history_id: called");
    if let Some(item) = items.iter().find(|item| item.id == query) {
        return Ok(item.id.clone());
    }

    let matches: Vec<&PromptHistoryItem> = items.iter().filter(|item| item.id.starts_with(query)).collect();
    match matches.as_slice() {
        [] => Err(format!("No history entry matches '{}'", query)),
        [item] => Ok(item.id.clone()),
        many => Err(format!("'{}' is ambiguous ({} entries match)", query, many.len())),
    }
}
