//! Command-line argument parsing.

use std::path::PathBuf;
use thiserror::Error;

use crate::stream::{StreamFormat, UnknownFormat};

pub const USAGE: &str = "\
usage: ollama-chat [OPTIONS] <prompt...>

options:
  --model <name>       model to use (default: settings defaultModel)
  --format <fmt>       'ollama' (line JSON, default) or 'openai' (event stream)
  --chat               use /api/chat instead of /api/generate
  --image <path>       attach an image (vision models)
  --models             list installed and running models
  -V, --version        print version
  -h, --help           print this help";

/// Options for a single streamed prompt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PromptOptions {
    pub prompt: String,
    pub model: Option<String>,
    pub format: StreamFormat,
    pub chat: bool,
    pub image: Option<PathBuf>,
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Version,
    Help,
    ListModels,
    Prompt(PromptOptions),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgsError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error(transparent)]
    Format(#[from] UnknownFormat),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("no prompt given")]
    MissingPrompt,
}

/// Parse command-line arguments (program name first).
///
/// `--version`, `--help` and `--models` win over everything else. All
/// remaining non-option words are joined with spaces into the prompt; `--`
/// ends option parsing.
pub fn parse_args<I>(args: I) -> Result<CliCommand, ArgsError>
where
    I: Iterator<Item = String>,
{
    let mut options = PromptOptions::default();
    let mut words: Vec<String> = Vec::new();
    let mut list_models = false;
    let mut args = args.skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(CliCommand::Version),
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--models" => list_models = true,
            "--chat" => options.chat = true,
            "--model" | "-m" => options.model = Some(value(&arg, args.next())?),
            "--format" | "-f" => options.format = value(&arg, args.next())?.parse()?,
            "--image" => options.image = Some(PathBuf::from(value(&arg, args.next())?)),
            "--" => {
                words.extend(args.by_ref());
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(ArgsError::UnknownOption(flag.to_string()));
            }
            _ => words.push(arg),
        }
    }

    if list_models {
        return Ok(CliCommand::ListModels);
    }

    options.prompt = words.join(" ");
    if options.prompt.trim().is_empty() {
        return Err(ArgsError::MissingPrompt);
    }
    Ok(CliCommand::Prompt(options))
}

fn value(flag: &str, next: Option<String>) -> Result<String, ArgsError> {
    next.filter(|v| !v.is_empty())
        .ok_or_else(|| ArgsError::MissingValue(flag.to_string()))
}
