use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use ollama_chat::cli::{
    handle_version_command, init_logging, list_models, output_listener, parse_args, run_prompt,
    CliCommand, USAGE,
};
use ollama_chat::config::ClientConfig;
use ollama_chat::ollama::OllamaClient;
use ollama_chat::settings::Settings;
use ollama_chat::stream::{AbortController, AbortReason};

fn main() -> Result<()> {
    let command = match parse_args(std::env::args()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    // Handle --version and --help before any initialization
    match command {
        CliCommand::Version => handle_version_command(),
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        _ => {}
    }

    color_eyre::install()?;

    let config = ClientConfig::from_env();
    init_logging(&config);

    let settings = Settings::load_or_default(Settings::default_path())
        .wrap_err("Failed to load settings")?;
    let client = OllamaClient::new(config);

    let runtime = tokio::runtime::Runtime::new()?;

    match command {
        CliCommand::ListModels => {
            let mut stdout = std::io::stdout();
            runtime.block_on(list_models(&client, &mut stdout))
        }
        CliCommand::Prompt(options) => {
            let abort = AbortController::new();
            let on_interrupt = abort.clone();
            ctrlc::set_handler(move || on_interrupt.abort(AbortReason::User))
                .wrap_err("Failed to install Ctrl-C handler")?;

            let listener = output_listener(std::io::stdout(), abort.clone());

            let entry = runtime.block_on(run_prompt(&client, &settings, &options, &abort, listener));
            println!();
            entry.map(|entry| tracing::debug!(id = %entry.id, "generation complete"))
        }
        CliCommand::Version | CliCommand::Help => Ok(()),
    }
}
