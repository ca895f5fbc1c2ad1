//! Command-line interface.
//!
//! - Argument parsing ([`parse_args`])
//! - Version display
//! - Logging setup
//! - Prompt streaming and model listing ([`run_prompt`], [`list_models`])

pub mod args;
pub mod logging;
pub mod run;
pub mod version;

pub use args::{parse_args, ArgsError, CliCommand, PromptOptions, USAGE};
pub use logging::init_logging;
pub use run::{encode_image, list_models, output_listener, resolve_model, run_prompt};
pub use version::{handle_version_command, version_string, VERSION};
