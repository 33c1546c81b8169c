//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`render`], or [`validate`]. Each handler
//! lives in its own submodule.

pub mod render;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::OperatorError;

pub async fn dispatch(cli: Cli) -> Result<(), OperatorError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Render(ref args)) => render::execute(args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  studio-operator v{version} \u{2014} operator for FINOS Legend Studio\n\n  \
         No command provided. To get started:\n\n    \
         studio-operator validate options.yaml     Check an options file\n    \
         studio-operator render -s state.json      Preview the Studio config documents\n    \
         studio-operator run < events.jsonl        Dispatch host events\n    \
         studio-operator --help                    See all commands and options\n"
    );
}
