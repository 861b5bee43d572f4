//! nxm CLI - session state and switch orchestration for NixOS / home-manager.

use clap::Parser;
use nxm::cli::{Cli, Commands, ModuleCommands, SwitchScope};
use nxm::commands::{self, Context, Output};
use nxm::config::ConfigOverrides;
use nxm::logging;
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init();

    let human = cli.human_readable;
    let overrides = ConfigOverrides {
        config_dir: cli.config_dir,
    };

    let cmd_name = cli.command.name();
    tracing::debug!(command = cmd_name, "starting");

    if let Err(e) = run_command(cli.command, &overrides, human) {
        tracing::debug!(command = cmd_name, error = %e, "command failed");
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn run_command(command: Commands, overrides: &ConfigOverrides, human: bool) -> nxm::Result<()> {
    let mut ctx = Context::open(overrides)?;

    match command {
        Commands::Read { path } => {
            let result = commands::read(&ctx, path.as_deref())?;
            output(&result, human);
        }

        Commands::Switch { scope, dry_run } => {
            let all = scope == Some(SwitchScope::All);
            let result = commands::switch(&ctx, all, dry_run)?;
            output(&result, human);
        }

        Commands::Desktop {
            environment,
            dry_run,
        } => {
            let result = commands::desktop(&mut ctx, &environment, dry_run)?;
            output(&result, human);
        }

        Commands::Module { command } => match command {
            ModuleCommands::List => {
                let result = commands::module_list(&ctx)?;
                output(&result, human);
            }
            ModuleCommands::Enable { names } => {
                let result = commands::module_enable(&mut ctx, &names)?;
                output(&result, human);
            }
            ModuleCommands::Disable { names } => {
                let result = commands::module_disable(&mut ctx, &names)?;
                output(&result, human);
            }
        },

        Commands::Update { dry_run } => {
            let result = commands::update(&ctx, dry_run)?;
            output(&result, human);
        }
    }

    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
