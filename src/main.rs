use clap::Parser;
use reforge::cli::{Cli, Commands};
use reforge::commands;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Analyze {
            path,
            format,
            min_severity,
        } => commands::analyze::run(&path, format.into(), min_severity.map(Into::into)),
        Commands::Preview { path, unit, format } => {
            commands::preview::run(&path, unit.as_deref(), format.into())
        }
        Commands::Apply {
            path,
            unit,
            no_backup,
            format,
        } => commands::apply::run(&path, unit.as_deref(), no_backup, format.into()),
        Commands::Chain {
            path,
            unit,
            goal,
            no_backup,
            format,
        } => commands::chain::run(&path, &unit, goal.chain(), no_backup, format.into()),
        Commands::Rollback { backup_id, path } => commands::rollback::run(&path, &backup_id),
        Commands::Backups { path, format } => commands::backups::run(&path, format.into()),
    }
}
