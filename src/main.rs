use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_publish::{util, Cli, Command, ConfigFile, ConfigOverrides};

fn init_tracing(debug: bool) {
    let default = if debug { "vault_publish=debug" } else { "vault_publish=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Command::Build { vault, publish, dry_run } => ConfigOverrides {
            vault: vault.clone(),
            publish: publish.clone(),
            dry_run: *dry_run,
            debug: cli.debug,
        },
        _ => ConfigOverrides {
            debug: cli.debug,
            ..Default::default()
        },
    };

    let config = match vault_publish::load_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e.report());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.debug);
    match ConfigFile::locate(cli.config.as_deref()) {
        Some(path) => info!("[cfg] loaded {}", util::display_path(&path)),
        None => info!("[cfg] no config file found; using built-in defaults"),
    }

    let result = match cli.command {
        Command::Build { .. } => cmd::build::run(config),
        Command::Resolve { note, reference } => cmd::resolve::run(config, &note, &reference),
        Command::Refs { note } => cmd::refs::run(config, &note),
        Command::Css { file } => cmd::css::run(&config, &file),
        Command::Js { file } => cmd::js::run(&config, &file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e.report());
            ExitCode::FAILURE
        }
    }
}

mod cmd {
    pub mod build;
    pub mod css;
    pub mod js;
    pub mod refs;
    pub mod resolve;
}
