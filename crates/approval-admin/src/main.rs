//! Admin command line tool for project approval chains
//!
//! Every command prints a JSON document on stdout; logs go to stderr.

mod cli;
mod commands;

use approval_core::ApprovalConfig;

fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let matches = cli::cli().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => {
            let config = ApprovalConfig::from_file(path)?;
            log::info!("Loaded configuration from {}", path);
            config
        }
        None => ApprovalConfig::default(),
    };

    if let Some(database) = matches.get_one::<String>("database") {
        config.database.path = database.into();
    }
    config.validate()?;

    log::debug!("Using database {}", config.database.path.display());

    let app = commands::AdminApp::open(&config)?;
    let output = app.run(&matches)?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
