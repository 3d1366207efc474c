use clap::Parser;
use color_eyre::Result;
use taskmaster::{
    Config, Database, Profile,
    cli::{Cli, Commands},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps a separate config and database
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db = Database::new(config.get_database_path())?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            taskmaster::server::run(&config.bind_address(), db, config.debug_routes)?;
        }
        Commands::AddTask {
            title,
            project,
            due,
            priority,
            description,
        } => {
            taskmaster::cli::handle_add_task(title, project, due, priority, description, &db)?;
        }
        Commands::MoveTask { id, status } => {
            taskmaster::cli::handle_move_task(id, &status, &db)?;
        }
        Commands::Board {
            project_id,
            priority,
        } => {
            taskmaster::cli::handle_board(project_id, priority.as_deref(), &db)?;
        }
        Commands::Summary => {
            taskmaster::cli::handle_summary(&db)?;
        }
    }

    Ok(())
}
