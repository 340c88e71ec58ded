use btc_price_feed::cli::{Cli, Commands};
use btc_price_feed::config::{Config, ConfigError};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; a missing file means defaults
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(ConfigError::Read { path, source }) if source.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("Warning: config file {:?} not found, using defaults", path);
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    config.apply(cli.overrides.into());
    let config = config.validate()?;

    // Initialize telemetry
    btc_price_feed::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting feed service");
            args.execute(&config).await?;
        }
        Commands::Once(args) => {
            tracing::info!("Running single publish cycle");
            args.execute(&config).await?;
        }
        Commands::Serve(args) => {
            tracing::info!("Starting static server");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("# Effective configuration");
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
