use anyhow::Result;
use clap::Parser;
use voxloop::app::run_conversation;
use voxloop::audio::capture::list_devices;
use voxloop::cli::{Cli, Commands, ConfigAction};
use voxloop::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            let config = load_config(&cli)?;
            run_conversation(config, &cli).await?;
        }
        Some(Commands::Devices) => {
            let devices = list_devices()?;
            if devices.is_empty() {
                eprintln!("No audio input devices found.");
            } else {
                for device in devices {
                    println!("{device}");
                }
            }
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => {
                let path = cli
                    .config
                    .clone()
                    .unwrap_or_else(Config::default_path);
                if path.exists() {
                    anyhow::bail!("config already exists at {}", path.display());
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, toml::to_string_pretty(&Config::default())?)?;
                eprintln!("Wrote {}", path.display());
            }
            ConfigAction::Show => {
                let config = load_config(&cli)?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    Ok(Config::load_or_default(&path)?.with_env_overrides())
}
