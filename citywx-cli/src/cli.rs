use std::sync::Arc;

use anyhow::{Context, Result};
use citywx_core::{
    Config, DisplayBinder, EngineSettings, FilePreferences, IconCache, IconLoader,
    MemoryPreferences, PreferenceStore, ReqwestTransport, WeatherEngine,
};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::render::TerminalRenderer;

type Session = DisplayBinder<Box<dyn PreferenceStore>, TerminalRenderer>;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citywx", version, about = "Current weather for a city")]
pub struct Cli {
    /// Do not read or write the last searched city.
    #[arg(long, global = true)]
    pub no_persist: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure {
        /// Key to store; prompts when omitted.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Show weather for a city.
    Show {
        /// City name, e.g. "New York" or "Paris,FR".
        #[arg(required = true, num_args = 1..)]
        city: Vec<String>,
    },

    /// Show weather for the place nearest to a location fix.
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Show weather for the last searched city.
    Last,

    /// Prompt for cities until interrupted.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { api_key } => configure(api_key),
            Command::Show { city } => {
                let mut session = open_session(self.no_persist)?;
                let city = city.join(" ");
                let handle = session.search(&city);
                finish(&mut session, handle).await
            }
            Command::Locate { lat, lon } => {
                let mut session = open_session(self.no_persist)?;
                let handle = session.location_fix(lat, lon);
                finish(&mut session, Some(handle)).await
            }
            Command::Last => {
                let mut session = open_session(self.no_persist)?;
                match session.activate() {
                    Some(handle) => finish(&mut session, Some(handle)).await,
                    None => {
                        println!("No city searched yet.");
                        Ok(())
                    }
                }
            }
            Command::Interactive => {
                let mut session = open_session(self.no_persist)?;
                interactive(&mut session).await
            }
        }
    }
}

fn configure(api_key: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let api_key = match api_key {
        Some(key) => key,
        None => Password::new("OpenWeather API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };

    config.set_api_key(api_key);
    if !config.is_configured() {
        anyhow::bail!("API key must not be empty");
    }

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn open_session(no_persist: bool) -> Result<Session> {
    let config = Config::load()?.with_env_overrides();
    let settings = EngineSettings::from_config(&config)?;

    let transport = Arc::new(
        ReqwestTransport::new(config.timeout()).context("Failed to build HTTP client")?,
    );
    let engine = WeatherEngine::new(settings, transport.clone());
    let icons = IconLoader::new(config.icon_base_url.clone(), transport, IconCache::new());

    let prefs: Box<dyn PreferenceStore> = if no_persist {
        Box::new(MemoryPreferences::default())
    } else {
        Box::new(FilePreferences::open_default()?)
    };

    debug!(base_url = %config.base_url, no_persist, "session opened");
    Ok(DisplayBinder::new(engine, icons, prefs, TerminalRenderer::new()))
}

async fn finish(session: &mut Session, handle: Option<JoinHandle<()>>) -> Result<()> {
    if let Some(handle) = handle {
        handle.await.context("Weather request task failed")?;
    }
    session.settle().await;
    Ok(())
}

async fn interactive(session: &mut Session) -> Result<()> {
    if let Some(handle) = session.activate() {
        handle.await.context("Weather request task failed")?;
        session.settle().await;
    }

    loop {
        let input = match Text::new("City:")
            .with_help_message("empty input shows an error; Esc or Ctrl-C to quit")
            .prompt()
        {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read city"),
        };

        if let Some(handle) = session.search(&input) {
            handle.await.context("Weather request task failed")?;
        }
        session.settle().await;
    }

    Ok(())
}
