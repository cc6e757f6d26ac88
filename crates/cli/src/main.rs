//! FarmEye CLI
//!
//! A command-line tool for reading alerts, inspecting cameras and flipping
//! the detection and sound toggles of a running FarmEye agent.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{alerts, cameras, status};

/// FarmEye CLI
#[derive(Parser)]
#[command(name = "farmeye")]
#[command(author, version, about = "CLI for the FarmEye farm monitoring agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via FARMEYE_API_URL env var)
    #[arg(long, env = "FARMEYE_API_URL")]
    pub api_url: Option<String>,

    /// Output format [default: table]
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List recent alerts
    Alerts {
        #[command(subcommand)]
        action: Option<AlertsCommands>,

        /// Filter by category (intruder, feed, animal)
        #[arg(long, short)]
        category: Option<String>,

        /// Maximum number of alerts to show
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Camera management
    #[command(subcommand)]
    Cameras(CamerasCommands),

    /// Show the system status panel
    Status,

    /// Turn object detection on or off for all cameras
    Detection {
        state: Switch,
    },

    /// Turn the audible alert cue on or off
    Sound {
        state: Switch,
    },
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// Clear the alert log
    Clear,
}

#[derive(Subcommand)]
pub enum CamerasCommands {
    /// List known cameras
    List,

    /// Activate or deactivate a camera
    Toggle {
        /// Camera ID
        id: String,
    },

    /// Show the latest detections of a camera
    Snapshot {
        /// Camera ID
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    fn enabled(self) -> bool {
        self == Switch::On
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.format(cli.format);

    // Initialize client
    let client = client::ApiClient::new(&config.api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Alerts {
            action: Some(AlertsCommands::Clear),
            ..
        } => {
            alerts::clear_alerts(&client).await?;
        }
        Commands::Alerts {
            action: None,
            category,
            limit,
        } => {
            alerts::list_alerts(&client, category, limit, format).await?;
        }
        Commands::Cameras(cameras_cmd) => match cameras_cmd {
            CamerasCommands::List => {
                cameras::list_cameras(&client, format).await?;
            }
            CamerasCommands::Toggle { id } => {
                cameras::toggle_camera(&client, &id, format).await?;
            }
            CamerasCommands::Snapshot { id } => {
                cameras::show_snapshot(&client, &id, format).await?;
            }
        },
        Commands::Status => {
            status::show_status(&client, format).await?;
        }
        Commands::Detection { state } => {
            let update = client::SettingsUpdate {
                detection_enabled: Some(state.enabled()),
                sound_enabled: None,
            };
            status::update_settings(&client, update, format).await?;
        }
        Commands::Sound { state } => {
            let update = client::SettingsUpdate {
                detection_enabled: None,
                sound_enabled: Some(state.enabled()),
            };
            status::update_settings(&client, update, format).await?;
        }
    }

    Ok(())
}
