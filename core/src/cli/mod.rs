pub mod commands;

use crate::audio::queue::OverflowPolicy;
use crate::controls::{MediaAction, SystemAction};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "remote")]
#[command(author, version, about = "Control a paired computer from the command line", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pair with a companion using the link it displays
    Connect {
        /// Connect link, e.g. http://host/connect?token=...&serviceUrl=...
        link: String,

        /// Name this device is registered under
        #[arg(short, long)]
        device_name: Option<String>,
    },

    /// Show pairing state and token expiry
    Status,

    /// Send a media key
    Media {
        action: MediaAction,
    },

    /// Run a system control on the paired computer
    System {
        action: SystemAction,
    },

    /// Query the paired computer's battery
    Battery,

    /// Record audio until EOF or Ctrl-C, then upload it as WAV
    Record {
        /// Encoded recording to read (defaults to stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Container hint such as wav, flac, mp3, or ogg (Opus tracks are not supported)
        #[arg(long)]
        container: Option<String>,
    },

    /// Stream raw f32le mono 44.1 kHz audio until EOF or Ctrl-C
    Stream {
        /// Raw sample source (defaults to stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Frames allowed to wait for the network
        #[arg(long)]
        queue: Option<usize>,

        /// What to drop when the queue is full
        #[arg(long)]
        overflow: Option<OverflowPolicy>,
    },

    /// Forget the stored token and service URL
    Logout,

    /// Interactive remote: one command per line
    Shell,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        None | Some(Commands::Status) => commands::status::run(cli.format),
        Some(Commands::Connect { link, device_name }) => {
            commands::connect::run(&link, device_name, cli.format)
        }
        Some(Commands::Media { action }) => commands::media::run(action, cli.format),
        Some(Commands::System { action }) => commands::system::run(action, cli.format),
        Some(Commands::Battery) => commands::system::run(SystemAction::Battery, cli.format),
        Some(Commands::Record { input, container }) => {
            commands::record::run(input.as_deref(), container.as_deref(), cli.format)
        }
        Some(Commands::Stream {
            input,
            queue,
            overflow,
        }) => commands::stream::run(input.as_deref(), queue, overflow, cli.format),
        Some(Commands::Logout) => commands::logout::run(cli.format),
        Some(Commands::Shell) => commands::shell::run(),
    }
}
