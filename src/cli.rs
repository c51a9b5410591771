use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "playdispatch",
    version,
    about = "Launch mpv or a companion player and report where playback stopped"
)]
pub struct Cli {
    /// Override environment detection.
    #[arg(long, value_enum, default_value_t = EnvironmentArg::Auto, global = true)]
    pub environment: EnvironmentArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentArg {
    Auto,
    Mobile,
    Desktop,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a URL and wait for the player to exit.
    Play {
        #[command(flatten)]
        request: RequestArgs,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Start mpv with an IPC server at the given path.
    Ipc {
        #[command(flatten)]
        request: RequestArgs,
        #[arg(long)]
        socket: String,
        /// Return as soon as the player is started.
        #[arg(long, conflicts_with = "max_duration")]
        detach: bool,
        /// Terminate the player after this many seconds.
        #[arg(long)]
        max_duration: Option<u64>,
    },
    /// Extract the last progress marker from captured mpv output.
    Progress {
        /// Read from a file instead of stdin.
        file: Option<PathBuf>,
    },
    /// Show the effective player configuration.
    Config,
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    pub url: String,
    #[arg(long, default_value = "")]
    pub episode: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub display_title: Option<String>,
    /// Start offset passed to mpv's --start.
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long = "sub")]
    pub subtitles: Vec<String>,
    /// HTTP header as KEY:VALUE, repeatable.
    #[arg(long = "header")]
    pub headers: Vec<String>,
    #[arg(long)]
    pub syncplay: bool,
}
