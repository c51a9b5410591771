use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum PlaybackError {
    #[error("invalid playback request: {0}")]
    InvalidRequest(String),
    #[error("{feature} playback is not supported on this device")]
    UnsupportedEnvironment { feature: &'static str },
    #[error("{name} executable not found in PATH")]
    ExecutableNotFound { name: String },
    #[error("{tool} is required for this playback mode, please install {hint}")]
    DependencyMissing {
        tool: &'static str,
        hint: &'static str,
    },
    #[error("unable to resolve the mpv config directory: {0}")]
    ConfigDir(String),
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}
