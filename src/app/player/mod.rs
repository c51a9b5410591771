mod args;
mod environment;
mod error;
mod process;
mod progress;
mod strategy;

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::PlayerConfig;

#[cfg(test)]
pub(crate) use args::*;
pub(crate) use environment::{
    AmIntentLauncher, Environment, ExecutableLocator, IntentLauncher, SearchPath,
};
#[cfg(test)]
pub(crate) use environment::{Intent, sanitize_env};
pub(crate) use error::PlaybackError;
pub(crate) use process::{PlayerHandle, run_blocking, spawn_background};
pub(crate) use progress::parse_progress;
pub(crate) use strategy::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaybackRequest {
    url: String,
    episode: String,
    title: Option<String>,
    display_title: Option<String>,
    start_time: Option<String>,
    subtitles: Vec<String>,
    headers: Vec<(String, String)>,
    syncplay: bool,
}

impl PlaybackRequest {
    pub(crate) fn new(
        url: impl Into<String>,
        episode: impl Into<String>,
    ) -> Result<Self, PlaybackError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(PlaybackError::InvalidRequest(
                "url must not be empty".to_string(),
            ));
        }
        Ok(Self {
            url,
            episode: episode.into(),
            title: None,
            display_title: None,
            start_time: None,
            subtitles: Vec::new(),
            headers: Vec::new(),
            syncplay: false,
        })
    }

    pub(crate) fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub(crate) fn with_display_title(mut self, display_title: impl Into<String>) -> Self {
        self.display_title = Some(display_title.into());
        self
    }

    pub(crate) fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub(crate) fn with_subtitle(mut self, path: impl Into<String>) -> Self {
        self.subtitles.push(path.into());
        self
    }

    /// Sets a header; an existing key keeps its position and takes the new value.
    pub(crate) fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    pub(crate) fn with_syncplay(mut self, syncplay: bool) -> Self {
        self.syncplay = syncplay;
        self
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn episode(&self) -> &str {
        &self.episode
    }

    pub(crate) fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub(crate) fn display_title(&self) -> Option<&str> {
        self.display_title.as_deref()
    }

    pub(crate) fn start_time(&self) -> Option<&str> {
        self.start_time.as_deref()
    }

    pub(crate) fn subtitles(&self) -> &[String] {
        &self.subtitles
    }

    pub(crate) fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub(crate) fn syncplay(&self) -> bool {
        self.syncplay
    }

    fn label(&self) -> &str {
        self.display_title()
            .or(self.title())
            .unwrap_or(self.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PlaybackResult {
    pub(crate) episode: String,
    pub(crate) stop_time: Option<String>,
    pub(crate) total_time: Option<String>,
}

impl PlaybackResult {
    fn episode_only(request: &PlaybackRequest) -> Self {
        Self {
            episode: request.episode().to_string(),
            stop_time: None,
            total_time: None,
        }
    }
}

pub(crate) struct MpvPlayer<'a, L = SearchPath, I = AmIntentLauncher> {
    config: &'a PlayerConfig,
    environment: Environment,
    locator: L,
    intents: I,
}

impl<'a> MpvPlayer<'a> {
    pub(crate) fn new(config: &'a PlayerConfig, environment: Environment) -> Self {
        Self::with_collaborators(config, environment, SearchPath, AmIntentLauncher)
    }
}

impl<'a, L, I> MpvPlayer<'a, L, I>
where
    L: ExecutableLocator,
    I: IntentLauncher,
{
    pub(crate) fn with_collaborators(
        config: &'a PlayerConfig,
        environment: Environment,
        locator: L,
        intents: I,
    ) -> Self {
        Self {
            config,
            environment,
            locator,
            intents,
        }
    }

    pub(crate) fn plan(&self, request: &PlaybackRequest) -> Result<LaunchPlan, PlaybackError> {
        plan_playback(
            request,
            self.environment,
            self.config,
            || self.config_dir(),
            &self.locator,
        )
    }

    fn config_dir(&self) -> Result<PathBuf, PlaybackError> {
        self.config
            .mpv_config_dir()
            .map_err(|err| PlaybackError::ConfigDir(format!("{err:#}")))
    }

    /// Plays `request` to completion on the calling thread.
    pub(crate) fn play(&self, request: &PlaybackRequest) -> Result<PlaybackResult, PlaybackError> {
        let plan = self.plan(request)?;
        info!(
            title = request.label(),
            strategy = ?plan.strategy(),
            "starting playback"
        );

        match plan {
            LaunchPlan::Mobile(intent) => {
                self.intents.launch(&intent)?;
                Ok(PlaybackResult::episode_only(request))
            }
            LaunchPlan::Torrent(command) | LaunchPlan::Sync(command) => {
                run_blocking(&command, false)?;
                Ok(PlaybackResult::episode_only(request))
            }
            LaunchPlan::Direct(command) => {
                let outcome = run_blocking(&command, true)?;
                debug!(status = %outcome.status, "player exited");
                let progress = outcome.stdout.as_deref().and_then(parse_progress);
                if progress.is_none() {
                    debug!("no progress marker in player output");
                }
                let (stop_time, total_time) = match progress {
                    Some(progress) => (Some(progress.elapsed), Some(progress.total)),
                    None => (None, None),
                };
                Ok(PlaybackResult {
                    episode: request.episode().to_string(),
                    stop_time,
                    total_time,
                })
            }
        }
    }

    /// Starts a resident player listening on `socket_path` and returns at once.
    pub(crate) fn play_with_ipc(
        &self,
        request: &PlaybackRequest,
        socket_path: &str,
    ) -> Result<PlayerHandle, PlaybackError> {
        let command = plan_ipc_playback(
            request,
            self.config,
            &self.config_dir()?,
            socket_path,
            &self.locator,
        )?;
        info!(
            title = request.label(),
            strategy = ?PlaybackStrategy::IpcPlay,
            socket = socket_path,
            "starting playback"
        );
        spawn_background(&command, socket_path)
    }
}
