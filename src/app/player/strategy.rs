use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::args::{
    INTENT_ACTION_VIEW, direct_mpv_args, ipc_mpv_args, prefix_args, syncplay_args,
    webtorrent_args,
};
use super::environment::{Environment, ExecutableLocator, Intent};
use super::process::LaunchCommand;
use super::{PlaybackError, PlaybackRequest};
use crate::config::PlayerConfig;

pub(crate) const MPV_BIN: &str = "mpv";
pub(crate) const WEBTORRENT_BIN: &str = "webtorrent";
pub(crate) const SYNCPLAY_BIN: &str = "syncplay";

pub(crate) const YOUTUBE_COMPONENT: &str = "com.google.android.youtube/.UrlActivity";
pub(crate) const MPV_ANDROID_COMPONENT: &str = "is.xyz.mpv/.MPVActivity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaybackStrategy {
    DirectPlay,
    IpcPlay,
    TorrentDelegate,
    SyncDelegate,
    MobileIntent,
}

/// Fully resolved launch, computed before anything is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LaunchPlan {
    Direct(LaunchCommand),
    Torrent(LaunchCommand),
    Sync(LaunchCommand),
    Mobile(Intent),
}

fn torrent_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:magnet:\?xt=urn:btih:(?:[a-z0-9]{32}|[a-z0-9]{40}).*|https?://.*\.torrent)$",
        )
        .expect("valid torrent regex")
    })
}

fn youtube_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com|youtu\.be|youtube-nocookie\.com)/.+",
        )
        .expect("valid youtube regex")
    })
}

pub(crate) fn is_torrent_url(url: &str) -> bool {
    torrent_regex().is_match(url)
}

pub(crate) fn is_youtube_url(url: &str) -> bool {
    youtube_regex().is_match(url)
}

/// Picks the playback path for a blocking `play` call. Guards are evaluated
/// in order and the first match wins.
pub(crate) fn select_strategy(
    request: &PlaybackRequest,
    environment: Environment,
) -> Result<PlaybackStrategy, PlaybackError> {
    let torrent = is_torrent_url(request.url());
    if environment.is_mobile() {
        if torrent {
            return Err(PlaybackError::UnsupportedEnvironment { feature: "torrent" });
        }
        if request.syncplay() {
            return Err(PlaybackError::UnsupportedEnvironment {
                feature: "syncplay",
            });
        }
        return Ok(PlaybackStrategy::MobileIntent);
    }

    if torrent {
        Ok(PlaybackStrategy::TorrentDelegate)
    } else if request.syncplay() {
        Ok(PlaybackStrategy::SyncDelegate)
    } else {
        Ok(PlaybackStrategy::DirectPlay)
    }
}

/// `config_dir` is only consulted when mpv itself is launched.
pub(crate) fn plan_playback<L, D>(
    request: &PlaybackRequest,
    environment: Environment,
    config: &PlayerConfig,
    config_dir: D,
    locator: &L,
) -> Result<LaunchPlan, PlaybackError>
where
    L: ExecutableLocator + ?Sized,
    D: FnOnce() -> Result<PathBuf, PlaybackError>,
{
    let strategy = select_strategy(request, environment)?;
    if strategy == PlaybackStrategy::MobileIntent {
        return Ok(LaunchPlan::Mobile(mobile_intent(request)));
    }

    let mpv = locator
        .locate(MPV_BIN)
        .ok_or_else(|| PlaybackError::ExecutableNotFound {
            name: MPV_BIN.to_string(),
        })?;

    match strategy {
        PlaybackStrategy::TorrentDelegate => {
            let webtorrent = locator
                .locate(WEBTORRENT_BIN)
                .ok_or(PlaybackError::DependencyMissing {
                    tool: WEBTORRENT_BIN,
                    hint: "webtorrent-cli",
                })?;
            Ok(LaunchPlan::Torrent(LaunchCommand::new(
                webtorrent,
                webtorrent_args(request, config),
            )))
        }
        PlaybackStrategy::SyncDelegate => {
            let syncplay = locator
                .locate(SYNCPLAY_BIN)
                .ok_or(PlaybackError::DependencyMissing {
                    tool: SYNCPLAY_BIN,
                    hint: "syncplay",
                })?;
            Ok(LaunchPlan::Sync(LaunchCommand::new(
                syncplay,
                syncplay_args(request, config),
            )))
        }
        _ => Ok(LaunchPlan::Direct(LaunchCommand::prefixed(
            prefix_args(config),
            mpv,
            direct_mpv_args(request, config, &config_dir()?),
        ))),
    }
}

/// IPC sessions always drive mpv directly, regardless of torrent or sync flags.
pub(crate) fn plan_ipc_playback<L>(
    request: &PlaybackRequest,
    config: &PlayerConfig,
    config_dir: &Path,
    socket_path: &str,
    locator: &L,
) -> Result<LaunchCommand, PlaybackError>
where
    L: ExecutableLocator + ?Sized,
{
    let mpv = locator
        .locate(MPV_BIN)
        .ok_or_else(|| PlaybackError::ExecutableNotFound {
            name: MPV_BIN.to_string(),
        })?;
    Ok(LaunchCommand::prefixed(
        prefix_args(config),
        mpv,
        ipc_mpv_args(request, config, config_dir, socket_path),
    ))
}

impl LaunchPlan {
    pub(crate) fn strategy(&self) -> PlaybackStrategy {
        match self {
            Self::Direct(_) => PlaybackStrategy::DirectPlay,
            Self::Torrent(_) => PlaybackStrategy::TorrentDelegate,
            Self::Sync(_) => PlaybackStrategy::SyncDelegate,
            Self::Mobile(_) => PlaybackStrategy::MobileIntent,
        }
    }
}

fn mobile_intent(request: &PlaybackRequest) -> Intent {
    let component = if is_youtube_url(request.url()) {
        YOUTUBE_COMPONENT
    } else {
        MPV_ANDROID_COMPONENT
    };
    Intent {
        action: INTENT_ACTION_VIEW,
        url: request.url().to_string(),
        component,
    }
}
