use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

use super::PlaybackError;
use super::args::intent_args;
use super::process::{LaunchCommand, run_blocking};

const ORIG_SUFFIX: &str = "_ORIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Mobile,
    Desktop,
}

impl Environment {
    pub(crate) fn detect() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let termux_version = lookup("TERMUX_VERSION").filter(|value| !value.is_empty());
        let termux_prefix = lookup("PREFIX").is_some_and(|prefix| prefix.contains("com.termux"));
        if termux_version.is_some() || termux_prefix {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub(crate) fn is_mobile(self) -> bool {
        self == Self::Mobile
    }
}

/// Fresh environment for a child process built from a snapshot of our own.
pub(crate) fn sanitized_env() -> HashMap<OsString, OsString> {
    sanitize_env(env::vars_os())
}

/// Restores variables that bundlers stash as `<NAME>_ORIG` before injecting
/// their own values, and drops the stashed copies.
pub(crate) fn sanitize_env<I>(vars: I) -> HashMap<OsString, OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut current = HashMap::new();
    let mut originals = Vec::new();
    for (key, value) in vars {
        match key.to_str().and_then(|k| k.strip_suffix(ORIG_SUFFIX)) {
            Some(base) if !base.is_empty() => originals.push((OsString::from(base), value)),
            _ => {
                current.insert(key, value);
            }
        }
    }

    for (key, value) in originals {
        if value.is_empty() {
            current.remove(&key);
        } else {
            current.insert(key, value);
        }
    }
    current
}

pub(crate) trait ExecutableLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Resolves commands against `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SearchPath;

impl ExecutableLocator for SearchPath {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Intent {
    pub(crate) action: &'static str,
    pub(crate) url: String,
    pub(crate) component: &'static str,
}

pub(crate) trait IntentLauncher {
    fn launch(&self, intent: &Intent) -> Result<(), PlaybackError>;
}

/// Fires Android intents through Termux's `am` binary.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AmIntentLauncher;

impl IntentLauncher for AmIntentLauncher {
    fn launch(&self, intent: &Intent) -> Result<(), PlaybackError> {
        let mut args = vec!["am".to_string()];
        args.extend(intent_args(intent.action, &intent.url, intent.component));
        let command = LaunchCommand::new(PathBuf::from("nohup"), args);
        debug!(component = intent.component, "dispatching android intent");
        run_blocking(&command, false)?;
        Ok(())
    }
}
