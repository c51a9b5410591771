use std::path::Path;

use super::PlaybackRequest;
use crate::config::PlayerConfig;

pub(crate) const INTENT_ACTION_VIEW: &str = "android.intent.action.VIEW";

/// Player options shared by every desktop path, in a fixed order: headers,
/// subtitles, start offset, title, then configured extra arguments.
pub(crate) fn mpv_cli_options(request: &PlaybackRequest, config: &PlayerConfig) -> Vec<String> {
    let mut options = Vec::new();

    if !request.headers().is_empty() {
        let fields = request
            .headers()
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect::<Vec<_>>()
            .join(",");
        options.push(format!("--http-header-fields={fields}"));
    }

    for subtitle in request.subtitles() {
        options.push(format!("--sub-file={subtitle}"));
    }

    if let Some(start) = request.start_time() {
        options.push(format!("--start={start}"));
    }

    if let Some(title) = request.title() {
        options.push(format!("--title={title}"));
    }

    options.extend(split_config_list(config.args.as_deref()));
    options
}

pub(crate) fn prefix_args(config: &PlayerConfig) -> Vec<String> {
    split_config_list(config.pre_args.as_deref())
}

pub(crate) fn direct_mpv_args(
    request: &PlaybackRequest,
    config: &PlayerConfig,
    config_dir: &Path,
) -> Vec<String> {
    let mut args = vec![config_dir_arg(config_dir), request.url().to_string()];
    args.extend(mpv_cli_options(request, config));
    args
}

pub(crate) fn ipc_mpv_args(
    request: &PlaybackRequest,
    config: &PlayerConfig,
    config_dir: &Path,
    socket_path: &str,
) -> Vec<String> {
    let mut args = vec![
        format!("--input-ipc-server={socket_path}"),
        "--idle=yes".to_string(),
        "--force-window=yes".to_string(),
        config_dir_arg(config_dir),
        request.url().to_string(),
    ];
    args.extend(mpv_cli_options(request, config));
    args
}

pub(crate) fn webtorrent_args(request: &PlaybackRequest, config: &PlayerConfig) -> Vec<String> {
    let mut args = vec![request.url().to_string(), "--mpv".to_string()];
    let options = mpv_cli_options(request, config);
    if !options.is_empty() {
        args.push("--player-args".to_string());
        args.extend(options);
    }
    args
}

pub(crate) fn syncplay_args(request: &PlaybackRequest, config: &PlayerConfig) -> Vec<String> {
    let mut args = vec![request.url().to_string()];
    let options = mpv_cli_options(request, config);
    if !options.is_empty() {
        args.push("--".to_string());
        args.extend(options);
    }
    args
}

/// `am start` arguments; the launcher prepends `nohup am`.
pub(crate) fn intent_args(action: &str, url: &str, component: &str) -> Vec<String> {
    ["start", "--user", "0", "-a", action, "-d", url, "-n", component]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn config_dir_arg(config_dir: &Path) -> String {
    format!("--config-dir={}", config_dir.display())
}

fn split_config_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) if !raw.is_empty() => raw.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
