mod player;


use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitStatus;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::cli::{Cli, Command, EnvironmentArg, RequestArgs};
use crate::config::PlayerConfig;

use self::player::{
    Environment, MpvPlayer, PlaybackRequest, PlaybackResult, PlayerHandle, parse_progress,
};

const IPC_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(cli: Cli) -> Result<()> {
    let environment = resolve_environment(cli.environment);
    debug!(?environment, "resolved environment");

    match cli.command {
        Command::Play { request, json } => run_play(environment, &request, json)?,
        Command::Ipc {
            request,
            socket,
            detach,
            max_duration,
        } => run_ipc(
            environment,
            &request,
            &socket,
            detach,
            max_duration.map(Duration::from_secs),
        )?,
        Command::Progress { file } => run_progress(file.as_deref())?,
        Command::Config => run_config()?,
    }

    Ok(())
}

fn run_play(environment: Environment, args: &RequestArgs, json: bool) -> Result<()> {
    let (config, _) = PlayerConfig::load()?;
    let request = build_request(args)?;
    let player = MpvPlayer::new(&config, environment);
    let result = player.play(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_result(&result));
    }
    Ok(())
}

fn run_ipc(
    environment: Environment,
    args: &RequestArgs,
    socket: &str,
    detach: bool,
    max_duration: Option<Duration>,
) -> Result<()> {
    let (config, _) = PlayerConfig::load()?;
    let request = build_request(args)?;
    let player = MpvPlayer::new(&config, environment);
    let mut handle = player.play_with_ipc(&request, socket)?;
    println!(
        "mpv running (pid {}) with IPC server at {}",
        handle.id(),
        handle.socket_path()
    );

    if detach {
        return Ok(());
    }

    let status = match max_duration {
        Some(limit) => wait_with_deadline(&mut handle, limit)?,
        None => handle.wait()?,
    };
    println!("mpv exited with status: {status}");
    Ok(())
}

fn wait_with_deadline(handle: &mut PlayerHandle, limit: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + limit;
    while handle.is_running()? {
        if Instant::now() >= deadline {
            warn!(pid = handle.id(), "max duration reached, stopping mpv");
            return Ok(handle.terminate()?);
        }
        thread::sleep(IPC_POLL_INTERVAL);
    }
    Ok(handle.wait()?)
}

fn run_progress(file: Option<&Path>) -> Result<()> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    match parse_progress(&raw) {
        Some(progress) => println!("{}", serde_json::to_string_pretty(&progress)?),
        None => println!("No progress marker found."),
    }
    Ok(())
}

fn run_config() -> Result<()> {
    let (config, path) = PlayerConfig::load()?;
    println!("Config file: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("mpv config dir: {}", config.mpv_config_dir()?.display());
    Ok(())
}

fn resolve_environment(arg: EnvironmentArg) -> Environment {
    match arg {
        EnvironmentArg::Auto => Environment::detect(),
        EnvironmentArg::Mobile => Environment::Mobile,
        EnvironmentArg::Desktop => Environment::Desktop,
    }
}

pub(crate) fn build_request(args: &RequestArgs) -> Result<PlaybackRequest> {
    let mut request = PlaybackRequest::new(args.url.clone(), args.episode.clone())?
        .with_syncplay(args.syncplay);
    if let Some(title) = &args.title {
        request = request.with_title(title.clone());
    }
    if let Some(display_title) = &args.display_title {
        request = request.with_display_title(display_title.clone());
    }
    if let Some(start) = &args.start {
        request = request.with_start_time(start.clone());
    }
    for subtitle in &args.subtitles {
        request = request.with_subtitle(subtitle.clone());
    }
    for raw in &args.headers {
        let (key, value) = parse_header_arg(raw)?;
        request = request.with_header(key, value);
    }
    Ok(request)
}

pub(crate) fn parse_header_arg(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header `{raw}` must be KEY:VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("header `{raw}` has an empty name"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

pub(crate) fn format_result(result: &PlaybackResult) -> String {
    let episode = if result.episode.is_empty() {
        "-"
    } else {
        result.episode.as_str()
    };
    match (&result.stop_time, &result.total_time) {
        (Some(stop), Some(total)) => format!("Episode {episode}: stopped at {stop} of {total}"),
        _ => format!("Episode {episode}: playback finished, position unknown"),
    }
}
