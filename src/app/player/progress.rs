use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PlaybackProgress {
    pub(crate) elapsed: String,
    pub(crate) total: String,
    pub(crate) percent: Option<u8>,
}

fn av_status_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"AV: ([0-9:]*) / ([0-9:]*) \(([0-9]*)%\)").expect("valid AV status regex")
    })
}

/// Finds the last `AV: <elapsed> / <total> (<percent>%)` status line in mpv output.
pub(crate) fn parse_progress(output: &str) -> Option<PlaybackProgress> {
    // mpv repeats the status line while playing; only the final one marks the stop position.
    // Terminal status updates may be separated by carriage returns rather than newlines.
    output
        .split(['\n', '\r'])
        .rev()
        .find_map(|line| parse_progress_line(line.trim()))
}

pub(crate) fn parse_progress_line(line: &str) -> Option<PlaybackProgress> {
    let captures = av_status_regex().captures(line)?;
    Some(PlaybackProgress {
        elapsed: captures.get(1)?.as_str().to_string(),
        total: captures.get(2)?.as_str().to_string(),
        percent: captures.get(3).and_then(|m| m.as_str().parse::<u8>().ok()),
    })
}
