/// Progress line parsing for `yt-dlp --newline --no-colors` output.
///
/// This is the only place that knows the tool's textual progress format.
/// A typical line looks like:
/// `[download]  24.5% of 10.00MiB at  2.50MiB/s ETA 00:03`
use once_cell::sync::Lazy;
use regex::Regex;

/// Structured result of one output line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressDelta {
    Percent {
        percent: f64,
        speed: Option<String>,
        eta: Option<String>,
    },
    PostProcessing,
}

/// Only a percentage directly after the `[download]` tag is progress;
/// `[download] Destination:` lines carry titles that may contain `%`.
static PERCENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").unwrap()
});

static SPEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bat\s+(\S+/s)").unwrap()
});

static ETA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bETA\s+(\d[\d:]*)").unwrap()
});

/// Line prefixes emitted once the download itself is done and the tool is
/// merging, converting or fixing up the artifact.
const POST_PROCESSORS: [&str; 8] = [
    "[Merger]",
    "[ExtractAudio]",
    "[VideoConvertor]",
    "[VideoRemuxer]",
    "[Fixup",
    "[ffmpeg]",
    "[EmbedThumbnail]",
    "[Metadata]",
];

/// Parse a single output line. Returns None for lines carrying no progress.
pub fn parse_line(line: &str) -> Option<ProgressDelta> {
    let line = line.trim();

    if POST_PROCESSORS.iter().any(|p| line.starts_with(p)) {
        return Some(ProgressDelta::PostProcessing);
    }

    let caps = PERCENT_RE.captures(line)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;

    let speed = SPEED_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let eta = ETA_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(ProgressDelta::Percent {
        percent: percent.clamp(0.0, 100.0),
        speed,
        eta,
    })
}
