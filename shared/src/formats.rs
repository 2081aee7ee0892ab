/// Format bucketing: collapses the raw `yt-dlp` format list into a short
/// menu of one entry per resolution tier and one per audio bitrate tier.
use std::cmp::Ordering;

use crate::models::{FormatOption, RawFormat};

/// Target heights, ascending.
pub const VIDEO_BUCKETS: [u32; 8] = [144, 240, 360, 480, 720, 1080, 1440, 2160];

/// Audio tiers in kbit/s, ascending, with their display labels.
pub const AUDIO_BUCKETS: [(u32, &str); 3] = [
    (128, "128kbps (Low)"),
    (256, "256kbps (Medium)"),
    (320, "320kbps (High)"),
];

/// A height must be strictly closer than this to a bucket to be kept.
const MAX_HEIGHT_DISTANCE: u32 = 150;

/// Protocol fragments that mark segmented or manifest-driven streams.
const MANIFEST_PROTOCOLS: [&str; 4] = ["m3u8", "dash", "f4m", "ism"];

/// Whether the format is a single-file stream the download endpoint can serve.
pub fn is_single_file(format: &RawFormat) -> bool {
    match format.protocol.as_deref() {
        Some(p) if !p.is_empty() => !MANIFEST_PROTOCOLS.iter().any(|m| p.contains(m)),
        _ => false,
    }
}

/// Audio tier for an average bitrate.
pub fn audio_bucket(abr: f64) -> u32 {
    if abr <= 160.0 {
        128
    } else if abr <= 280.0 {
        256
    } else {
        320
    }
}

/// Nearest video tier for a height, or None when no tier is close enough.
/// Equidistant heights go to the lower tier.
pub fn video_bucket(height: u32) -> Option<u32> {
    let (bucket, diff) = VIDEO_BUCKETS
        .iter()
        .map(|&b| (b, b.abs_diff(height)))
        .fold(None, |best: Option<(u32, u32)>, cur| match best {
            Some(b) if b.1 <= cur.1 => Some(b),
            _ => Some(cur),
        })?;
    (diff < MAX_HEIGHT_DISTANCE).then_some(bucket)
}

/// Total order for audio candidates: higher `abr` wins, then `format_id`.
fn audio_rank(a: &RawFormat, b: &RawFormat) -> Ordering {
    a.abr
        .unwrap_or(0.0)
        .total_cmp(&b.abr.unwrap_or(0.0))
        .then_with(|| a.format_id.cmp(&b.format_id))
}

/// Total order for video candidates: audio track first, then `tbr`, then `format_id`.
fn video_rank(a: &RawFormat, b: &RawFormat) -> Ordering {
    a.has_audio()
        .cmp(&b.has_audio())
        .then_with(|| a.tbr.unwrap_or(0.0).total_cmp(&b.tbr.unwrap_or(0.0)))
        .then_with(|| a.format_id.cmp(&b.format_id))
}

fn keep_best<'a>(
    slot: &mut Option<&'a RawFormat>,
    candidate: &'a RawFormat,
    rank: fn(&RawFormat, &RawFormat) -> Ordering,
) {
    match *slot {
        Some(current) if rank(candidate, current) != Ordering::Greater => {}
        _ => *slot = Some(candidate),
    }
}

/// Reduce raw formats to at most eight video entries (ascending height)
/// followed by at most three audio entries (ascending bitrate).
pub fn curate_formats(raw: &[RawFormat]) -> Vec<FormatOption> {
    let mut video: [Option<&RawFormat>; VIDEO_BUCKETS.len()] = [None; VIDEO_BUCKETS.len()];
    let mut audio: [Option<&RawFormat>; AUDIO_BUCKETS.len()] = [None; AUDIO_BUCKETS.len()];

    for f in raw.iter().filter(|f| is_single_file(f)) {
        if f.is_audio_only() {
            if let Some(abr) = f.abr.filter(|abr| *abr > 0.0) {
                let tier = audio_bucket(abr);
                if let Some(idx) = AUDIO_BUCKETS.iter().position(|(b, _)| *b == tier) {
                    keep_best(&mut audio[idx], f, audio_rank);
                }
            }
        }

        if let Some(tier) = f.height.filter(|h| *h > 0).and_then(video_bucket) {
            if let Some(idx) = VIDEO_BUCKETS.iter().position(|b| *b == tier) {
                keep_best(&mut video[idx], f, video_rank);
            }
        }
    }

    let videos = VIDEO_BUCKETS.iter().zip(video).filter_map(|(h, f)| {
        f.map(|f| FormatOption {
            format_id: f.format_id.clone(),
            ext: f.ext.clone(),
            resolution: format!("{}p", h),
            filesize: f.filesize,
            note: if f.has_audio() { "Video + Audio" } else { "Video Only" }.to_string(),
        })
    });

    let audios = AUDIO_BUCKETS.iter().zip(audio).filter_map(|((_, label), f)| {
        f.map(|f| FormatOption {
            format_id: f.format_id.clone(),
            ext: f.ext.clone(),
            resolution: "Audio".to_string(),
            filesize: f.filesize,
            note: label.to_string(),
        })
    });

    videos.chain(audios).collect()
}
