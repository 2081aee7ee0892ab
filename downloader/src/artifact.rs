/// Correlation between a task and its file on disk.
///
/// Artifacts are written as `{task_id}_{title}.{ext}`; the prefix is the only
/// link back to the task and is stripped again for the user-facing name.
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffixes left behind by in-flight or aborted downloads.
const PARTIAL_SUFFIXES: [&str; 3] = [".part", ".ytdl", ".temp"];

/// Filename prefix for a task's artifact.
pub fn artifact_prefix(task_id: &str) -> String {
    format!("{}_", task_id)
}

/// User-facing filename: the stored name with the task prefix removed.
pub fn display_name<'a>(file_name: &'a str, task_id: &str) -> &'a str {
    file_name
        .strip_prefix(&artifact_prefix(task_id))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(file_name)
}

/// Find the completed artifact for a task in `dir`.
///
/// When several candidates survive (intermediate per-stream files the tool
/// did not clean up), the shortest name is the merged output.
pub async fn locate(dir: &Path, task_id: &str) -> std::io::Result<Option<PathBuf>> {
    let prefix = artifact_prefix(task_id);
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut best: Option<(usize, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(&prefix) {
            continue;
        }
        if PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            debug!("Skipping partial file {}", name);
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if best.as_ref().map_or(true, |(len, _)| name.len() < *len) {
            best = Some((name.len(), entry.path()));
        }
    }

    Ok(best.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_prefix() {
        assert_eq!(display_name("abc123_My Video.mp4", "abc123"), "My Video.mp4");
    }

    #[test]
    fn test_display_name_keeps_foreign_names() {
        assert_eq!(display_name("other_My Video.mp4", "abc123"), "other_My Video.mp4");
        assert_eq!(display_name("abc123_", "abc123"), "abc123_");
    }

    #[tokio::test]
    async fn test_locate_picks_task_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t1_Song.m4a"), b"a").unwrap();
        std::fs::write(dir.path().join("t2_Other.m4a"), b"b").unwrap();
        std::fs::write(dir.path().join("t1_Song.m4a.part"), b"c").unwrap();

        let found = locate(dir.path(), "t1").await.unwrap().unwrap();
        assert_eq!(found, dir.path().join("t1_Song.m4a"));
    }

    #[tokio::test]
    async fn test_locate_prefers_merged_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t1_Clip.f137.mp4"), b"v").unwrap();
        std::fs::write(dir.path().join("t1_Clip.mp4"), b"m").unwrap();

        let found = locate(dir.path(), "t1").await.unwrap().unwrap();
        assert_eq!(found, dir.path().join("t1_Clip.mp4"));
    }

    #[tokio::test]
    async fn test_locate_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t10_Song.m4a"), b"a").unwrap();
        assert!(locate(dir.path(), "t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_locate_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate(&dir.path().join("gone"), "t1").await.is_err());
    }
}
