use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vidbrief")
}

/// Check the upload extension against the allow-list (case-insensitive)
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Reduce a client-supplied name to a single safe path component.
///
/// Path separators become whitespace, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` trimmed.
/// The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let replaced = filename.replace(['/', '\\'], " ");
    let joined = replaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Resolve `name` inside `dir`, refusing anything that is not already a plain
/// sanitized file name.
pub fn resolve_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let safe = secure_filename(name);
    if safe.is_empty() || safe != name {
        return None;
    }
    Some(dir.join(safe))
}

/// Fresh path for a transient audio artifact, e.g. `audio_<uuid>.wav`
pub fn audio_artifact_path(temp_dir: &Path, prefix: &str) -> PathBuf {
    temp_dir.join(format!("{}_{}.wav", prefix, Uuid::new_v4().simple()))
}

/// Key frame file name combining the current timestamp, a random token and the
/// frame index.
pub fn frame_file_name(frame_index: u64) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let token = Uuid::new_v4().simple().to_string();
    format!("frame_{}_{}_{}.jpg", secs, &token[..8], frame_index)
}

/// Returns the path when the file exists and holds at least one byte
pub async fn non_empty_file(path: &Path) -> Option<&Path> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
        _ => None,
    }
}

/// Best-effort removal, logged and otherwise ignored
pub async fn remove_quietly(path: &Path, what: &str) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!(path = %path.display(), "{what} removed"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove {what}"),
    }
}

/// A file that belongs to one request.
///
/// Call [`TransientFile::remove`] when done with it. Dropping the guard without
/// that still deletes the file, synchronously.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    removed: bool,
}

impl TransientFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        remove_quietly(&self.path, "temporary audio file").await;
        self.removed = true;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "temporary audio file removed"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove temporary audio file"
            ),
        }
    }
}
