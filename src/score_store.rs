use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Clone, Debug, Serialize)]
pub struct HighScoreResponse {
    #[serde(rename = "highScore")]
    pub high_score: u32,
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
}

/// Best score ever reached, kept as a single plain-text integer on disk.
pub struct HighScoreStore {
    file_path: PathBuf,
    best: u32,
}

impl HighScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let best = load(&file_path);
        Self { file_path, best }
    }

    pub fn high_score(&self) -> u32 {
        self.best
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Folds a finished round into the stored best and writes it back.
    /// Returns whether `score` set a new best.
    pub fn record(&mut self, score: u32) -> bool {
        let improved = score > self.best;
        if improved {
            self.best = score;
            info!(high_score = score, "new high score");
        }
        self.save();
        improved
    }

    pub fn build_response(&self) -> HighScoreResponse {
        HighScoreResponse {
            high_score: self.best,
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(error) = fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), %error, "failed to create save directory");
                    return;
                }
            }
        }
        if let Err(error) = fs::write(&self.file_path, self.best.to_string()) {
            warn!(path = %self.file_path.display(), %error, "failed to write high score");
        }
    }
}

/// Missing file reads as 0. Anything that is not an integer is deleted so
/// the next save starts clean.
pub fn load(path: &Path) -> u32 {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read high score");
            }
            return 0;
        }
    };
    match text.trim().parse::<u32>() {
        Ok(value) => value,
        Err(error) => {
            warn!(path = %path.display(), %error, "save data is corrupted and will be deleted");
            if let Err(error) = fs::remove_file(path) {
                warn!(path = %path.display(), %error, "failed to delete corrupted save data");
            }
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join(".pacman")
    }

    #[test]
    fn missing_file_reads_as_zero() {
        let path = temp_file("score-missing");
        let store = HighScoreStore::new(path.clone());
        assert_eq!(store.high_score(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn corrupted_file_is_deleted_and_reads_as_zero() {
        let path = temp_file("score-corrupt");
        fs::create_dir_all(path.parent().expect("has parent")).expect("create dir");
        fs::write(&path, "abc").expect("write file");

        let store = HighScoreStore::new(path.clone());
        assert_eq!(store.high_score(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn record_keeps_the_best_and_persists_it() {
        let path = temp_file("score-record");
        let mut store = HighScoreStore::new(path.clone());
        assert!(store.record(42));
        assert!(!store.record(7));
        assert_eq!(store.high_score(), 42);
        assert_eq!(fs::read_to_string(&path).expect("file written"), "42");

        let reloaded = HighScoreStore::new(path.clone());
        assert_eq!(reloaded.high_score(), 42);
        let _ = fs::remove_dir_all(path.parent().expect("has parent"));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let path = temp_file("score-whitespace");
        fs::create_dir_all(path.parent().expect("has parent")).expect("create dir");
        fs::write(&path, "  17\n").expect("write file");
        assert_eq!(load(&path), 17);
        assert!(path.exists());
        let _ = fs::remove_dir_all(path.parent().expect("has parent"));
    }

    #[test]
    fn response_carries_timestamp() {
        let path = temp_file("score-response");
        let store = HighScoreStore::new(path);
        let response = store.build_response();
        assert_eq!(response.high_score, 0);
        assert!(response.generated_at_iso.ends_with('Z'));
    }
}
