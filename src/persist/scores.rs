use super::atomic::write_atomic;
use super::PersistError;
use crate::shared::names::{score_name, MAX_SCORE_NAME_LENGTH};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const MAX_SCORES: usize = 10;
pub const MAX_WRITTEN_SCORES: usize = 5;
const MAX_LINE_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighScore {
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    Rejected,
}

fn parse_line(line: &str) -> Option<HighScore> {
    if line.len() > MAX_LINE_LENGTH {
        return None;
    }
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (name, rest) = line.split_once(|ch: char| ch.is_whitespace())?;
    if name.len() > MAX_SCORE_NAME_LENGTH {
        return None;
    }
    let digits = rest.trim();
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let score = digits.parse::<u32>().ok().filter(|score| *score <= i32::MAX as u32)?;
    Some(HighScore {
        name: name.to_string(),
        score,
    })
}

/// Tolerant reader: malformed lines are skipped, at most `MAX_SCORES` kept.
pub fn parse_scores(text: &str) -> Vec<HighScore> {
    text.lines().filter_map(parse_line).take(MAX_SCORES).collect()
}

/// Names are written as score tokens so every line reads back.
pub fn format_scores(scores: &[HighScore], retain: usize) -> String {
    let mut out = String::new();
    for entry in scores.iter().take(retain) {
        let _ = writeln!(out, "{} {}", score_name(&entry.name), entry.score);
    }
    out
}

pub fn load_scores(path: &Path) -> Result<Vec<HighScore>, PersistError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(parse_scores(&String::from_utf8_lossy(&bytes))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(PersistError::io(path, err)),
    }
}

fn sort_descending(scores: &mut [HighScore]) {
    scores.sort_by(|a, b| b.score.cmp(&a.score));
}

/// High-score file bound to a path and the number of entries it keeps.
#[derive(Debug, Clone)]
pub struct ScoreFile {
    path: PathBuf,
    retain: usize,
}

impl ScoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retain: MAX_WRITTEN_SCORES,
        }
    }

    pub fn with_retain(mut self, retain: usize) -> Self {
        self.retain = retain.clamp(1, MAX_SCORES);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<HighScore>, PersistError> {
        let mut scores = load_scores(&self.path)?;
        sort_descending(&mut scores);
        Ok(scores)
    }

    pub fn save(&self, scores: &[HighScore]) -> Result<(), PersistError> {
        let mut sorted = scores.to_vec();
        sort_descending(&mut sorted);
        write_atomic(&self.path, format_scores(&sorted, self.retain).as_bytes())
    }

    pub fn append(&self, name: &str, score: u32) -> Result<AppendOutcome, PersistError> {
        let mut scores = load_scores(&self.path)?;
        let name = score_name(name);
        let entry = HighScore {
            name: name.clone(),
            score,
        };

        if scores.len() < MAX_SCORES {
            scores.push(entry);
        } else {
            let lowest = scores
                .iter()
                .enumerate()
                .min_by_key(|(_, existing)| existing.score)
                .map(|(index, existing)| (index, existing.score));
            match lowest {
                Some((index, lowest)) if score > lowest => scores[index] = entry,
                _ => {
                    tracing::debug!(%name, score, "score below table, not stored");
                    return Ok(AppendOutcome::Rejected);
                }
            }
        }

        self.save(&scores)?;
        tracing::info!(%name, score, "high score stored");
        Ok(AppendOutcome::Stored)
    }
}
