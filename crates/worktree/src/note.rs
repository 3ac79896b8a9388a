// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The optional worktree note file: a plain-text UTF-8 file under the
//! repository's metadata directory whose last non-empty line, trimmed and
//! capped at 500 characters, is taken as the current note.

use std::path::Path;

pub const NOTE_MAX_CHARS: usize = 500;

/// Read the current note from `path`, if present.
pub async fn read_note(path: &Path) -> Option<String> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    let last_line = contents.lines().rev().find(|l| !l.trim().is_empty())?;
    Some(cap_note(last_line.trim()))
}

/// Append a note line to `path`, creating parent directories as needed.
pub async fn write_note(path: &Path, note: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = cap_note(note);
    line.push('\n');
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await
}

fn cap_note(note: &str) -> String {
    let char_count = note.chars().count();
    if char_count <= NOTE_MAX_CHARS {
        return note.to_owned();
    }
    let truncated: String = note.chars().take(NOTE_MAX_CHARS.saturating_sub(1)).collect();
    format!("{truncated}\u{2026}")
}

#[cfg(test)]
#[path = "note_tests.rs"]
mod tests;
