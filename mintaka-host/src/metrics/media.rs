//! Now-playing metadata via `playerctl`.

use super::command::{CommandRunner, QueryError};

const FORMAT: &str =
    "{{status}}|{{title}}|{{artist}}|{{mpris:length}}|{{position}}|{{mpris:artUrl}}";

/// Track state reported by the player.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// "Playing", "Paused", ...
    pub status: String,
    /// Upper-cased for the display font.
    pub title: String,
    pub artist: String,
    /// Microseconds.
    pub position: u64,
    /// Microseconds.
    pub length: u64,
    pub art_url: String,
}

impl MediaInfo {
    pub fn is_playing(&self) -> bool {
        self.status == "Playing"
    }

    /// Percent through the track; 0 when the length is unknown.
    pub fn progress(&self) -> f32 {
        if self.length > 0 {
            self.position as f32 / self.length as f32 * 100.0
        } else {
            0.0
        }
    }
}

/// `m:ss` from microseconds.
pub fn format_time(micros: u64) -> String {
    let secs = micros / 1_000_000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Parse one line of `playerctl metadata --format` output.
pub fn parse_metadata(output: &str) -> Result<MediaInfo, QueryError> {
    let parts: Vec<&str> = output.trim().splitn(6, '|').collect();
    let [status, title, artist, length, position, art_url] = parts.as_slice() else {
        return Err(QueryError::Malformed(format!(
            "expected 6 fields, got {}",
            parts.len()
        )));
    };

    let micros = |field: &str| -> Result<u64, QueryError> {
        if field.is_empty() {
            return Ok(0);
        }
        // Some players report fractional or negative positions.
        field
            .parse::<f64>()
            .map(|v| v.max(0.0) as u64)
            .map_err(|_| QueryError::Malformed(format!("not a number: {field:?}")))
    };

    Ok(MediaInfo {
        status: (*status).to_owned(),
        title: title.to_uppercase(),
        artist: artist.to_uppercase(),
        length: micros(*length)?,
        position: micros(*position)?,
        art_url: (*art_url).to_owned(),
    })
}

/// Queries one MPRIS player.
pub struct MediaQuery {
    runner: CommandRunner,
    player: String,
}

impl MediaQuery {
    pub fn new(runner: CommandRunner, player: impl Into<String>) -> Self {
        Self {
            runner,
            player: player.into(),
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn fetch(&self) -> Result<MediaInfo, QueryError> {
        let out = self
            .runner
            .run("playerctl", &["-p", &self.player, "metadata", "--format", FORMAT])?;
        if out.is_empty() {
            return Err(QueryError::Unavailable("player reported nothing"));
        }
        parse_metadata(&out)
    }
}

// ── Tests ────────────────────────────────────────────────────────
