//! Editor options and `replin.toml` loading.
//!
//! Every tunable the line editor reads lives in one [`Options`] record that is
//! passed by reference to the subsystems that need it; there are no
//! process-wide singletons. The file format is TOML with serde defaults so an
//! absent or partially written file still yields a usable configuration.
//! Unknown fields are ignored to allow forward evolution, and a file that
//! fails to parse falls back to defaults rather than aborting startup.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Runtime options consumed by the editor. Durations are milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// How long a single beep flash stays on screen.
    pub beep_duration: u64,
    /// Delay between beep color alternations.
    pub beep_blink: u64,
    /// Upper bound on the total beep animation time.
    pub beep_maxduration: u64,
    /// SGR color names cycled by the beep animation.
    pub beep_colors: Vec<String>,
    /// When true, the beep keeps the current text color instead of flashing.
    pub beep_use_current: bool,
    /// Backspace deletes up to four spaces so indentation lands on a
    /// multiple-of-four display column.
    pub backspace_align: bool,
    /// Backspace additionally eats spaces to the right to keep the relative
    /// column of trailing text. Only meaningful with `backspace_align`.
    pub backspace_adjust: bool,
    /// Default indent width in spaces for newline auto-indent. Negative
    /// values are not representable; zero disables the default indent.
    pub auto_indent: usize,
    /// Apply auto-indent handling inside bracketed paste.
    pub auto_indent_bracketed_paste: bool,
    /// Two non-space insertions closer together than this are treated as a
    /// paste, suppressing auto-indent on the next newline.
    pub auto_indent_time_threshold: u64,
    /// Coalescing window for repaints during bursts of plain insertions at
    /// end of buffer.
    pub auto_refresh_time_delay: u64,
    /// Tab accepts the currently displayed hint.
    pub hint_tab_completes: bool,
    /// Duration of the region highlight animation.
    pub region_animation_duration: u64,
    /// Maximum number of entries retained by the kill ring.
    pub kill_ring_max: usize,
    /// Ask before exiting on Ctrl-D with an empty buffer.
    pub confirm_exit: bool,
    /// Display width of a tab stop.
    pub tabwidth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            beep_duration: 200,
            beep_blink: 200,
            beep_maxduration: 1000,
            beep_colors: vec!["yellow".to_string()],
            beep_use_current: false,
            backspace_align: true,
            backspace_adjust: true,
            auto_indent: 4,
            auto_indent_bracketed_paste: true,
            auto_indent_time_threshold: 5,
            auto_refresh_time_delay: 50,
            hint_tab_completes: true,
            region_animation_duration: 200,
            kill_ring_max: 100,
            confirm_exit: false,
            tabwidth: 8,
        }
    }
}

impl Options {
    /// Map a configured beep color name to its SGR foreground sequence.
    /// Unknown names fall back to yellow.
    pub fn beep_sgr(&self, idx: usize) -> &'static str {
        let name = self
            .beep_colors
            .get(idx % self.beep_colors.len().max(1))
            .map(String::as_str)
            .unwrap_or("yellow");
        match name {
            "black" => "\x1b[30m",
            "red" => "\x1b[31m",
            "green" => "\x1b[32m",
            "blue" => "\x1b[34m",
            "magenta" => "\x1b[35m",
            "cyan" => "\x1b[36m",
            "white" => "\x1b[37m",
            _ => "\x1b[33m",
        }
    }
}

/// Best-effort config path: a local `replin.toml` wins, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("replin.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("replin").join("replin.toml");
    }
    PathBuf::from("replin.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Options> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<Options>(&content) {
            Ok(opts) => {
                info!(target: "config", file = %path.display(), "options_loaded");
                Ok(opts)
            }
            Err(e) => {
                warn!(target: "config", file = %path.display(), error = %e, "options_parse_failed_using_defaults");
                Ok(Options::default())
            }
        }
    } else {
        Ok(Options::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing_file() {
        let opts = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(opts.backspace_align);
        assert!(opts.backspace_adjust);
        assert_eq!(opts.kill_ring_max, 100);
        assert_eq!(opts.tabwidth, 8);
    }

    #[test]
    fn parses_partial_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "kill_ring_max = 7\nconfirm_exit = true\nbeep_colors = [\"red\", \"cyan\"]\n",
        )
        .unwrap();
        let opts = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(opts.kill_ring_max, 7);
        assert!(opts.confirm_exit);
        assert_eq!(opts.beep_sgr(0), "\x1b[31m");
        assert_eq!(opts.beep_sgr(1), "\x1b[36m");
        // untouched fields keep their defaults
        assert_eq!(opts.auto_refresh_time_delay, 50);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "kill_ring_max = \"lots\"\n").unwrap();
        let opts = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(opts.kill_ring_max, 100);
    }

    #[test]
    fn unknown_fields_ignored() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "future_option = 3\ntabwidth = 4\n").unwrap();
        let opts = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(opts.tabwidth, 4);
    }
}
