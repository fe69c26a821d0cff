//! # Terminal Output
//!
//! Decides whether the CLI decorates its output with colour and status
//! symbols, and renders the small pieces of styled text the commands share.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` on the command line
//! - `NO_COLOR` disables colour when set to anything, even empty
//! - `CLICOLOR=0` disables colour
//! - `CLICOLOR_FORCE=1` forces colour when stdout is not a terminal
//! - `TERM=dumb` disables colour
//!
//! ```rust,ignore
//! use tandem::output::{OutputConfig, Status};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} cloned", config.mark(Status::Done));
//! ```

use std::env;

use console::style;

/// Whether the CLI decorates its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

/// Outcome shown in front of a line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Skipped,
    Failed,
    /// A suggestion for what to do next.
    Hint,
}

impl OutputConfig {
    /// Combines the `--color` flag with the environment.
    ///
    /// `always` wins over `NO_COLOR`; `never` wins over everything. Any
    /// other value means auto-detection.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// A status symbol, or a bracketed word when colour is off.
    pub fn mark(&self, status: Status) -> String {
        match (self.use_color, status) {
            (true, Status::Done) => style("✔").green().to_string(),
            (true, Status::Skipped) => style("–").yellow().to_string(),
            (true, Status::Failed) => style("✘").red().to_string(),
            (true, Status::Hint) => style("💡").cyan().to_string(),
            (false, Status::Done) => "[ok]".to_string(),
            (false, Status::Skipped) => "[skip]".to_string(),
            (false, Status::Failed) => "[fail]".to_string(),
            (false, Status::Hint) => "[hint]".to_string(),
        }
    }

    /// `text` in bold when colour is on.
    pub fn heading(&self, text: &str) -> String {
        if self.use_color {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// An abbreviated commit hash, dimmed when colour is on.
    pub fn hash(&self, short: &str) -> String {
        if self.use_color {
            style(short).yellow().to_string()
        } else {
            short.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
