use clap::Parser;
use std::path::PathBuf;

/// Watch a directory tree and rank entries by decaying activity heat.
#[derive(Parser, Debug)]
#[command(name = "heatwatch")]
#[command(version)]
#[command(about = "Watch a directory tree and rank entries by decaying activity heat")]
pub struct Cli {
    /// Directory to watch
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Number of recently-touched paths to keep pinned in view
    #[arg(short = 'n', long = "history", default_value_t = 4)]
    pub history: usize,

    /// Glob pattern to ignore (repeatable). Defaults to node_modules, .git, dist
    #[arg(short = 'i', long = "ignore")]
    pub ignore: Vec<String>,

    /// Filesystem watcher debounce interval, in milliseconds
    #[arg(long = "interval", default_value_t = 100)]
    pub interval: u64,

    /// Number of ticks a deleted entry is kept visible while it fades out
    #[arg(long = "ghost-steps", default_value_t = 3)]
    pub ghost_steps: u32,

    /// Disable VCS status lookups
    #[arg(long = "no-git")]
    pub no_git: bool,

    /// Idle re-render interval, in milliseconds (keeps the heat bars decaying
    /// smoothly even with no filesystem activity)
    #[arg(short = 'b', long = "breathe", default_value_t = 2000)]
    pub breathe: u64,
}

impl Cli {
    pub const DEFAULT_IGNORES: &'static [&'static str] = &["node_modules", ".git", "dist"];

    /// The effective ignore list: user-supplied globs plus the defaults,
    /// unless the user supplied at least one of their own.
    pub fn ignore_patterns(&self) -> Vec<String> {
        if self.ignore.is_empty() {
            Self::DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect()
        } else {
            self.ignore.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_defaults_are_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_ignores_used_when_none_supplied() {
        let cli = Cli::parse_from(["heatwatch"]);
        assert_eq!(cli.ignore_patterns(), vec!["node_modules", ".git", "dist"]);
    }

    #[test]
    fn user_supplied_ignores_replace_defaults() {
        let cli = Cli::parse_from(["heatwatch", "-i", "target", "-i", "*.log"]);
        assert_eq!(cli.ignore_patterns(), vec!["target", "*.log"]);
    }

    #[test]
    fn history_and_breathe_defaults() {
        let cli = Cli::parse_from(["heatwatch"]);
        assert_eq!(cli.history, 4);
        assert_eq!(cli.breathe, 2000);
        assert_eq!(cli.interval, 100);
        assert_eq!(cli.ghost_steps, 3);
        assert!(!cli.no_git);
    }
}
