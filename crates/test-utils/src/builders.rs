use std::path::PathBuf;
use std::time::Duration;

use watchrun::config::WatchConfig;
use watchrun::exec::CommandSpec;
use watchrun::watch::{ExclusionRules, MatchRules};

/// Builder for `WatchConfig` to simplify test setup.
///
/// Starts from the same defaults as a config with no file and no flags,
/// except that the settle delay is shortened to 20ms.
pub struct WatchConfigBuilder {
    config: WatchConfig,
    parts: Vec<String>,
    prefixes: Vec<String>,
    patterns: Vec<String>,
}

impl WatchConfigBuilder {
    pub fn new(root: impl Into<PathBuf>, program: &str) -> Self {
        let mut config = WatchConfig::new_unchecked(root.into(), CommandSpec::new(program));
        config.debounce.settle_delay = Duration::from_millis(20);
        Self {
            config,
            parts: watchrun::watch::DEFAULT_EXCLUDED_PARTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            prefixes: Vec::new(),
            patterns: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.config.command = self.config.command.arg(arg);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.command = self.config.command.env(key, value);
        self
    }

    pub fn exclude_part(mut self, name: &str) -> Self {
        self.parts.push(name.to_string());
        self
    }

    pub fn exclude_path(mut self, prefix: &str) -> Self {
        self.prefixes.push(prefix.to_string());
        self
    }

    pub fn match_pattern(mut self, pattern: &str) -> Self {
        self.patterns.push(pattern.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.debounce.settle_delay = delay;
        self
    }

    pub fn ignore_window(mut self, window: Duration) -> Self {
        self.config.debounce.ignore_window = window;
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.config.supervisor.grace_period = grace;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.supervisor.timeout = Some(timeout);
        self
    }

    pub fn build(mut self) -> WatchConfig {
        self.config.exclusions = ExclusionRules::new(self.parts, self.prefixes);
        self.config.matches =
            MatchRules::new(&self.patterns).expect("Failed to build match rules from builder");
        self.config
    }
}
