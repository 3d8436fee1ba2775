// src/config/overrides.rs

//! Layering of command-line flags over the config file.
//!
//! Scalars given on the command line replace the file's values; list
//! flags are appended to the file's lists (or to the defaults, for
//! `--exclude`). A command on the command line replaces `[run].cmd` and
//! `[run].args` together.

use std::path::Path;

use crate::cli::CliArgs;
use crate::config::duration::RawDuration;
use crate::config::model::RawConfigFile;
use crate::watch::patterns::DEFAULT_EXCLUDED_PARTS;

impl RawConfigFile {
    /// Apply `args` on top of this config. `cwd` anchors a relative
    /// `--dir`.
    pub fn apply_cli(&mut self, args: &CliArgs, cwd: &Path) {
        if let Some(dir) = &args.dir {
            self.watch.dir = Some(cwd.join(dir));
        }

        if !args.exclude.is_empty() {
            let parts = self.watch.exclude.get_or_insert_with(|| {
                DEFAULT_EXCLUDED_PARTS.iter().map(|s| s.to_string()).collect()
            });
            parts.extend(args.exclude.iter().cloned());
        }
        self.watch.exclude_paths.extend(args.exclude_paths.iter().cloned());
        self.watch
            .match_patterns
            .extend(args.match_patterns.iter().cloned());

        if let Some((program, rest)) = args.command.split_first() {
            self.run.cmd = Some(program.clone());
            self.run.args = rest.to_vec();
        }
        for (key, value) in &args.env {
            self.run.env.insert(key.clone(), value.clone());
        }

        let text = |s: &Option<String>| s.as_ref().map(|s| RawDuration::Text(s.clone()));
        if let Some(d) = text(&args.delay) {
            self.run.delay = Some(d);
        }
        if let Some(d) = text(&args.ignore_window) {
            self.run.ignore_window = Some(d);
        }
        if let Some(d) = text(&args.timeout) {
            self.run.timeout = Some(d);
        }
        if let Some(d) = text(&args.grace) {
            self.run.grace = Some(d);
        }
    }
}
