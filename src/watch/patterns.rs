// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::watch::path_utils::to_slash;

/// Path-part names excluded when nothing else is configured.
pub const DEFAULT_EXCLUDED_PARTS: &[&str] = &[".git", "__pycache__"];

/// Rules deciding which changed paths never trigger a run.
///
/// - `part_names` match any single path segment at any depth, so
///   `node_modules` ignores everything below every `node_modules`
///   directory.
/// - `subpath_prefixes` match as a literal string prefix of the path
///   relative to the watch root, so `bin` ignores `bin/app` but not
///   `sub/bin/app`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    part_names: BTreeSet<String>,
    subpath_prefixes: BTreeSet<String>,
}

impl ExclusionRules {
    pub fn new<P, S>(part_names: P, subpath_prefixes: S) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let mut rules = Self::default();
        for name in part_names {
            rules = rules.with_part(name);
        }
        for prefix in subpath_prefixes {
            rules = rules.with_subpath(prefix);
        }
        rules
    }

    /// Rules excluding [`DEFAULT_EXCLUDED_PARTS`] and nothing else.
    pub fn default_parts() -> Self {
        Self::new(DEFAULT_EXCLUDED_PARTS.iter().copied(), std::iter::empty::<String>())
    }

    pub fn with_part(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.part_names.insert(name.to_string());
        }
        self
    }

    /// Add a subpath prefix. A leading `./` is stripped; an empty prefix
    /// would exclude everything and is dropped.
    pub fn with_subpath(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().replace('\\', "/");
        let prefix = prefix.trim().trim_start_matches("./");
        if !prefix.is_empty() {
            self.subpath_prefixes.insert(prefix.to_string());
        }
        self
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.part_names.iter().map(String::as_str)
    }

    pub fn subpath_prefixes(&self) -> impl Iterator<Item = &str> {
        self.subpath_prefixes.iter().map(String::as_str)
    }

    /// True if any segment of `rel_path` equals an excluded part name.
    ///
    /// Segments are checked from the deepest one upwards.
    pub fn excludes_part(&self, rel_path: &Path) -> bool {
        if self.part_names.is_empty() {
            return false;
        }
        rel_path.components().rev().any(|comp| match comp {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|name| self.part_names.contains(name)),
            _ => false,
        })
    }

    /// True if `rel_path` (forward slashes) starts with an excluded prefix.
    pub fn excludes_subpath(&self, rel_path: &str) -> bool {
        self.subpath_prefixes
            .iter()
            .any(|prefix| rel_path.starts_with(prefix.as_str()))
    }

    /// Either rule applies to `rel_path`.
    pub fn excludes(&self, rel_path: &Path) -> bool {
        self.excludes_part(rel_path) || self.excludes_subpath(&to_slash(rel_path))
    }
}

/// Optional glob filter applied to would-be triggers.
///
/// An empty pattern list matches everything, as does `*`: with
/// `globset`'s defaults `*` also crosses `/`, so `*.rs` matches
/// `src/main.rs`.
#[derive(Clone)]
pub struct MatchRules {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl fmt::Debug for MatchRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchRules")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl Default for MatchRules {
    fn default() -> Self {
        Self::any()
    }
}

impl MatchRules {
    /// Rules that accept every path.
    pub fn any() -> Self {
        Self {
            patterns: Vec::new(),
            set: None,
        }
    }

    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if patterns.is_empty() || patterns.iter().any(|p| p == "*") {
            return Ok(Self {
                patterns,
                set: None,
            });
        }

        let set = build_globset(&patterns).context("building match globset")?;
        Ok(Self {
            patterns,
            set: Some(set),
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true if the given path (relative to the watch root, forward
    /// slashes) is of interest.
    pub fn matches(&self, rel_path: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(rel_path),
            None => true,
        }
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
