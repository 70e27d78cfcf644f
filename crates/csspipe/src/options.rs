//! Caller configuration and per-file effective options.
//!
//! [`Options`] is what the caller hands to the adapter once. For every file
//! the adapter derives a fresh [`EffectiveOptions`] from it, filling in
//! path-based defaults; the caller's value is only ever read.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, WrapErr, eyre};
use facet::Facet;

use crate::file::VirtualFile;
use crate::paths;
use crate::sourcemap::SourceMap;

/// Adapter configuration.
///
/// Keys are camelCase when loaded from JSON:
///
/// ```json
/// { "root": "public/", "sourceMap": true, "specialComments": "first" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Facet)]
#[facet(rename_all = "camelCase")]
pub struct Options {
    /// Output path. Relative URLs are rebased onto its directory unless
    /// `root`, `rebase_to` or `relative_to` say otherwise. Defaults to the
    /// file's own path.
    #[facet(default)]
    pub target: Option<String>,

    /// Root directory; relative URLs are rewritten as root-relative (`/...`).
    #[facet(default)]
    pub root: Option<String>,

    /// Directory relative URLs are measured against.
    /// Defaults to the directory of `root`, or of the file.
    #[facet(default)]
    pub relative_to: Option<String>,

    /// Rewrite `url(...)` references. Enabled unless set to `false`.
    #[facet(default)]
    pub rebase: Option<bool>,

    /// Directory to rebase URLs to instead of `relative_to`.
    #[facet(default)]
    pub rebase_to: Option<String>,

    /// Generate a source map.
    #[facet(default)]
    pub source_map: bool,

    /// Embed original sources in generated maps.
    #[facet(default)]
    pub source_map_inline_sources: bool,

    /// Report timing in the result details.
    #[facet(default)]
    pub debug: bool,

    /// Which `/*! ... */` comments survive.
    #[facet(default)]
    pub special_comments: SpecialComments,

    /// Output formatting.
    #[facet(default)]
    pub format: OutputFormat,

    /// Run structural optimizations (rule merging, shorthand folding).
    /// Enabled unless set to `false`.
    #[facet(default)]
    pub optimize: Option<bool>,

    /// Which `@import` rules are inlined.
    #[facet(default)]
    pub inline: Inline,

    /// Engine-specific settings, forwarded untouched. Engines ignore keys
    /// they do not know; the bundled lightningcss engine knows none.
    #[facet(default)]
    pub extra: HashMap<String, String>,
}

/// Special (`/*! ... */`) comment retention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Facet)]
#[facet(rename_all = "snake_case")]
#[repr(u8)]
pub enum SpecialComments {
    #[default]
    All,
    First,
    Remove,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Facet)]
#[facet(rename_all = "snake_case")]
#[repr(u8)]
pub enum OutputFormat {
    /// Everything on as few bytes as possible.
    #[default]
    Minified,
    /// Indented, one declaration per line.
    Beautified,
}

/// `@import` inlining policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Facet)]
#[facet(rename_all = "snake_case")]
#[repr(u8)]
pub enum Inline {
    /// Inline imports that resolve to local files.
    #[default]
    Local,
    /// Leave every `@import` rule in place.
    Never,
}

impl Options {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        facet_json::from_str(json).map_err(|e| eyre!("invalid csspipe options: {e}"))
    }

    /// Load options from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let json = fs_err::read_to_string(path)?;
        Self::from_json(&json).wrap_err_with(|| format!("while loading {path}"))
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_relative_to(mut self, relative_to: impl Into<String>) -> Self {
        self.relative_to = Some(relative_to.into());
        self
    }

    pub fn with_rebase(mut self, rebase: bool) -> Self {
        self.rebase = Some(rebase);
        self
    }

    pub fn with_rebase_to(mut self, rebase_to: impl Into<String>) -> Self {
        self.rebase_to = Some(rebase_to.into());
        self
    }

    pub fn with_source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    pub fn with_inline_sources(mut self, inline_sources: bool) -> Self {
        self.source_map_inline_sources = inline_sources;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_special_comments(mut self, special_comments: SpecialComments) -> Self {
        self.special_comments = special_comments;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = Some(optimize);
        self
    }

    pub fn with_inline(mut self, inline: Inline) -> Self {
        self.inline = inline;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Whether the engine should produce a source map, and what it builds on.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMapMode {
    Disabled,
    Generate,
    /// The file already carries this map from an earlier step.
    Inherit(SourceMap),
}

impl SourceMapMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, SourceMapMode::Disabled)
    }
}

/// Options for one file, with every path resolved to an absolute path.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
    /// The file the text came from.
    pub filename: Utf8PathBuf,
    pub target: Utf8PathBuf,
    pub root: Option<Utf8PathBuf>,
    pub relative_to: Utf8PathBuf,
    pub rebase: bool,
    pub rebase_to: Option<Utf8PathBuf>,
    pub source_map: SourceMapMode,
    pub source_map_inline_sources: bool,
    pub debug: bool,
    pub special_comments: SpecialComments,
    pub format: OutputFormat,
    pub optimize: bool,
    pub inline: Inline,
    pub extra: HashMap<String, String>,
    anchor: Utf8PathBuf,
}

impl EffectiveOptions {
    /// Merge `options` with the defaults `file` implies.
    ///
    /// - `target` defaults to the file's path.
    /// - `relative_to` defaults to the directory of `root` if set, else of the
    ///   file's path.
    /// - The rebase anchor is `rebase_to` if set, else an explicit
    ///   `relative_to`, else the directory of `target`.
    /// - A source map already on the file is copied in as
    ///   [`SourceMapMode::Inherit`].
    pub fn resolve(options: &Options, file: &VirtualFile) -> Self {
        let filename = paths::absolutize(&file.path);
        let target = match &options.target {
            Some(target) => paths::absolutize(Utf8Path::new(target)),
            None => filename.clone(),
        };
        let root = options
            .root
            .as_deref()
            .map(|root| paths::absolutize(Utf8Path::new(root)));
        let relative_to = match (&options.relative_to, &root) {
            (Some(relative_to), _) => paths::absolutize(Utf8Path::new(relative_to)),
            (None, Some(root)) => paths::dirname(root),
            (None, None) => paths::dirname(&filename),
        };
        let rebase_to = options
            .rebase_to
            .as_deref()
            .map(|dir| paths::absolutize(Utf8Path::new(dir)));
        let anchor = match (&rebase_to, &options.relative_to) {
            (Some(rebase_to), _) => rebase_to.clone(),
            (None, Some(_)) => relative_to.clone(),
            (None, None) => paths::dirname(&target),
        };
        let source_map = match (&file.source_map, options.source_map) {
            (Some(upstream), _) => SourceMapMode::Inherit(upstream.clone()),
            (None, true) => SourceMapMode::Generate,
            (None, false) => SourceMapMode::Disabled,
        };

        Self {
            filename,
            target,
            root,
            relative_to,
            rebase: options.rebase.unwrap_or(true),
            rebase_to,
            source_map,
            source_map_inline_sources: options.source_map_inline_sources,
            debug: options.debug,
            special_comments: options.special_comments,
            format: options.format,
            optimize: options.optimize.unwrap_or(true),
            inline: options.inline,
            extra: options.extra.clone(),
            anchor,
        }
    }

    /// Directory relative URLs are rewritten against when no `root` is set.
    pub fn rebase_anchor(&self) -> &Utf8Path {
        &self.anchor
    }
}
