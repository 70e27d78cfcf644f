//! The seam between the pipeline adapter and a CSS minification engine.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::options::EffectiveOptions;
use crate::sourcemap::SourceMap;

/// A CSS minification engine.
///
/// The adapter calls [`Minifier::minify`] exactly once per buffered file,
/// with that file's text and its [`EffectiveOptions`].
///
/// # Example
///
/// ```rust,ignore
/// use csspipe::{EffectiveOptions, EngineFailure, Minified, Minifier, Stats};
///
/// struct Passthrough;
///
/// impl Minifier for Passthrough {
///     fn minify<'a>(
///         &'a self,
///         text: String,
///         _options: &'a EffectiveOptions,
///     ) -> Pin<Box<dyn Future<Output = Result<Minified, EngineFailure>> + Send + 'a>> {
///         Box::pin(async move {
///             let stats = Stats::new(text.len(), text.len());
///             Ok(Minified::new(text, stats))
///         })
///     }
/// }
/// ```
pub trait Minifier: Send + Sync {
    /// Minify `text`.
    ///
    /// Returning `Err` is fatal for the file. Recoverable problems belong in
    /// [`Minified::warnings`] (or [`Minified::errors`]) of a successful result.
    fn minify<'a>(
        &'a self,
        text: String,
        options: &'a EffectiveOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Minified, EngineFailure>> + Send + 'a>>;
}

/// Type alias for a shared engine.
pub type BoxedMinifier = Arc<dyn Minifier>;

/// Output of a successful engine run.
#[derive(Debug, Clone)]
pub struct Minified {
    /// Minified stylesheet text.
    pub styles: String,
    pub stats: Stats,
    /// Non-fatal issues, e.g. malformed rules that were skipped.
    pub warnings: Vec<String>,
    /// Issues the engine recorded without failing the run.
    pub errors: Vec<String>,
    /// Map from `styles` back to the engine's inputs, when one was requested.
    pub source_map: Option<SourceMap>,
}

impl Minified {
    pub fn new(styles: String, stats: Stats) -> Self {
        Self {
            styles,
            stats,
            warnings: Vec::new(),
            errors: Vec::new(),
            source_map: None,
        }
    }
}

/// Size figures for one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Input size in bytes.
    pub original_size: usize,
    /// Output size in bytes.
    pub minified_size: usize,
    /// Fraction of the input saved, `1 - minified / original`.
    pub efficiency: f64,
    /// Wall time of the run; only measured in debug mode.
    pub time_spent: Option<Duration>,
}

impl Stats {
    pub fn new(original_size: usize, minified_size: usize) -> Self {
        let efficiency = if original_size == 0 {
            0.0
        } else {
            1.0 - minified_size as f64 / original_size as f64
        };
        Self {
            original_size,
            minified_size,
            efficiency,
            time_spent: None,
        }
    }

    pub fn with_time_spent(mut self, time_spent: Duration) -> Self {
        self.time_spent = Some(time_spent);
        self
    }
}

/// Fatal engine errors for one file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", .errors.join(" "))]
pub struct EngineFailure {
    pub errors: Vec<String>,
}

impl EngineFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    /// All errors joined with single spaces.
    pub fn message(&self) -> String {
        self.errors.join(" ")
    }
}

impl From<Vec<String>> for EngineFailure {
    fn from(errors: Vec<String>) -> Self {
        Self { errors }
    }
}
