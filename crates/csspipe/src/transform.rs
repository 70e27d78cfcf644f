//! The file transform: one engine call per buffered CSS file.

use std::sync::Arc;

use camino::Utf8PathBuf;
use futures::{Stream, StreamExt, stream};

use crate::engine::{BoxedMinifier, Minified, Minifier, Stats};
use crate::error::TransformError;
use crate::file::{Contents, VirtualFile};
use crate::options::{EffectiveOptions, Options};
use crate::sourcemap::{self, SourceMap};

/// Transforms in flight at once when driving a stream.
const DEFAULT_CONCURRENCY: usize = 8;

/// What the details callback receives for every successfully minified file.
#[derive(Debug, Clone)]
pub struct Details {
    pub stats: Stats,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Full path of the file.
    pub path: Utf8PathBuf,
    /// Path relative to the file's base.
    pub name: Utf8PathBuf,
    /// The engine's raw map; only present when one was generated.
    pub source_map: Option<SourceMap>,
}

/// Callback invoked with [`Details`] before a file is handed downstream.
pub type DetailsCallback = Arc<dyn Fn(&Details) + Send + Sync>;

/// Files and errors collected from a whole batch.
#[derive(Debug, Default)]
pub struct Batch {
    pub files: Vec<VirtualFile>,
    pub errors: Vec<TransformError>,
}

/// Minifies CSS files flowing through a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let clean = CleanCss::new(engine, Options::default().with_source_map(true))
///     .on_details(|details| println!("{}: {} bytes", details.name, details.stats.minified_size));
///
/// let minified = clean.transform(file).await?;
/// ```
pub struct CleanCss {
    options: Options,
    engine: BoxedMinifier,
    callback: Option<DetailsCallback>,
    concurrency: usize,
}

impl CleanCss {
    /// Create an adapter with explicit options and no callback.
    pub fn new(engine: impl Minifier + 'static, options: Options) -> Self {
        Self {
            options,
            engine: Arc::new(engine),
            callback: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Create an adapter with default options that reports every file to
    /// `callback`.
    pub fn with_callback(
        engine: impl Minifier + 'static,
        callback: impl Fn(&Details) + Send + Sync + 'static,
    ) -> Self {
        Self::new(engine, Options::default()).on_details(callback)
    }

    /// Report every successfully minified file to `callback`.
    pub fn on_details(mut self, callback: impl Fn(&Details) + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Limit how many files [`CleanCss::pipe`] minifies at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Transform a single file.
    ///
    /// Files without contents pass through untouched, without an engine call
    /// or a callback. Streamed files are rejected. Everything else is handed
    /// to the engine once; on success the file comes back with minified
    /// contents and, if the engine produced one, a reconciled source map.
    pub async fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, TransformError> {
        let text = match &file.contents {
            Contents::Absent => {
                tracing::trace!(path = %file.path, "no contents, passing through");
                return Ok(file);
            }
            Contents::Stream(_) => {
                tracing::debug!(path = %file.path, "rejecting streamed contents");
                return Err(TransformError::StreamingNotSupported { path: file.path });
            }
            Contents::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        };

        let options = EffectiveOptions::resolve(&self.options, &file);
        tracing::debug!(
            path = %file.path,
            target = %options.target,
            source_map = options.source_map.is_enabled(),
            "minifying"
        );

        let Minified {
            styles,
            stats,
            warnings,
            errors,
            source_map,
        } = self
            .engine
            .minify(text, &options)
            .await
            .map_err(|failure| TransformError::Engine {
                path: file.path.clone(),
                message: failure.message(),
            })?;

        for warning in &warnings {
            tracing::debug!(path = %file.path, %warning, "engine warning");
        }

        if let Some(map) = &source_map {
            sourcemap::apply(&mut file, map.clone()).map_err(|source| {
                TransformError::SourceMap {
                    path: file.path.clone(),
                    source,
                }
            })?;
        }

        if let Some(callback) = &self.callback {
            let details = Details {
                stats,
                errors,
                warnings,
                path: file.path.clone(),
                name: file.relative(),
                source_map,
            };
            callback(&details);
        }

        file.contents = Contents::Bytes(styles.into_bytes());
        Ok(file)
    }

    /// Transform a stream of files.
    ///
    /// Up to the configured concurrency limit of files are minified at once;
    /// results come out in input order. Dropping the returned stream drops
    /// every transform still in flight.
    pub fn pipe<'a, S>(
        &'a self,
        files: S,
    ) -> impl Stream<Item = Result<VirtualFile, TransformError>> + Send + 'a
    where
        S: Stream<Item = VirtualFile> + Send + 'a,
    {
        files
            .map(move |file| self.transform(file))
            .buffered(self.concurrency)
    }

    /// Transform every file in `files`, collecting successes and failures.
    pub async fn run(&self, files: impl IntoIterator<Item = VirtualFile>) -> Batch {
        let files: Vec<VirtualFile> = files.into_iter().collect();
        let total = files.len();

        let mut batch = Batch::default();
        let mut results = std::pin::pin!(self.pipe(stream::iter(files)));
        while let Some(result) = results.next().await {
            match result {
                Ok(file) => batch.files.push(file),
                Err(err) => {
                    tracing::warn!(path = %err.path(), "{err}");
                    batch.errors.push(err);
                }
            }
        }

        tracing::info!(
            total,
            minified = batch.files.len(),
            failed = batch.errors.len(),
            "csspipe batch done"
        );
        batch
    }
}
