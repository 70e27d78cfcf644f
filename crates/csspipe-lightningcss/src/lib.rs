//! # csspipe-lightningcss
//!
//! A [`Minifier`] for csspipe built on lightningcss.
//!
//! Besides minifying, the engine inlines local `@import`s, rewrites relative
//! `url()` references for the file's new location, and prints a source map
//! covering every stylesheet that went into the output.
//!
//! ```rust,ignore
//! use csspipe::Options;
//!
//! let clean = csspipe_lightningcss::clean_css(Options::default().with_root("public/"));
//! let batch = clean.run(files).await;
//! ```

use std::future::Future;
use std::pin::Pin;

use csspipe::{CleanCss, Details, EffectiveOptions, EngineFailure, Minified, Minifier, Options};

mod imports;
mod minify;
mod rebase;

/// lightningcss-backed engine.
///
/// Each run happens on tokio's blocking pool, so a runtime must be running.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningEngine;

impl Minifier for LightningEngine {
    fn minify<'a>(
        &'a self,
        text: String,
        options: &'a EffectiveOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Minified, EngineFailure>> + Send + 'a>> {
        Box::pin(async move {
            let options = options.clone();
            tokio::task::spawn_blocking(move || minify::minify(text, &options))
                .await
                .map_err(|e| EngineFailure::new(format!("minifier task failed: {e}")))?
        })
    }
}

/// An adapter using [`LightningEngine`] with `options`.
pub fn clean_css(options: Options) -> CleanCss {
    CleanCss::new(LightningEngine, options)
}

/// An adapter using [`LightningEngine`] with default options, reporting every
/// file to `callback`.
pub fn clean_css_with_callback(callback: impl Fn(&Details) + Send + Sync + 'static) -> CleanCss {
    CleanCss::with_callback(LightningEngine, callback)
}
