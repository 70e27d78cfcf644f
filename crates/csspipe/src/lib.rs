//! # csspipe
//!
//! Minify CSS files as they flow through a build pipeline.
//!
//! A pipeline hands csspipe one [`VirtualFile`] at a time (a path, a base
//! directory, and the file's contents). csspipe runs the file's text through a
//! [`Minifier`] engine and hands the file back with minified contents and,
//! when requested, a source map merged into whatever map the file already
//! carried.
//!
//! - **Options**: [`Options`] are set once; every file gets its own
//!   [`EffectiveOptions`] with path-derived defaults (`target`, `relative_to`).
//! - **Contents**: files without contents pass through; streamed contents are
//!   rejected with `Streaming not supported!`.
//! - **Source maps**: engine maps are rewritten relative to the file's base and
//!   composed with upstream maps (see [`sourcemap::apply`]).
//! - **Details**: an optional callback sees stats, warnings and errors for
//!   every minified file.
//!
//! ## Example
//!
//! ```text
//! use csspipe::{CleanCss, Options};
//!
//! let clean = CleanCss::new(engine, Options::default())
//!     .on_details(|details| println!("{} saved {:.0}%", details.name, details.stats.efficiency * 100.0));
//!
//! let mut out = clean.pipe(files);
//! while let Some(result) = out.next().await {
//!     // Ok(file) goes downstream, Err(e) to the pipeline's error channel
//! }
//! ```

mod engine;
mod error;
mod file;
mod options;
pub mod paths;
pub mod sourcemap;
mod transform;

pub use engine::{BoxedMinifier, EngineFailure, Minified, Minifier, Stats};
pub use error::{SourceMapError, TransformError};
pub use file::{ContentStream, Contents, VirtualFile};
pub use options::{
    EffectiveOptions, Inline, Options, OutputFormat, SourceMapMode, SpecialComments,
};
pub use sourcemap::SourceMap;
pub use transform::{Batch, CleanCss, Details, DetailsCallback};
