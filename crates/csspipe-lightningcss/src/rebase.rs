//! Rewriting relative `url()` references.

use std::convert::Infallible;

use camino::Utf8Path;
use csspipe::paths;
use lightningcss::values::url::Url;
use lightningcss::visit_types;
use lightningcss::visitor::{VisitTypes, Visitor};

/// Where rebased URLs end up pointing from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Anchor<'a> {
    /// Root-relative: `/` + path below the root.
    Root(&'a Utf8Path),
    /// Relative to a directory.
    Dir(&'a Utf8Path),
}

/// Rewrites every relative URL of one stylesheet.
pub(crate) struct UrlRebaser<'a> {
    /// Directory of the file the stylesheet was read from.
    pub source_dir: &'a Utf8Path,
    pub anchor: Anchor<'a>,
}

impl<'i> Visitor<'i> for UrlRebaser<'_> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        if let Some(rebased) = rebase_url(&url.url, self.source_dir, self.anchor) {
            tracing::trace!(from = &*url.url, to = %rebased, "rebased url");
            url.url = rebased.into();
        }
        Ok(())
    }
}

/// Rebase `url`, written in a file under `source_dir`, onto `anchor`.
///
/// Returns `None` for references that are not relative paths: absolute and
/// protocol-relative paths, anything with a scheme (`data:`, `https:`) and
/// fragment-only references.
pub(crate) fn rebase_url(url: &str, source_dir: &Utf8Path, anchor: Anchor<'_>) -> Option<String> {
    if url.is_empty() || url.starts_with('/') || url.starts_with('#') || paths::has_scheme(url) {
        return None;
    }

    let (path, suffix) = match url.find(['?', '#']) {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    };
    let target = paths::normalize(&source_dir.join(path));

    let rebased = match anchor {
        Anchor::Root(root) => format!("/{}", paths::to_slash(&paths::relative(root, &target))),
        Anchor::Dir(dir) => paths::to_slash(&paths::relative(dir, &target)),
    };
    Some(format!("{rebased}{suffix}"))
}
