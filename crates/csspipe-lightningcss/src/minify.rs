//! One minification run: parse, rebase, inline, optimize, print.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use csspipe::{
    EffectiveOptions, EngineFailure, Minified, OutputFormat, SourceMap, SpecialComments, Stats,
    paths,
};
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::values::string::CowArcStr;
use lightningcss::visitor::Visit;
use parcel_sourcemap::SourceMap as ParcelSourceMap;

use crate::imports::{self, Source};
use crate::rebase::{Anchor, UrlRebaser};

/// Project root handed to parcel_sourcemap; sources are overwritten with
/// absolute paths afterwards.
const PROJECT_ROOT: &str = "/";

/// Minify `text`, the contents of `options.filename`.
///
/// Blocking: reads imported files and does all the CPU work on the calling
/// thread.
pub(crate) fn minify(text: String, options: &EffectiveOptions) -> Result<Minified, EngineFailure> {
    let started = Instant::now();
    let original_size = text.len();

    for key in options.extra.keys() {
        tracing::debug!(
            path = %options.filename,
            key = %key,
            "ignoring unknown engine setting"
        );
    }

    let sources = imports::collect(text, options)?;
    let mut warnings = sources.warnings.clone();

    let parse_warnings = Arc::new(RwLock::new(Vec::new()));
    let mut sheets = Vec::with_capacity(sources.files.len());
    for (index, source) in sources.files.iter().enumerate() {
        let parser_options = ParserOptions {
            filename: source.path.to_string(),
            source_index: index as u32,
            error_recovery: true,
            warnings: Some(parse_warnings.clone()),
            ..ParserOptions::default()
        };
        let mut sheet = StyleSheet::parse(&source.text, parser_options)
            .map_err(|e| EngineFailure::new(e.to_string()))?;

        if options.rebase {
            let source_dir = paths::dirname(&source.path);
            let mut rebaser = UrlRebaser {
                source_dir: &source_dir,
                anchor: match options.root.as_deref() {
                    Some(root) => Anchor::Root(root),
                    None => Anchor::Dir(options.rebase_anchor()),
                },
            };
            sheet.visit(&mut rebaser).unwrap_or_else(|never| match never {});
        }
        sheets.push(Some(sheet));
    }

    warnings.extend(
        parse_warnings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(ToString::to_string),
    );

    let mut splicer = Splicer {
        sheets,
        sources: &sources.files,
        license_comments: Vec::new(),
        warnings: Vec::new(),
    };
    let rules = splicer.splice(0);
    let Splicer {
        mut license_comments,
        warnings: splice_warnings,
        ..
    } = splicer;
    warnings.extend(splice_warnings);

    match options.special_comments {
        SpecialComments::All => {}
        SpecialComments::First => license_comments.truncate(1),
        SpecialComments::Remove => license_comments.clear(),
    }

    let mut sheet = StyleSheet::new(
        sources.files.iter().map(|source| source.path.to_string()).collect(),
        CssRuleList(rules),
        ParserOptions {
            filename: options.filename.to_string(),
            error_recovery: true,
            ..ParserOptions::default()
        },
    );
    sheet.license_comments = license_comments;

    if options.optimize {
        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| EngineFailure::new(e.to_string()))?;
    }

    let mut parcel_map = options.source_map.is_enabled().then(|| {
        let mut map = ParcelSourceMap::new(PROJECT_ROOT);
        for source in &sources.files {
            map.add_source(source.path.as_str());
        }
        map
    });

    let printed = sheet
        .to_css(PrinterOptions {
            minify: options.format == OutputFormat::Minified,
            source_map: parcel_map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| EngineFailure::new(e.to_string()))?;

    let source_map = match parcel_map {
        Some(mut map) => Some(finish_source_map(
            &mut map,
            &sources.files,
            options.source_map_inline_sources,
        )?),
        None => None,
    };

    let mut stats = Stats::new(original_size, printed.code.len());
    if options.debug {
        stats = stats.with_time_spent(started.elapsed());
    }

    tracing::debug!(
        path = %options.filename,
        sources = sources.files.len(),
        original_size,
        minified_size = stats.minified_size,
        warnings = warnings.len(),
        "minified"
    );

    let mut minified = Minified::new(printed.code, stats);
    minified.warnings = warnings;
    minified.source_map = source_map;
    Ok(minified)
}

/// Serialize the printer's map, listing sources by absolute path.
fn finish_source_map(
    map: &mut ParcelSourceMap,
    files: &[Source],
    inline_sources: bool,
) -> Result<SourceMap, EngineFailure> {
    let json = map
        .to_json(None)
        .map_err(|e| EngineFailure::new(format!("failed to write source map: {e:?}")))?;
    let mut source_map =
        SourceMap::from_json(&json).map_err(|e| EngineFailure::new(e.to_string()))?;

    source_map.source_root = None;
    source_map.sources = files.iter().map(|file| file.path.to_string()).collect();
    source_map.sources_content = if inline_sources {
        files.iter().map(|file| Some(file.text.clone())).collect()
    } else {
        Vec::new()
    };
    Ok(source_map)
}

/// Replaces inlinable `@import` rules with the rules of the sheets they
/// point at.
struct Splicer<'i, 's> {
    /// Parsed sheets by source index; taken once spliced.
    sheets: Vec<Option<StyleSheet<'i>>>,
    sources: &'s [Source],
    license_comments: Vec<CowArcStr<'i>>,
    warnings: Vec<String>,
}

impl<'i> Splicer<'i, '_> {
    fn splice(&mut self, index: usize) -> Vec<CssRule<'i>> {
        let Some(mut sheet) = self.sheets[index].take() else {
            return Vec::new();
        };
        self.license_comments.append(&mut sheet.license_comments);

        let sources = self.sources;
        let targets: &HashMap<String, usize> = &sources[index].imports;
        let mut rules = Vec::with_capacity(sheet.rules.0.len());
        for rule in std::mem::take(&mut sheet.rules.0) {
            let CssRule::Import(import) = rule else {
                rules.push(rule);
                continue;
            };
            let target = imports::inlinable(&import)
                .then(|| targets.get(&*import.url).copied())
                .flatten();
            let Some(target) = target else {
                rules.push(CssRule::Import(import));
                continue;
            };

            if self.sheets[target].is_none() {
                self.warnings.push(format!(
                    "Ignoring local @import of \"{}\" as it has already been imported.",
                    &*import.url
                ));
                continue;
            }

            let inlined = self.splice(target);
            if import.media.media_queries.is_empty() {
                rules.extend(inlined);
            } else {
                rules.push(CssRule::Media(MediaRule {
                    query: import.media,
                    rules: CssRuleList(inlined),
                    loc: import.loc,
                }));
            }
        }
        rules
    }
}
