//! Source maps in the pipeline's v3 JSON shape, and merging engine output
//! into the maps files already carry.

use camino::Utf8Path;
use facet::Facet;
use parcel_sourcemap::{OriginalLocation, SourceMap as ParcelSourceMap};

use crate::error::SourceMapError;
use crate::file::VirtualFile;
use crate::paths;

/// Project root handed to parcel_sourcemap; sources are rewritten by us.
const PROJECT_ROOT: &str = "/";

/// A revision 3 source map.
#[derive(Debug, Clone, PartialEq, Facet)]
#[facet(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,

    /// Generated file this map describes.
    #[facet(default, skip_serializing_if = Option::is_none)]
    pub file: Option<String>,

    #[facet(default, skip_serializing_if = Option::is_none)]
    pub source_root: Option<String>,

    /// Original sources, referenced by index from `mappings`.
    #[facet(default)]
    pub sources: Vec<String>,

    /// Inlined source text, parallel to `sources`.
    #[facet(default)]
    pub sources_content: Vec<Option<String>>,

    #[facet(default)]
    pub names: Vec<String>,

    /// Base64 VLQ encoded mappings.
    #[facet(default)]
    pub mappings: String,
}

impl SourceMap {
    /// An empty map for `file`, the shape a pipeline initialises before any
    /// transform has produced mappings.
    pub fn empty(file: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            version: 3,
            sources: vec![file.clone()],
            file: Some(file),
            source_root: None,
            sources_content: Vec::new(),
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        facet_json::from_str(json).map_err(|e| SourceMapError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SourceMapError> {
        facet_json::to_string(self).map_err(|e| SourceMapError::Json(e.to_string()))
    }

    /// Whether any position is mapped yet.
    pub fn has_mappings(&self) -> bool {
        !self.mappings.is_empty()
    }

    fn to_parcel(&self) -> Result<ParcelSourceMap, SourceMapError> {
        let json = self.to_json()?;
        ParcelSourceMap::from_json(PROJECT_ROOT, &json)
            .map_err(|e| SourceMapError::Compose(format!("{e:?}")))
    }

    fn from_parcel(map: &mut ParcelSourceMap) -> Result<Self, SourceMapError> {
        let json = map
            .to_json(None)
            .map_err(|e| SourceMapError::Compose(format!("{e:?}")))?;
        Self::from_json(&json)
    }
}

/// Merge a map produced for `file`'s new contents into `file.source_map`.
///
/// The map's `file` becomes the file's base-relative name and its sources are
/// made relative to `base`. When the file already carries mappings from an
/// earlier step the two maps are composed so positions in the file's previous
/// contents point at the earliest originals; otherwise the new map replaces
/// whatever was there.
pub fn apply(file: &mut VirtualFile, mut generated: SourceMap) -> Result<(), SourceMapError> {
    let base = paths::absolutize(&file.base);
    generated.file = Some(paths::to_slash(&file.relative()));
    generated.sources = generated
        .sources
        .iter()
        .map(|source| relative_source(&base, source))
        .collect();

    let merged = match &file.source_map {
        Some(upstream) if upstream.has_mappings() => {
            tracing::trace!(path = %file.path, "composing with upstream source map");
            compose(&generated, upstream)?
        }
        _ => generated,
    };
    file.source_map = Some(merged);
    Ok(())
}

/// Compose `generated` (new output -> intermediate) with `upstream`
/// (intermediate -> originals).
///
/// Only mappings into the intermediate file (`upstream.file`, or the file's
/// own name when the upstream map does not say) are traced through
/// `upstream`. Mappings into other sources, such as inlined imports, keep
/// pointing where they did. A position `upstream` has no mapping for stays
/// on the intermediate file.
fn compose(generated: &SourceMap, upstream: &SourceMap) -> Result<SourceMap, SourceMapError> {
    let intermediate = upstream
        .file
        .as_deref()
        .or(generated.file.as_deref())
        .map(|name| paths::normalize(Utf8Path::new(name)));
    let intermediate = generated
        .sources
        .iter()
        .position(|source| Some(paths::normalize(Utf8Path::new(source))) == intermediate);
    let Some(intermediate) = intermediate else {
        tracing::trace!("upstream source map describes none of the generated sources");
        return Ok(generated.clone());
    };

    let generated_map = generated.to_parcel()?;
    let mut upstream_map = upstream.to_parcel()?;

    let mut composed_map = ParcelSourceMap::new(PROJECT_ROOT);
    let mut sources = Interner::default();
    let mut names = Interner::default();

    for mapping in generated_map.get_mappings() {
        let Some(original) = mapping.original else {
            composed_map.add_mapping(mapping.generated_line, mapping.generated_column, None);
            continue;
        };

        let traced = (original.source as usize == intermediate)
            .then(|| {
                upstream_map.find_closest_mapping(original.original_line, original.original_column)
            })
            .flatten()
            .and_then(|found| found.original);

        let location = match traced {
            Some(traced) => OriginalLocation {
                original_line: traced.original_line,
                original_column: traced.original_column,
                source: sources.intern(upstream, traced.source),
                name: traced
                    .name
                    .and_then(|name| names.intern_name(upstream, name)),
            },
            None => OriginalLocation {
                original_line: original.original_line,
                original_column: original.original_column,
                source: sources.intern(generated, original.source),
                name: original
                    .name
                    .and_then(|name| names.intern_name(generated, name)),
            },
        };
        composed_map.add_mapping(
            mapping.generated_line,
            mapping.generated_column,
            Some(location),
        );
    }

    for source in &sources.entries {
        composed_map.add_source(source);
    }
    for name in &names.entries {
        composed_map.add_name(name);
    }

    let mut composed = SourceMap::from_parcel(&mut composed_map)?;
    composed.file = generated.file.clone();
    composed.source_root = None;
    composed.sources = sources.entries;
    composed.sources_content = if sources.content.iter().any(Option::is_some) {
        sources.content
    } else {
        Vec::new()
    };
    composed.names = names.entries;
    Ok(composed)
}

/// Sources (or names) of the composed map, in first-use order.
#[derive(Default)]
struct Interner {
    entries: Vec<String>,
    content: Vec<Option<String>>,
}

impl Interner {
    /// Index in the composed map of source `index` of `map`.
    fn intern(&mut self, map: &SourceMap, index: u32) -> u32 {
        let index = index as usize;
        let source = map.sources.get(index).cloned().unwrap_or_default();
        if let Some(existing) = self.entries.iter().position(|entry| *entry == source) {
            return existing as u32;
        }
        self.entries.push(source);
        self.content
            .push(map.sources_content.get(index).cloned().flatten());
        (self.entries.len() - 1) as u32
    }

    fn intern_name(&mut self, map: &SourceMap, index: u32) -> Option<u32> {
        let name = map.names.get(index as usize)?;
        if let Some(existing) = self.entries.iter().position(|entry| entry == name) {
            return Some(existing as u32);
        }
        self.entries.push(name.clone());
        Some((self.entries.len() - 1) as u32)
    }
}

fn relative_source(base: &Utf8Path, source: &str) -> String {
    if paths::has_scheme(source) {
        return source.to_string();
    }
    let absolute = paths::absolutize(Utf8Path::new(source));
    paths::to_slash(&paths::relative(base, &absolute))
}
