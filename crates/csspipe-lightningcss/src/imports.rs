//! Finding and reading the local stylesheets an entry file `@import`s.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use csspipe::{EffectiveOptions, EngineFailure, Inline, paths};
use lightningcss::rules::CssRule;
use lightningcss::rules::import::ImportRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

/// One stylesheet taking part in a minification run.
#[derive(Debug)]
pub(crate) struct Source {
    pub path: Utf8PathBuf,
    pub text: String,
    /// `@import` url -> index of the source it inlines.
    pub imports: HashMap<String, usize>,
}

/// The entry stylesheet (index 0) and everything it transitively imports.
#[derive(Debug)]
pub(crate) struct Sources {
    pub files: Vec<Source>,
    pub warnings: Vec<String>,
}

/// Whether an `@import` may be replaced by the rules it points at.
///
/// Imports scoped to a cascade layer or a `supports()` condition stay as
/// they are; media conditions are kept by wrapping the inlined rules.
pub(crate) fn inlinable(import: &ImportRule<'_>) -> bool {
    import.layer.is_none() && import.supports.is_none()
}

pub(crate) fn is_remote(url: &str) -> bool {
    url.starts_with("//") || paths::has_scheme(url)
}

/// Collect `text` (read from `options.filename`) and the local files it
/// imports.
///
/// Remote imports are reported as warnings and left to the output. Missing
/// local files are fatal; every missing import is listed in the failure.
pub(crate) fn collect(text: String, options: &EffectiveOptions) -> Result<Sources, EngineFailure> {
    let mut sources = Sources {
        files: vec![Source {
            path: options.filename.clone(),
            text,
            imports: HashMap::new(),
        }],
        warnings: Vec::new(),
    };
    if options.inline == Inline::Never {
        return Ok(sources);
    }

    let mut errors = Vec::new();
    let mut index = 0;
    while index < sources.files.len() {
        let source = &sources.files[index];
        let dir = paths::dirname(&source.path);
        let urls = import_urls(&source.text, &source.path);

        for url in urls {
            if is_remote(&url) {
                sources
                    .warnings
                    .push(format!("Skipping remote @import of \"{url}\" as no callback given."));
                continue;
            }

            let path = resolve(&url, &dir, options.root.as_deref());
            let known = sources.files.iter().position(|file| file.path == path);
            let target = match known {
                Some(target) => target,
                None => match fs_err::read_to_string(&path) {
                    Ok(text) => {
                        tracing::trace!(%url, %path, "inlining import");
                        sources.files.push(Source {
                            path,
                            text,
                            imports: HashMap::new(),
                        });
                        sources.files.len() - 1
                    }
                    Err(e) => {
                        tracing::debug!(%url, %path, error = %e, "import not readable");
                        errors.push(format!(
                            "Ignoring local @import of \"{url}\" as resource is missing."
                        ));
                        continue;
                    }
                },
            };
            sources.files[index].imports.insert(url, target);
        }
        index += 1;
    }

    if errors.is_empty() {
        Ok(sources)
    } else {
        Err(EngineFailure::from(errors))
    }
}

/// Urls of the inlinable `@import` rules at the top level of `text`.
fn import_urls(text: &str, path: &Utf8Path) -> Vec<String> {
    let parser_options = ParserOptions {
        filename: path.to_string(),
        error_recovery: true,
        ..ParserOptions::default()
    };
    // unparseable sheets are reported when the engine parses them for real
    let Ok(sheet) = StyleSheet::parse(text, parser_options) else {
        return Vec::new();
    };

    sheet
        .rules
        .0
        .iter()
        .filter_map(|rule| match rule {
            CssRule::Import(import) if inlinable(import) => Some(String::from(&*import.url)),
            _ => None,
        })
        .collect()
}

/// Filesystem path an `@import` url written in `dir` points at.
///
/// Root-relative urls resolve against `root` when one is configured.
fn resolve(url: &str, dir: &Utf8Path, root: Option<&Utf8Path>) -> Utf8PathBuf {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match (path.strip_prefix('/'), root) {
        (Some(below_root), Some(root)) => paths::normalize(&root.join(below_root)),
        (Some(_), None) => paths::normalize(Utf8Path::new(path)),
        (None, _) => paths::normalize(&dir.join(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csspipe::{Options, VirtualFile};

    fn options_for(path: &Utf8Path, options: Options) -> EffectiveOptions {
        let file = VirtualFile::new(path, paths::dirname(path)).with_contents("");
        EffectiveOptions::resolve(&options, &file)
    }

    fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().canonicalize().unwrap()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_resolve() {
        let dir = Utf8Path::new("/x/css");
        assert_eq!(resolve("a.css", dir, None).as_str(), "/x/css/a.css");
        assert_eq!(resolve("../a.css?v=1", dir, None).as_str(), "/x/a.css");
        assert_eq!(resolve("/lib/a.css", dir, None).as_str(), "/lib/a.css");
        assert_eq!(
            resolve("/lib/a.css", dir, Some(Utf8Path::new("/x/public"))).as_str(),
            "/x/public/lib/a.css"
        );
    }

    #[test]
    fn test_collects_nested_imports() {
        let (_guard, dir) = tempdir();
        fs_err::create_dir_all(dir.join("partials")).unwrap();
        fs_err::write(dir.join("partials/a.css"), "@import 'b.css'; .a { color: red }").unwrap();
        fs_err::write(dir.join("partials/b.css"), ".b { color: blue }").unwrap();

        let entry = dir.join("main.css");
        let options = options_for(&entry, Options::default());
        let sources = collect("@import url(partials/a.css); .main {}".to_string(), &options).unwrap();

        let names: Vec<_> = sources
            .files
            .iter()
            .map(|file| paths::relative(&dir, &file.path).to_string())
            .collect();
        assert_eq!(names, vec!["main.css", "partials/a.css", "partials/b.css"]);
        assert_eq!(sources.files[0].imports.get("partials/a.css"), Some(&1));
        assert_eq!(sources.files[1].imports.get("b.css"), Some(&2));
        assert!(sources.warnings.is_empty());
    }

    #[test]
    fn test_cycles_point_back_at_known_files() {
        let (_guard, dir) = tempdir();
        fs_err::write(dir.join("a.css"), "@import 'main.css'; .a {}").unwrap();

        let entry = dir.join("main.css");
        let options = options_for(&entry, Options::default());
        let sources = collect("@import 'a.css';".to_string(), &options).unwrap();

        assert_eq!(sources.files.len(), 2);
        assert_eq!(sources.files[1].imports.get("main.css"), Some(&0));
    }

    #[test]
    fn test_missing_import_fails() {
        let (_guard, dir) = tempdir();
        let options = options_for(&dir.join("main.css"), Options::default());

        let failure = collect(
            "@import url(/nonexistent/file.css); @import 'gone.css';".to_string(),
            &options,
        )
        .unwrap_err();
        assert_eq!(
            failure.errors,
            vec![
                "Ignoring local @import of \"/nonexistent/file.css\" as resource is missing.",
                "Ignoring local @import of \"gone.css\" as resource is missing.",
            ]
        );
    }

    #[test]
    fn test_remote_imports_warn() {
        let (_guard, dir) = tempdir();
        let options = options_for(&dir.join("main.css"), Options::default());

        let sources = collect(
            "@import url(https://fonts.example.com/a.css); a { color: red }".to_string(),
            &options,
        )
        .unwrap();
        assert_eq!(sources.files.len(), 1);
        assert_eq!(
            sources.warnings,
            vec!["Skipping remote @import of \"https://fonts.example.com/a.css\" as no callback given."]
        );
    }

    #[test]
    fn test_inline_never_reads_nothing() {
        let (_guard, dir) = tempdir();
        let options = options_for(
            &dir.join("main.css"),
            Options::default().with_inline(Inline::Never),
        );

        let sources = collect("@import 'gone.css';".to_string(), &options).unwrap();
        assert_eq!(sources.files.len(), 1);
        assert!(sources.files[0].imports.is_empty());
    }
}
