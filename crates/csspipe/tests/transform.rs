//! Adapter behaviour against a scripted engine.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use csspipe::{
    CleanCss, Details, EffectiveOptions, EngineFailure, Minified, Minifier, Options, SourceMap,
    Stats, TransformError, VirtualFile,
};
use futures::{StreamExt, stream};

/// Strips whitespace and lowercases; fails on `@import`, warns on `!`.
#[derive(Default, Clone)]
struct ScriptedEngine {
    calls: Arc<AtomicUsize>,
}

impl Minifier for ScriptedEngine {
    fn minify<'a>(
        &'a self,
        text: String,
        options: &'a EffectiveOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Minified, EngineFailure>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if text.contains("@import") {
                return Err(EngineFailure::from(vec![
                    "Ignoring local @import of \"/nonexistent/file.css\" as resource is missing."
                        .to_string(),
                    "Giving up.".to_string(),
                ]));
            }

            let styles: String = text
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '!')
                .collect::<String>()
                .replace(";}", "}")
                .to_lowercase();

            let mut minified = Minified::new(styles.clone(), Stats::new(text.len(), styles.len()));
            if text.contains('!') {
                minified.warnings.push("Invalid character(s) '!'".to_string());
            }
            if options.source_map.is_enabled() {
                minified.source_map = Some(SourceMap {
                    version: 3,
                    file: None,
                    source_root: None,
                    sources: vec![options.filename.to_string()],
                    sources_content: Vec::new(),
                    names: Vec::new(),
                    mappings: "AAAA".to_string(),
                });
            }
            Ok(minified)
        })
    }
}

fn css(path: &str, contents: &str) -> VirtualFile {
    VirtualFile::new(path, "/x/").with_contents(contents)
}

fn contents(file: &VirtualFile) -> String {
    file.text().expect("buffered contents").into_owned()
}

#[tokio::test]
async fn test_replaces_contents() {
    let clean = CleanCss::new(ScriptedEngine::default(), Options::default());
    let file = clean
        .transform(css("/x/a.css", "p { color: RED; }"))
        .await
        .unwrap();
    assert_eq!(contents(&file), "p{color:red}");
    assert_eq!(file.path.as_str(), "/x/a.css");
    assert!(file.source_map.is_none());
}

#[tokio::test]
async fn test_absent_contents_pass_through_without_engine() {
    let engine = ScriptedEngine::default();
    let called = Arc::new(AtomicUsize::new(0));
    let seen = called.clone();
    let clean = CleanCss::new(engine.clone(), Options::default()).on_details(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let file = clean
        .transform(VirtualFile::new("/x/dir", "/x/"))
        .await
        .unwrap();
    assert!(file.is_absent());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert_eq!(called.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_contents_still_reach_the_engine() {
    let engine = ScriptedEngine::default();
    let clean = CleanCss::new(engine.clone(), Options::default());

    let batch = clean
        .run([css("/x/empty.css", ""), css("/x/blank.css", "  \n ")])
        .await;
    assert_eq!(batch.files.len(), 2);
    assert!(batch.errors.is_empty());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    assert!(batch.files.iter().all(|file| contents(file).is_empty()));
}

#[tokio::test]
async fn test_streams_are_rejected() {
    let engine = ScriptedEngine::default();
    let clean = CleanCss::new(engine.clone(), Options::default());
    let file = VirtualFile::new("/x/a.css", "/x/")
        .with_stream(stream::iter(vec![Ok::<_, std::io::Error>(b"a { }".to_vec())]));

    let err = clean.transform(file).await.unwrap_err();
    assert!(matches!(err, TransformError::StreamingNotSupported { .. }));
    assert_eq!(err.to_string(), "Streaming not supported!");
    assert_eq!(err.path().as_str(), "/x/a.css");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_engine_failure_joins_errors() {
    let clean = CleanCss::new(ScriptedEngine::default(), Options::default());
    let err = clean
        .transform(css("/x/broken.css", "@import url(/nonexistent/file.css);"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransformError::Engine { .. }));
    assert_eq!(err.path().as_str(), "/x/broken.css");
    assert_eq!(
        err.to_string(),
        "Ignoring local @import of \"/nonexistent/file.css\" as resource is missing. Giving up."
    );
}

#[tokio::test]
async fn test_details_shape() {
    let seen: Arc<Mutex<Vec<Details>>> = Arc::default();
    let sink = seen.clone();
    let clean = CleanCss::with_callback(ScriptedEngine::default(), move |details| {
        sink.lock().unwrap().push(details.clone());
    });

    clean
        .transform(css("/x/a.css", "p { color: red; }!"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let details = &seen[0];
    assert_eq!(details.path.as_str(), "/x/a.css");
    assert_eq!(details.name.as_str(), "a.css");
    assert_eq!(details.stats.original_size, 18);
    assert_eq!(details.stats.minified_size, 12);
    assert!(details.errors.is_empty());
    assert_eq!(details.warnings, vec!["Invalid character(s) '!'"]);
    assert!(details.source_map.is_none());
}

#[tokio::test]
async fn test_details_carry_source_map_only_when_requested() {
    let maps: Arc<Mutex<Vec<bool>>> = Arc::default();
    let sink = maps.clone();
    let clean = CleanCss::new(
        ScriptedEngine::default(),
        Options::default().with_source_map(true),
    )
    .on_details(move |details| sink.lock().unwrap().push(details.source_map.is_some()));

    let file = clean
        .transform(css("/x/css/a.css", "a { color: red; }"))
        .await
        .unwrap();

    assert_eq!(*maps.lock().unwrap(), vec![true]);
    let map = file.source_map.expect("reconciled map");
    assert_eq!(map.file.as_deref(), Some("css/a.css"));
    assert_eq!(map.sources, vec!["css/a.css"]);
}

#[tokio::test]
async fn test_callback_runs_before_the_file_is_emitted() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let sink = log.clone();
    let clean = CleanCss::with_callback(ScriptedEngine::default(), move |_| {
        sink.lock().unwrap().push("callback");
    });

    let mut out = std::pin::pin!(clean.pipe(stream::iter(vec![css("/x/a.css", "a{}")])));
    while let Some(result) = out.next().await {
        result.unwrap();
        log.lock().unwrap().push("emitted");
    }
    assert_eq!(*log.lock().unwrap(), vec!["callback", "emitted"]);
}

#[tokio::test]
async fn test_caller_options_are_never_mutated() {
    let options = Options::default()
        .with_root("/x")
        .with_source_map(true)
        .with_extra("level", "2");
    let before = options.clone();
    let clean = CleanCss::new(ScriptedEngine::default(), options);

    let upstream = SourceMap::empty("a.css");
    clean
        .run([
            css("/x/a.css", "a { color: red; }").with_source_map(upstream),
            css("/x/b.css", "b { color: blue; }"),
        ])
        .await;

    assert_eq!(clean.options(), &before);
}

#[tokio::test]
async fn test_failures_do_not_stop_other_files() {
    let clean = CleanCss::new(ScriptedEngine::default(), Options::default()).with_concurrency(2);
    let files = vec![
        css("/x/1.css", "a { color: red; }"),
        css("/x/2.css", "@import url(missing.css);"),
        css("/x/3.css", "b { color: blue; }"),
        VirtualFile::new("/x/4.css", "/x/").with_stream(stream::empty::<std::io::Result<Vec<u8>>>()),
        css("/x/5.css", "c { color: green; }"),
    ];

    let results: Vec<_> = clean.pipe(stream::iter(files)).collect().await;
    let order: Vec<(String, bool)> = results
        .iter()
        .map(|result| match result {
            Ok(file) => (file.path.to_string(), true),
            Err(err) => (err.path().to_string(), false),
        })
        .collect();

    assert_eq!(
        order,
        vec![
            ("/x/1.css".to_string(), true),
            ("/x/2.css".to_string(), false),
            ("/x/3.css".to_string(), true),
            ("/x/4.css".to_string(), false),
            ("/x/5.css".to_string(), true),
        ]
    );
}
