//! In-memory files flowing through a build pipeline.

use std::borrow::Cow;
use std::fmt;
use std::io;

use camino::Utf8PathBuf;
use futures::Stream;
use futures::stream::BoxStream;

use crate::paths;
use crate::sourcemap::SourceMap;

/// A live, chunked content stream.
pub type ContentStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// What a [`VirtualFile`] holds: nothing, a buffer, or a stream.
#[derive(Default)]
pub enum Contents {
    /// No content at all (directories, placeholder entries).
    #[default]
    Absent,
    /// Fully buffered bytes.
    Bytes(Vec<u8>),
    /// Content still being produced. Never minified: CSS needs the whole
    /// stylesheet before it can be parsed.
    Stream(ContentStream),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Absent => f.write_str("Absent"),
            Contents::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Contents::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A pipeline's in-memory representation of a file.
#[derive(Debug)]
pub struct VirtualFile {
    /// Full path of the file.
    pub path: Utf8PathBuf,
    /// Base directory the file's relative name is computed from.
    pub base: Utf8PathBuf,
    /// The file's contents.
    pub contents: Contents,
    /// Source map accumulated by earlier pipeline steps, if any.
    pub source_map: Option<SourceMap>,
}

impl VirtualFile {
    /// Create a file with no contents.
    pub fn new(path: impl Into<Utf8PathBuf>, base: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Contents::Absent,
            source_map: None,
        }
    }

    /// Set buffered contents.
    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = Contents::Bytes(contents.into());
        self
    }

    /// Set streamed contents.
    pub fn with_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        self.contents = Contents::Stream(Box::pin(stream));
        self
    }

    /// Attach an upstream source map.
    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.contents, Contents::Absent)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    /// Buffered contents decoded as UTF-8, if the file is buffered.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match &self.contents {
            Contents::Bytes(bytes) => Some(String::from_utf8_lossy(bytes)),
            _ => None,
        }
    }

    /// Path relative to `base`.
    ///
    /// `/x/css/a.css` with base `/x/` is `css/a.css`. Paths outside the base
    /// come out with leading `..` components.
    pub fn relative(&self) -> Utf8PathBuf {
        if let Ok(stripped) = self.path.strip_prefix(&self.base) {
            return stripped.to_path_buf();
        }
        let base = paths::absolutize(&self.base);
        paths::relative(&base, &paths::absolutize(&self.path))
    }

    /// Directory containing the file.
    pub fn dirname(&self) -> Utf8PathBuf {
        paths::dirname(&self.path)
    }
}
