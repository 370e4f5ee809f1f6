use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Failure to retrieve a single URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },

    #[error("could not decompress {url}: {source}")]
    Decompress {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decompress { url, .. } => url,
        }
    }
}

/// Why a sitemap body could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("not well-formed XML: {0}")]
    Malformed(String),

    #[error("unsupported namespace {}", .0.as_deref().unwrap_or("(none)"))]
    UnsupportedNamespace(Option<String>),
}

/// Failure to walk one sitemap document. Fatal for the root sitemap,
/// recorded and skipped for nested ones.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url}: {source}")]
    Document {
        url: String,
        #[source]
        source: ParseError,
    },
}

/// A `<url>` or `<sitemap>` element lacking its `<loc>` child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub element: &'static str,
    pub document: String,
}

impl fmt::Display for MalformedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped a <{}> element without <loc> in {}",
            self.element, self.document
        )
    }
}

/// A nested sitemap that points back at itself or at one of the sitemaps
/// it is nested in. It is skipped instead of being walked again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipped {url} listed in {parent}: it is already being walked (sitemap cycle)")]
pub struct SitemapCycle {
    pub url: String,
    pub parent: String,
}

/// Invalid answer to the selection prompt.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Invalid input. Please enter a number.")]
    NotANumber(String),

    #[error("Invalid selection. Choose a number between 1 and {max}.")]
    OutOfRange { selected: usize, max: usize },

    #[error("could not read from the terminal: {0}")]
    Io(#[from] std::io::Error),
}
