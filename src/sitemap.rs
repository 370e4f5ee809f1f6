use crate::error::{MalformedEntry, ParseError, SitemapCycle, WalkError};
use crate::network::Fetcher;
use crate::options::WalkOptions;
use crate::results::{ResultSet, SitemapEntry};
use crate::title::TitleResolver;
use crate::utils;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use indicatif::{ProgressBar, ProgressStyle};
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace as XmlNamespace, ResolveResult};
use std::fmt;
use std::sync::Arc;

// region: Structs & Enums
/// The sitemap protocol dialects that are understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `http://www.sitemaps.org/schemas/sitemap/0.9`
    Sitemaps09,
    /// `http://www.google.com/schemas/sitemap/0.84`
    Google084,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Sitemaps09, Namespace::Google084];

    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Sitemaps09 => "http://www.sitemaps.org/schemas/sitemap/0.9",
            Namespace::Google084 => "http://www.google.com/schemas/sitemap/0.84",
        }
    }

    pub fn from_uri(uri: &[u8]) -> Option<Namespace> {
        Self::ALL.into_iter().find(|ns| ns.uri().as_bytes() == uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapType {
    SitemapIndex,
    UrlSet,
    Unknown,
}

impl fmt::Display for SitemapType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A `<url>` element: its page location and optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlElement {
    pub loc: String,
    pub name: Option<String>,
}

/// One parsed sitemap XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    pub namespace: Namespace,
    pub sitemap_type: SitemapType,
    /// `<url>` entries, in document order.
    pub urls: Vec<UrlElement>,
    /// `<loc>` of every `<sitemap>` entry, in document order.
    pub sitemaps: Vec<String>,
    /// Names of elements skipped for lacking a `<loc>`.
    pub malformed: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Url,
    Sitemap,
}

impl EntryKind {
    fn element(self) -> &'static str {
        match self {
            EntryKind::Url => "url",
            EntryKind::Sitemap => "sitemap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Name,
}

#[derive(Debug)]
struct PendingEntry {
    kind: EntryKind,
    loc: Option<String>,
    name: Option<String>,
}
// endregion

// region: Parsing
/// Collects `<url>` and `<sitemap>` entries while the reader walks the tree.
#[derive(Debug)]
struct Collector {
    pending: Option<PendingEntry>,
    field: Option<Field>,
    text: String,
    urls: Vec<UrlElement>,
    sitemaps: Vec<String>,
    malformed: Vec<&'static str>,
}

impl Collector {
    fn new() -> Self {
        Self {
            pending: None,
            field: None,
            text: String::new(),
            urls: Vec::new(),
            sitemaps: Vec::new(),
            malformed: Vec::new(),
        }
    }

    fn open(&mut self, local_name: &[u8]) {
        match (local_name, &self.pending, self.field) {
            (b"url", None, _) => self.start_entry(EntryKind::Url),
            (b"sitemap", None, _) => self.start_entry(EntryKind::Sitemap),
            (b"loc", Some(_), None) => self.start_field(Field::Loc),
            (b"name", Some(_), None) => self.start_field(Field::Name),
            _ => {}
        }
    }

    fn close(&mut self, local_name: &[u8]) {
        match (local_name, self.field) {
            (b"loc", Some(Field::Loc)) | (b"name", Some(Field::Name)) => self.finish_field(),
            (b"url", None) | (b"sitemap", None) => self.finish_entry(local_name),
            _ => {}
        }
    }

    fn collecting(&self) -> bool {
        self.field.is_some()
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn start_entry(&mut self, kind: EntryKind) {
        self.pending = Some(PendingEntry {
            kind,
            loc: None,
            name: None,
        });
    }

    fn start_field(&mut self, field: Field) {
        self.field = Some(field);
        self.text.clear();
    }

    fn finish_field(&mut self) {
        let value = self.text.trim();
        if let (Some(field), Some(pending)) = (self.field.take(), self.pending.as_mut()) {
            let slot = match field {
                Field::Loc => &mut pending.loc,
                Field::Name => &mut pending.name,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.to_string());
            }
        }
    }

    fn finish_entry(&mut self, local_name: &[u8]) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.kind.element().as_bytes() != local_name {
            // A stray `</sitemap>` inside `<url>` or the reverse.
            self.pending = Some(pending);
            return;
        }
        match (pending.kind, pending.loc) {
            (EntryKind::Url, Some(loc)) => self.urls.push(UrlElement {
                loc,
                name: pending.name,
            }),
            (EntryKind::Sitemap, Some(loc)) => self.sitemaps.push(loc),
            (kind, None) => self.malformed.push(kind.element()),
        }
    }
}

fn malformed(e: impl fmt::Display) -> ParseError {
    ParseError::Malformed(e.to_string())
}

fn identify_sitemap_type(local_name: &[u8]) -> SitemapType {
    match local_name {
        b"sitemapindex" => SitemapType::SitemapIndex,
        b"urlset" => SitemapType::UrlSet,
        _ => SitemapType::Unknown,
    }
}

/// Parses a sitemap XML document.
///
/// The root element's namespace selects the dialect. `<url>` and `<sitemap>`
/// elements are collected at any depth, as long as they belong to that
/// namespace. Entries without a `<loc>` are skipped and listed in
/// [`SitemapDocument::malformed`].
///
/// # Errors
///
/// - [`ParseError::Malformed`] if the input is not a single well-formed XML
///   element tree.
/// - [`ParseError::UnsupportedNamespace`] if the root element is not in one
///   of the [`Namespace`] dialects.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, ParseError> {
    let mut reader = NsReader::from_str(xml);
    let mut root: Option<(Namespace, SitemapType)> = None;
    let mut depth: usize = 0;
    let mut collector = Collector::new();

    loop {
        let (resolved, event) = reader.read_resolved_event().map_err(malformed)?;
        let in_namespace = match (&resolved, root) {
            (ResolveResult::Bound(XmlNamespace(uri)), Some((ns, _))) => {
                ns.uri().as_bytes() == *uri
            }
            _ => false,
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));
                let local_name = e.local_name();
                if root.is_none() {
                    let namespace = match &resolved {
                        ResolveResult::Bound(XmlNamespace(uri)) => Namespace::from_uri(uri)
                            .ok_or_else(|| {
                                ParseError::UnsupportedNamespace(Some(
                                    String::from_utf8_lossy(uri).into_owned(),
                                ))
                            })?,
                        _ => return Err(ParseError::UnsupportedNamespace(None)),
                    };
                    root = Some((namespace, identify_sitemap_type(local_name.as_ref())));
                } else if depth == 0 {
                    return Err(ParseError::Malformed(
                        "more than one root element".to_string(),
                    ));
                } else if in_namespace {
                    collector.open(local_name.as_ref());
                    if self_closing {
                        collector.close(local_name.as_ref());
                    }
                }
                if !self_closing {
                    depth += 1;
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                if in_namespace {
                    collector.close(e.local_name().as_ref());
                }
            }
            Event::Text(ref e) => {
                if root.is_none() && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(ParseError::Malformed(
                        "text before the root element".to_string(),
                    ));
                }
                if collector.collecting() {
                    collector.push_text(&e.unescape().map_err(malformed)?);
                }
            }
            Event::CData(e) => {
                if collector.collecting() {
                    collector.push_text(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some((namespace, sitemap_type)) = root else {
        return Err(ParseError::Malformed("no root element".to_string()));
    };
    if depth > 0 {
        return Err(ParseError::Malformed(
            "unexpected end of document".to_string(),
        ));
    }

    Ok(SitemapDocument {
        namespace,
        sitemap_type,
        urls: collector.urls,
        sitemaps: collector.sitemaps,
        malformed: collector.malformed,
    })
}
// endregion

// region: Walking
/// Everything collected from a sitemap tree.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub entries: ResultSet,
    /// Human-readable failures of nested sitemaps and skipped entries. Only
    /// filled when errors are being shown.
    pub errors: Vec<String>,
    /// Number of sitemap documents visited, including failed ones.
    pub sitemaps: usize,
}

#[derive(Debug, Default)]
struct Subtree {
    entries: Vec<SitemapEntry>,
    errors: Vec<String>,
    sitemaps: usize,
}

/// Recursively walks a sitemap and its nested sitemap indexes.
///
/// All work runs on the caller's task: titles and nested sitemaps of one
/// document are fanned out with `join_all` and joined before their results
/// are merged, so the outcome is in pre-order (a document's own entries,
/// then each nested sitemap's in declaration order). A nested sitemap that
/// is already on the path from the root is skipped rather than walked again.
pub struct Walker {
    fetcher: Arc<Fetcher>,
    resolver: TitleResolver,
    show_errors: bool,
    progress: ProgressBar,
}

impl Walker {
    pub fn new(fetcher: Arc<Fetcher>, options: &WalkOptions) -> Self {
        let progress = if options.show_progress {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(concat!(
                        "\x1b[2m[1/2]\x1b[0m",
                        " 📥 [{elapsed_precise}] [{bar:40.cyan/blue}] Page {pos}/{len} {msg}"
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("■┄"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        Self {
            resolver: TitleResolver::new(Arc::clone(&fetcher)),
            fetcher,
            show_errors: options.show_errors,
            progress,
        }
    }

    /// Walks the sitemap at `url`.
    ///
    /// # Errors
    ///
    /// Fails only when the root sitemap cannot be fetched or parsed. Nested
    /// sitemaps that fail are skipped; see [`WalkOutcome::errors`].
    pub async fn walk(&self, url: &str) -> Result<WalkOutcome, WalkError> {
        let result = match self.load(url).await {
            Ok(document) => {
                let subtree = self.expand(url, document, &[url.to_string()]).await;
                Ok(WalkOutcome {
                    entries: ResultSet::from(subtree.entries),
                    errors: subtree.errors,
                    sitemaps: subtree.sitemaps,
                })
            }
            Err(e) => Err(e),
        };
        self.progress.finish_and_clear();
        result
    }

    async fn load(&self, url: &str) -> Result<SitemapDocument, WalkError> {
        self.progress
            .set_message(format!("Walking {}", utils::truncate_message(url, 60)));
        let xml = self.fetcher.fetch(url).await?;
        let document = parse_sitemap(&xml).map_err(|source| WalkError::Document {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!(
            url,
            namespace = document.namespace.uri(),
            kind = %document.sitemap_type,
            urls = document.urls.len(),
            sitemaps = document.sitemaps.len(),
            "parsed sitemap"
        );
        Ok(document)
    }

    /// `chain` holds every sitemap from the root down to and including `url`.
    fn walk_nested(&self, url: String, chain: Vec<String>) -> BoxFuture<'_, Subtree> {
        async move {
            match self.load(&url).await {
                Ok(document) => self.expand(&url, document, &chain).await,
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "skipping nested sitemap");
                    Subtree {
                        errors: if self.show_errors {
                            vec![e.to_string()]
                        } else {
                            Vec::new()
                        },
                        sitemaps: 1,
                        ..Subtree::default()
                    }
                }
            }
        }
        .boxed()
    }

    async fn expand(&self, url: &str, document: SitemapDocument, chain: &[String]) -> Subtree {
        let mut errors = Vec::new();
        if self.show_errors {
            errors.extend(document.malformed.iter().map(|&element| {
                MalformedEntry {
                    element,
                    document: url.to_string(),
                }
                .to_string()
            }));
        }

        let mut children = Vec::with_capacity(document.sitemaps.len());
        for loc in document.sitemaps {
            if chain.contains(&loc) {
                let cycle = SitemapCycle {
                    url: loc,
                    parent: url.to_string(),
                };
                tracing::debug!(url = %cycle.url, parent = url, "skipping sitemap cycle");
                if self.show_errors {
                    errors.push(cycle.to_string());
                }
            } else {
                children.push(loc);
            }
        }

        self.progress.inc_length(document.urls.len() as u64);
        let entries = join_all(
            document
                .urls
                .into_iter()
                .map(|element| self.resolve_entry(element)),
        );
        let nested = join_all(children.into_iter().map(|loc| {
            let mut chain = chain.to_vec();
            chain.push(loc.clone());
            self.walk_nested(loc, chain)
        }));
        let (mut entries, subtrees) = futures::join!(entries, nested);

        let mut sitemaps = 1;
        for child in subtrees {
            entries.extend(child.entries);
            errors.extend(child.errors);
            sitemaps += child.sitemaps;
        }

        Subtree {
            entries,
            errors,
            sitemaps,
        }
    }

    async fn resolve_entry(&self, element: UrlElement) -> SitemapEntry {
        let title = match element.name {
            Some(name) => Some(name),
            None => self.resolver.resolve(&element.loc).await,
        };
        self.progress.inc(1);
        SitemapEntry::new(title, element.loc)
    }
}
// endregion
