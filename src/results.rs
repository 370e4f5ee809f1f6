use console::style;
use csv::Writer;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A page listed in a sitemap together with its display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapEntry {
    pub title: String,
    pub link: String,
}

impl SitemapEntry {
    /// Builds an entry, using `link` as the title when none was found.
    pub fn new(title: Option<String>, link: String) -> Self {
        let title = title.unwrap_or_else(|| link.clone());
        Self { title, link }
    }
}

/// The flat, ordered list of entries collected from a sitemap tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<SitemapEntry>);

impl From<Vec<SitemapEntry>> for ResultSet {
    fn from(entries: Vec<SitemapEntry>) -> Self {
        Self(entries)
    }
}

impl ResultSet {
    pub fn entries(&self) -> &[SitemapEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SitemapEntry> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&SitemapEntry> {
        self.0.get(index)
    }

    /// Returns the entries whose title contains `query`, ignoring case.
    /// An empty query matches every entry. Order is preserved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sitemap_search::results::{ResultSet, SitemapEntry};
    ///
    /// let results = ResultSet::from(vec![
    ///     SitemapEntry::new(Some("Hello World".into()), "https://example.com/".into()),
    ///     SitemapEntry::new(None, "https://example.com/about".into()),
    /// ]);
    /// assert_eq!(results.search("HELLO").len(), 1);
    /// assert_eq!(results.search(""), results);
    /// ```
    pub fn search(&self, query: &str) -> ResultSet {
        if query.is_empty() {
            return self.clone();
        }
        let query = query.to_lowercase();
        self.0
            .iter()
            .filter(|entry| entry.title.to_lowercase().contains(&query))
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }

    /// Returns a copy ordered by link, for numbering that is stable across runs.
    pub fn sorted_by_link(&self) -> ResultSet {
        let mut entries = self.0.clone();
        entries.sort_by(|a, b| a.link.cmp(&b.link));
        Self(entries)
    }

    pub fn to_json_string(&self) -> Result<String, Box<dyn Error>> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json_report(&self, report_path: &Path, quiet: bool) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(report_path)?;
        file.write_all(self.to_json_string()?.as_bytes())?;
        if !quiet {
            println!(
                "\n📊 The JSON report was written to {}",
                style(report_path.display()).underlined().cyan()
            );
        }
        Ok(())
    }

    pub fn write_csv_report(&self, report_path: &Path, quiet: bool) -> Result<(), Box<dyn Error>> {
        // If the report path parent is a directory, create it if it doesn't exist yet
        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = Writer::from_path(report_path)?;
        writer.write_record(["Title", "Link"])?;
        for entry in &self.0 {
            writer.write_record([&entry.title, &entry.link])?;
        }
        writer.flush()?;
        if !quiet {
            println!(
                "\n📊 The CSV report was written to {}",
                style(report_path.display()).underlined().cyan()
            );
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a SitemapEntry;
    type IntoIter = std::slice::Iter<'a, SitemapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
