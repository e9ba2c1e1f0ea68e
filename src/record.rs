use std::fmt;

use serde::Serialize;

/// One article as read from a PubMed citation entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    /// PubMed identifier (PMID).
    pub id: String,
    pub title: String,
    /// `"<LastName>,<Initials>."`, in document order.
    pub authors: Vec<String>,
    /// `"{year}.{month}.{day}"` with the components taken verbatim.
    pub published_date: String,
    pub abstract_text: String,
    pub journal_name: String,
    /// ISO abbreviation of the journal title.
    pub journal_abbreviation: String,
    pub doi: String,
}

impl ArticleRecord {
    pub fn format_author(last_name: &str, initials: &str) -> String {
        format!("{last_name},{initials}.")
    }
}

impl fmt::Display for ArticleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<pmid=\"{}\", title=\"{}\", authors=\"{}\", journal=\"{}\", doi=\"{}\">",
            self.id,
            self.title,
            self.authors.join("; "),
            self.journal_name,
            self.doi
        )
    }
}
