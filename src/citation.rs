//! Turns an Entrez `efetch` document into [`ArticleRecord`]s.
//!
//! Each `PubmedArticle` is handled on its own in two steps. Extraction walks
//! the element tree and records every lookup as present or absent, without
//! judging anything. Validation then applies a [`FieldPolicy`] and either
//! produces a complete record or rejects the whole entry with a
//! [`MalformedEntry`] reason. A rejected entry never affects its neighbours.

use serde::Deserialize;
use tracing::{debug, error};

use crate::record::ArticleRecord;
use crate::xml::{self, Element, XmlError};

const ENTRY: &str = "PubmedArticle";
const CITATION: &str = "MedlineCitation";

const PMID: &str = "MedlineCitation/PMID";
const TITLE: &str = "MedlineCitation/Article/ArticleTitle";
const JOURNAL_TITLE: &str = "MedlineCitation/Article/Journal/Title";
const JOURNAL_ISO: &str = "MedlineCitation/Article/Journal/ISOAbbreviation";
const ABSTRACT: &str = "MedlineCitation/Article/Abstract/AbstractText";
const DATE_CREATED: &str = "MedlineCitation/DateCreated";
const DATE_YEAR: &str = "MedlineCitation/DateCreated/Year";
const DATE_MONTH: &str = "MedlineCitation/DateCreated/Month";
const DATE_DAY: &str = "MedlineCitation/DateCreated/Day";
const AUTHOR_LIST: &str = "MedlineCitation/Article/AuthorList";
const PUBMED_DATA: &str = "PubmedData";
const ARTICLE_ID_LIST: &str = "PubmedData/ArticleIdList";

/// Dates tried, in order, when `DateCreated` is absent and the policy is lenient.
const FALLBACK_DATES: [&str; 2] = ["DateCompleted", "DateRevised"];

/// What to do when an expected element is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldPolicy {
    /// Any absent element rejects the whole entry.
    #[default]
    Strict,
    /// Absent fields become empty strings and incomplete authors are dropped.
    Lenient,
}

impl FieldPolicy {
    fn require(self, value: Option<String>, path: &'static str) -> Result<String, MalformedEntry> {
        match (value, self) {
            (Some(v), _) => Ok(v),
            (None, FieldPolicy::Lenient) => Ok(String::new()),
            (None, FieldPolicy::Strict) => Err(MalformedEntry::Missing(path)),
        }
    }
}

/// Why a citation entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEntry {
    #[error("missing <{0}>")]
    Missing(&'static str),
    #[error("author #{position} has no <{field}>")]
    IncompleteAuthor { position: usize, field: &'static str },
}

/// An entry that was dropped while parsing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Zero-based position among the document's citation entries.
    pub position: usize,
    /// PMID, when the entry got far enough to have one.
    pub id: Option<String>,
    pub reason: MalformedEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub records: Vec<ArticleRecord>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CitationParser {
    policy: FieldPolicy,
}

impl CitationParser {
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }

    /// Parse a document, keeping track of the entries that had to be skipped.
    ///
    /// Only a document that is not well-formed XML is an error; a malformed
    /// entry is logged and recorded in [`ParseReport::skipped`].
    pub fn parse_report(&self, document: &str) -> Result<ParseReport, XmlError> {
        let root = xml::parse_document(document)?;
        debug!(root = root.name(), "parsing citation document");

        let mut report = ParseReport::default();
        for (position, entry) in root.children(ENTRY).enumerate() {
            match extract_entry(entry, self.policy) {
                Ok(record) => report.records.push(record),
                Err(reason) => {
                    let id = entry.find(PMID).map(Element::text);
                    error!(
                        position,
                        pmid = id.as_deref().unwrap_or("?"),
                        "can not parse article: {reason}"
                    );
                    report.skipped.push(SkippedEntry {
                        position,
                        id,
                        reason,
                    });
                }
            }
        }
        Ok(report)
    }

    pub fn parse(&self, document: &str) -> Result<Vec<ArticleRecord>, XmlError> {
        self.parse_report(document).map(|r| r.records)
    }
}

/// Parse with the default strict policy.
pub fn parse(document: &str) -> Result<Vec<ArticleRecord>, XmlError> {
    CitationParser::default().parse(document)
}

/// Build a record from one `PubmedArticle` element.
pub fn extract_entry(entry: &Element, policy: FieldPolicy) -> Result<ArticleRecord, MalformedEntry> {
    EntryFields::extract(entry).validate(policy)
}

#[derive(Debug, Default)]
struct EntryFields {
    citations: Vec<CitationFields>,
    submission: Option<SubmissionFields>,
}

#[derive(Debug, Default)]
struct CitationFields {
    pmid: Option<String>,
    title: Option<String>,
    journal_name: Option<String>,
    journal_abbreviation: Option<String>,
    abstract_text: Option<String>,
    date_created: Option<DateParts>,
    fallback_date: Option<DateParts>,
    authors: Option<Vec<AuthorFields>>,
}

#[derive(Debug)]
struct DateParts {
    year: Option<String>,
    month: Option<String>,
    day: Option<String>,
}

#[derive(Debug)]
struct AuthorFields {
    last_name: Option<String>,
    initials: Option<String>,
}

#[derive(Debug)]
struct SubmissionFields {
    article_ids: Option<Vec<ArticleId>>,
}

#[derive(Debug)]
struct ArticleId {
    id_type: Option<String>,
    value: String,
}

fn text_at(element: &Element, path: &str) -> Option<String> {
    element.find(path).map(Element::text)
}

impl DateParts {
    /// Components are kept verbatim, whitespace included.
    fn extract(date: &Element) -> Self {
        let part = |name: &str| date.child(name).map(Element::raw_text);
        DateParts {
            year: part("Year"),
            month: part("Month"),
            day: part("Day"),
        }
    }
}

impl CitationFields {
    /// `citation` is a `MedlineCitation` element.
    fn extract(citation: &Element) -> Self {
        let authors = citation.find("Article/AuthorList").map(|list| {
            list.children("Author")
                .map(|author| AuthorFields {
                    last_name: text_at(author, "LastName"),
                    initials: text_at(author, "Initials"),
                })
                .collect()
        });
        CitationFields {
            pmid: text_at(citation, "PMID"),
            title: text_at(citation, "Article/ArticleTitle"),
            journal_name: text_at(citation, "Article/Journal/Title"),
            journal_abbreviation: text_at(citation, "Article/Journal/ISOAbbreviation"),
            abstract_text: text_at(citation, "Article/Abstract/AbstractText"),
            date_created: citation.child("DateCreated").map(DateParts::extract),
            fallback_date: FALLBACK_DATES
                .iter()
                .find_map(|name| citation.child(name))
                .map(DateParts::extract),
            authors,
        }
    }
}

impl EntryFields {
    fn extract(entry: &Element) -> Self {
        let submission = entry.child(PUBMED_DATA).map(|data| SubmissionFields {
            article_ids: data.child("ArticleIdList").map(|list| {
                list.children("ArticleId")
                    .map(|id| ArticleId {
                        id_type: id.attr("IdType").map(str::to_string),
                        value: id.text(),
                    })
                    .collect()
            }),
        });
        EntryFields {
            citations: entry.children(CITATION).map(CitationFields::extract).collect(),
            submission,
        }
    }

    fn validate(self, policy: FieldPolicy) -> Result<ArticleRecord, MalformedEntry> {
        let mut record = ArticleRecord::default();
        for citation in self.citations {
            citation.validate_into(&mut record, policy)?;
        }

        match self.submission {
            Some(SubmissionFields {
                article_ids: Some(ids),
            }) => {
                // Last DOI wins.
                for id in ids {
                    if id.id_type.as_deref() == Some("doi") {
                        record.doi = id.value;
                    }
                }
            }
            Some(SubmissionFields { article_ids: None }) if policy == FieldPolicy::Strict => {
                return Err(MalformedEntry::Missing(ARTICLE_ID_LIST));
            }
            None if policy == FieldPolicy::Strict => {
                return Err(MalformedEntry::Missing(PUBMED_DATA));
            }
            _ => {}
        }
        Ok(record)
    }
}

impl CitationFields {
    fn validate_into(self, record: &mut ArticleRecord, policy: FieldPolicy) -> Result<(), MalformedEntry> {
        record.id = policy.require(self.pmid, PMID)?;
        record.title = policy.require(self.title, TITLE)?;
        record.journal_name = policy.require(self.journal_name, JOURNAL_TITLE)?;
        record.journal_abbreviation = policy.require(self.journal_abbreviation, JOURNAL_ISO)?;
        record.abstract_text = policy.require(self.abstract_text, ABSTRACT)?;

        let date = match (self.date_created, policy) {
            (Some(date), _) => Some(date),
            (None, FieldPolicy::Lenient) => self.fallback_date,
            (None, FieldPolicy::Strict) => return Err(MalformedEntry::Missing(DATE_CREATED)),
        };
        record.published_date = match date {
            Some(date) => format!(
                "{}.{}.{}",
                policy.require(date.year, DATE_YEAR)?,
                policy.require(date.month, DATE_MONTH)?,
                policy.require(date.day, DATE_DAY)?
            ),
            None => String::new(),
        };

        let authors = match (self.authors, policy) {
            (Some(authors), _) => authors,
            (None, FieldPolicy::Lenient) => Vec::new(),
            (None, FieldPolicy::Strict) => return Err(MalformedEntry::Missing(AUTHOR_LIST)),
        };
        for (position, author) in authors.into_iter().enumerate() {
            match (author.last_name, author.initials, policy) {
                (Some(last), Some(initials), _) => {
                    record.authors.push(ArticleRecord::format_author(&last, &initials));
                }
                (Some(last), None, FieldPolicy::Lenient) => {
                    record.authors.push(ArticleRecord::format_author(&last, ""));
                }
                (None, _, FieldPolicy::Lenient) => {
                    debug!(position, "dropping author without a last name");
                }
                (None, _, FieldPolicy::Strict) => {
                    return Err(MalformedEntry::IncompleteAuthor {
                        position: position + 1,
                        field: "LastName",
                    });
                }
                (Some(_), None, FieldPolicy::Strict) => {
                    return Err(MalformedEntry::IncompleteAuthor {
                        position: position + 1,
                        field: "Initials",
                    });
                }
            }
        }
        Ok(())
    }
}
