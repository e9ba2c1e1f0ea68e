//! Crawl PubMed for the articles of a few tracked authors and read the
//! downloaded citation records back as [`record::ArticleRecord`]s.

pub mod citation;
pub mod config;
pub mod crawl;
pub mod record;
pub mod source;
pub mod xml;
