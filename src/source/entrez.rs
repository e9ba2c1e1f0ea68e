//! NCBI Entrez E-utilities client for PubMed.
//!
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi

use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::source::RecordSource;
use crate::xml;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";
const TOOL: &str = "papers-crawler";
const USER_AGENT: &str = concat!("papers-crawler/", env!("CARGO_PKG_VERSION"));

/// What `fetch_details` returns for an empty id list.
pub const EMPTY_DOCUMENT: &str = "<?xml version=\"1.0\" ?>\n<PubmedArticleSet></PubmedArticleSet>\n";

pub struct Entrez {
    agent: ureq::Agent,
    contact: Option<String>,
    api_key: Option<String>,
    max_results: u32,
}

impl Entrez {
    pub fn new(config: &Config) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(10)))
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();
        Entrez {
            agent: ureq::Agent::new_with_config(cfg),
            contact: config.contact.clone(),
            api_key: config.api_key.clone(),
            max_results: config.max_results,
        }
    }

    fn search_url(&self, query: &str) -> anyhow::Result<Url> {
        let mut url = Url::parse(ESEARCH_URL)?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("sort", "date")
            .append_pair("retmode", "xml")
            .append_pair("retmax", &self.max_results.to_string())
            .append_pair("term", query);
        self.identify(&mut url);
        Ok(url)
    }

    fn fetch_url(&self, ids: &[String]) -> anyhow::Result<Url> {
        let mut url = Url::parse(EFETCH_URL)?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("retmode", "xml")
            .append_pair("id", &ids.join(","));
        self.identify(&mut url);
        Ok(url)
    }

    /// NCBI asks every crawler to send `tool` and `email`, and throttles harder without them.
    fn identify(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("tool", TOOL);
        if let Some(contact) = &self.contact {
            pairs.append_pair("email", contact);
        }
        if let Some(key) = &self.api_key {
            pairs.append_pair("api_key", key);
        }
    }

    fn get(&self, url: &Url) -> anyhow::Result<String> {
        let body = self
            .agent
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .call()
            .with_context(|| format!("request to {} failed", url.path()))?
            .into_body()
            .read_to_string()
            .context("failed to read Entrez response body")?;
        Ok(body)
    }
}

impl RecordSource for Entrez {
    fn search(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let url = self.search_url(query)?;
        let body = self
            .get(&url)
            .with_context(|| format!("failed esearch for {query:?}"))?;
        parse_search_result(&body)
    }

    fn fetch_details(&self, ids: &[String]) -> anyhow::Result<String> {
        if ids.is_empty() {
            debug!("no identifiers to fetch, skipping efetch");
            return Ok(EMPTY_DOCUMENT.to_string());
        }
        let url = self.fetch_url(ids)?;
        self.get(&url)
            .with_context(|| format!("failed efetch for {} identifiers", ids.len()))
    }
}

/// Read the `IdList` out of an `esearch` XML response.
pub fn parse_search_result(body: &str) -> anyhow::Result<Vec<String>> {
    let root = xml::parse_document(body).context("malformed esearch response")?;
    if let Some(error) = root.child("ERROR") {
        return Err(anyhow!("Entrez rejected the search: {}", error.text()));
    }
    if let Some(list) = root.child("ErrorList") {
        for problem in list.elements() {
            debug!(kind = problem.name(), detail = %problem.text(), "esearch reported a problem");
        }
    }
    let ids = root
        .child("IdList")
        .ok_or_else(|| anyhow!("esearch response has no <IdList>"))?
        .children("Id")
        .map(|id| id.text())
        .filter(|id| !id.is_empty())
        .collect();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entrez(contact: Option<&str>, api_key: Option<&str>) -> Entrez {
        let config = Config {
            contact: contact.map(str::to_string),
            api_key: api_key.map(str::to_string),
            max_results: 7,
            ..Config::default()
        };
        Entrez::new(&config)
    }

    fn query_of(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn search_url_carries_query_and_identity() {
        let url = entrez(Some("me@example.org"), None)
            .search_url("jimenez, brian")
            .unwrap();
        assert_eq!(url.host_str(), Some("eutils.ncbi.nlm.nih.gov"));
        let pairs = query_of(&url);
        for expected in [
            ("db", "pubmed"),
            ("sort", "date"),
            ("retmode", "xml"),
            ("retmax", "7"),
            ("term", "jimenez, brian"),
            ("tool", "papers-crawler"),
            ("email", "me@example.org"),
        ] {
            assert!(
                pairs.contains(&(expected.0.to_string(), expected.1.to_string())),
                "missing {expected:?} in {pairs:?}"
            );
        }
        assert!(!pairs.iter().any(|(k, _)| k == "api_key"));
    }

    #[test]
    fn fetch_url_joins_ids() {
        let ids = vec!["1".to_string(), "22".to_string(), "333".to_string()];
        let url = entrez(None, Some("secret")).fetch_url(&ids).unwrap();
        assert!(url.path().ends_with("efetch.fcgi"));
        let pairs = query_of(&url);
        assert!(pairs.contains(&("id".to_string(), "1,22,333".to_string())));
        assert!(pairs.contains(&("api_key".to_string(), "secret".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "email"));
    }

    #[test]
    fn empty_id_list_needs_no_request() {
        let doc = entrez(None, None).fetch_details(&[]).unwrap();
        assert_eq!(doc, EMPTY_DOCUMENT);
        assert!(crate::citation::parse(&doc).unwrap().is_empty());
    }

    #[test]
    fn reads_id_list() {
        let body = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>3</Count><RetMax>3</RetMax><RetStart>0</RetStart><IdList>
<Id>29126234</Id>
<Id>28605089</Id>
<Id>27450111</Id>
</IdList><TranslationSet/><QueryTranslation>jimenez-garcia b[Author]</QueryTranslation></eSearchResult>
"#;
        assert_eq!(
            parse_search_result(body).unwrap(),
            ["29126234", "28605089", "27450111"]
        );
    }

    #[test]
    fn no_hits_is_an_empty_list() {
        let body = "<eSearchResult><Count>0</Count><IdList/><ErrorList><PhraseNotFound>zzzz</PhraseNotFound></ErrorList></eSearchResult>";
        assert!(parse_search_result(body).unwrap().is_empty());
    }

    #[test]
    fn reports_entrez_errors() {
        let body = "<eSearchResult><ERROR>Empty term and query_key - nothing todo</ERROR></eSearchResult>";
        let err = parse_search_result(body).unwrap_err();
        assert!(err.to_string().contains("nothing todo"));
        assert!(parse_search_result("<html>busy</html>").is_err());
    }
}
