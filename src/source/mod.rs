pub mod entrez;

/// A bibliographic database that can be searched by free text and asked for
/// the full records of the identifiers it returned.
pub trait RecordSource {
    /// Identifiers matching `query`, in the order the source ranks them.
    fn search(&self, query: &str) -> anyhow::Result<Vec<String>>;
    /// One raw document holding the records for `ids`.
    fn fetch_details(&self, ids: &[String]) -> anyhow::Result<String>;
}
