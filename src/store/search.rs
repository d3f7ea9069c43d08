//! Full-text search index
//!
//! One index per namespace key ("posts", "topics", ...). Documents are
//! tokenized into lowercase alphanumeric terms; the inverted index maps a
//! term to the documents containing it and how often.

use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};

/// Split text into lowercase alphanumeric terms
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    /// id -> original content
    documents: HashMap<Bytes, String>,
    /// term -> (id -> occurrences)
    postings: HashMap<String, BTreeMap<Bytes, u32>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Insert or replace the document stored under `id`
    pub fn upsert(&mut self, id: Bytes, content: String) {
        self.remove(&id);

        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in tokenize(&content) {
            *counts.entry(term).or_insert(0) += 1;
        }
        for (term, n) in counts {
            self.postings.entry(term).or_default().insert(id.clone(), n);
        }
        self.documents.insert(id, content);
    }

    /// Remove a document; true when it was present
    pub fn remove(&mut self, id: &Bytes) -> bool {
        let Some(content) = self.documents.remove(id) else {
            return false;
        };
        for term in tokenize(&content) {
            if let Some(docs) = self.postings.get_mut(&term) {
                docs.remove(id);
                if docs.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }

    /// Ids of documents containing any term of `query`, best match first,
    /// at most `limit` of them (`None` for all)
    ///
    /// A document's score is the summed occurrence count of the query
    /// terms; equal scores order by id.
    pub fn query(&self, query: &str, limit: Option<usize>) -> Vec<Bytes> {
        let mut scores: HashMap<&Bytes, u32> = HashMap::new();
        let mut seen_terms = Vec::new();

        for term in tokenize(query) {
            if seen_terms.contains(&term) {
                continue;
            }
            if let Some(docs) = self.postings.get(&term) {
                for (id, n) in docs {
                    *scores.entry(id).or_insert(0) += n;
                }
            }
            seen_terms.push(term);
        }

        let mut ranked: Vec<(&Bytes, u32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().take(limit.unwrap_or(usize::MAX)).map(|(id, _)| id.clone()).collect()
    }

    pub fn memory_usage(&self) -> usize {
        let docs: usize = self.documents.iter().map(|(id, c)| id.len() + c.len()).sum();
        let postings: usize = self
            .postings
            .iter()
            .map(|(term, ids)| term.len() + ids.keys().map(|id| id.len() + 4).sum::<usize>())
            .sum();
        docs + postings + std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let terms: Vec<String> = tokenize("Hello, World! rust-lang 2024").collect();
        assert_eq!(terms, ["hello", "world", "rust", "lang", "2024"]);
    }

    #[test]
    fn test_query_ranks_by_occurrences() {
        let mut index = SearchIndex::new();
        index.upsert(Bytes::from("1"), "hello world".to_string());
        index.upsert(Bytes::from("2"), "hello hello there".to_string());
        index.upsert(Bytes::from("3"), "nothing to see".to_string());

        assert_eq!(index.query("hello", Some(10)), [Bytes::from("2"), Bytes::from("1")]);
        assert_eq!(index.query("HELLO world", Some(10)), [Bytes::from("1"), Bytes::from("2")]);
        assert_eq!(index.query("hello", Some(1)), [Bytes::from("2")]);
        assert!(index.query("absent", Some(10)).is_empty());
        assert_eq!(index.query("hello", None).len(), 2);
    }

    #[test]
    fn test_upsert_replaces_terms() {
        let mut index = SearchIndex::new();
        index.upsert(Bytes::from("1"), "old words".to_string());
        index.upsert(Bytes::from("1"), "new words".to_string());

        assert!(index.query("old", Some(10)).is_empty());
        assert_eq!(index.query("new", Some(10)), [Bytes::from("1")]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut index = SearchIndex::new();
        index.upsert(Bytes::from("1"), "hello".to_string());
        assert!(index.remove(&Bytes::from("1")));
        assert!(!index.remove(&Bytes::from("1")));
        assert!(index.query("hello", Some(10)).is_empty());
        assert!(index.postings.is_empty());
    }
}
