//! Documents as an ordered list of sentences.
//!
//! A [`Document`] is built from the pages returned by an importer. Pages are
//! kept for display; the sentences, indexed from zero, are what playback walks.

pub mod segment;

pub use segment::{segment, words};

/// Placeholder shown for a page with no extractable text.
pub const EMPTY_PAGE: &str = "[Empty page]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    pages: Vec<String>,
    sentences: Vec<String>,
}

impl Document {
    /// Builds a document from its pages, joined with newlines before segmentation.
    pub fn from_pages(id: impl Into<String>, pages: Vec<String>) -> Self {
        let text = pages.join("\n");
        Self {
            id: id.into(),
            sentences: segment(&text),
            pages,
        }
    }

    #[cfg(test)]
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::from_pages(id, vec![text.into()])
    }

    /// The document identifier, its path as given when opened.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}
