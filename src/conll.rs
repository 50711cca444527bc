/*!
Reader for CoNLL-style corpora: one token per line as separator-split feature columns, sentences
separated by blank lines. The first column is the word and the last one the IOB tag.
*/
use crate::alignment::TaggedToken;
use crate::error::{Result, SynevalError};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const DOC_START: &str = "-DOCSTART-";

/// A sentence of the reference corpus, as rows of feature columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConllSentence {
    rows: Vec<Vec<String>>,
}

impl ConllSentence {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        ConllSentence { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(|r| r.first().map_or("", String::as_str))
    }

    /// Tags of the last column.
    pub fn tags(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|r| r.last().map_or("", String::as_str))
            .collect()
    }

    /// The words, each followed by a single space. This is the text sent to the pipeline.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for word in self.words() {
            text.push_str(word);
            text.push(' ');
        }
        text
    }

    /// `(word, tag)` pairs of the reference.
    pub fn tagged(&self) -> Vec<TaggedToken> {
        self.words()
            .zip(self.tags())
            .map(|(word, tag)| TaggedToken::new(word, tag))
            .collect()
    }

    pub fn is_doc_start(&self) -> bool {
        self.words().next() == Some(DOC_START)
    }
}

/// Parses a corpus held in memory. Every row must have as many columns as the first row of the
/// corpus.
pub fn parse_corpus(
    content: &str,
    separator: &str,
    skip_doc_start: bool,
) -> Result<Vec<ConllSentence>> {
    let mut expected: Option<usize> = None;
    let mut sentences = Vec::new();
    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            if !rows.is_empty() {
                sentences.push(ConllSentence::new(std::mem::take(&mut rows)));
            }
            continue;
        }
        let features: Vec<String> = line.split(separator).map(String::from).collect();
        match expected {
            None => expected = Some(features.len()),
            Some(n) if n != features.len() => {
                return Err(SynevalError::ColumnCount {
                    line: i + 1,
                    expected: n,
                    found: features.len(),
                })
            }
            Some(_) => {}
        }
        rows.push(features);
    }
    if !rows.is_empty() {
        sentences.push(ConllSentence::new(rows));
    }
    if skip_doc_start {
        let before = sentences.len();
        sentences.retain(|s| !s.is_doc_start());
        debug!(skipped = before - sentences.len(), "dropped document separators");
    }
    Ok(sentences)
}

/// Reads a corpus file. See `parse_corpus`.
pub fn read_corpus<P: AsRef<Path>>(
    path: P,
    separator: &str,
    skip_doc_start: bool,
) -> Result<Vec<ConllSentence>> {
    let content = fs::read_to_string(path.as_ref())?;
    let sentences = parse_corpus(&content, separator, skip_doc_start)?;
    info!(
        path = %path.as_ref().display(),
        sentences = sentences.len(),
        "loaded reference corpus"
    );
    Ok(sentences)
}

/// Splits a tag such as `B-PER` on its first `-`. The outside tag, or a tag without any `-`,
/// has no label.
pub fn parse_iob<'t>(tag: &'t str, otag: &str) -> (&'t str, Option<&'t str>) {
    if tag == otag {
        return (tag, None);
    }
    match tag.split_once('-') {
        Some((prefix, label)) => (prefix, Some(label)),
        None => (tag, None),
    }
}

/// Entity labels found in the last column of the corpus.
pub fn corpus_labels<'a>(sentences: &'a [ConllSentence], otag: &str) -> BTreeSet<&'a str> {
    sentences
        .iter()
        .flat_map(|s| s.tags())
        .filter_map(|tag| parse_iob(tag, otag).1)
        .collect()
}
