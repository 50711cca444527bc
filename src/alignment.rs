/*!
Re-alignment of pipeline tokens with a whitespace-tokenized reference. The pipeline splits words
such as `U.S.-based` or `Ladki's` into several tokens; the pieces are glued back together so that
each reference word gets exactly one hypothesis tag.
*/
use crate::doc::Doc;
use crate::labels::LabelMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Outside tag of the hypotheses.
pub const OUTSIDE: &str = "O";

/// A word and its IOB tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedToken {
    pub text: String,
    pub tag: String,
}

impl TaggedToken {
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        TaggedToken {
            text: text.into(),
            tag: tag.into(),
        }
    }
}

impl Display for TaggedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.text, self.tag)
    }
}

/// Merges every run of tokens without trailing whitespace with the token closing it. A merged
/// token keeps the tag of its first piece. `tags` holds one tag per token of `doc`.
pub fn join_subword_tokens<S: AsRef<str>>(doc: &Doc, tags: &[S]) -> Vec<TaggedToken> {
    let mut joined = Vec::with_capacity(doc.len());
    let mut pending: Option<TaggedToken> = None;
    for (token, tag) in doc.tokens().zip(tags) {
        match pending.as_mut() {
            Some(open) => open.text.push_str(token.text()),
            None => pending = Some(TaggedToken::new(token.text(), tag.as_ref())),
        }
        if token.whitespace() {
            joined.extend(pending.take());
        }
    }
    // A document may end without whitespace
    joined.extend(pending);
    joined
}

/// The pipeline's own per-token annotation: `{iob}-{label}` for tokens inside an entity whose
/// label survives the conversion, `O` otherwise.
pub fn pipeline_tags(doc: &Doc, labels: Option<&LabelMap>) -> Vec<String> {
    doc.tokens()
        .map(|token| {
            let ent_type = token.ent_type();
            if ent_type.is_empty() {
                return String::from(OUTSIDE);
            }
            match crate::labels::convert(ent_type, labels) {
                Some(label) => format!("{}-{}", token.ent_iob(), label),
                None => String::from(OUTSIDE),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::fixtures::steve_jobs;
    use crate::doc::{DocBuilder, TokenData};

    fn tokens(doc: &[TaggedToken]) -> Vec<(&str, &str)> {
        doc.iter()
            .map(|t| (t.text.as_str(), t.tag.as_str()))
            .collect()
    }

    #[test]
    fn test_pipeline_tags_conll() {
        let doc = steve_jobs();
        let map = LabelMap::spacy_to_conll();
        let tags = pipeline_tags(&doc, Some(&map));
        assert_eq!(
            tags,
            vec![
                "B-ORG", "O", "B-PER", "I-PER", "O", "O", "O", "O", "B-LOC", "I-LOC", "O",
                "B-LOC", "O"
            ]
        );
    }

    #[test]
    fn test_pipeline_tags_native() {
        let doc = steve_jobs();
        let tags = pipeline_tags(&doc, None);
        assert_eq!(tags[6], "B-DATE");
        assert_eq!(tags[3], "I-PERSON");
    }

    #[test]
    fn test_join_subword_tokens() {
        let doc = steve_jobs();
        let map = LabelMap::spacy_to_conll();
        let tags = pipeline_tags(&doc, Some(&map));
        let joined = join_subword_tokens(&doc, &tags);
        assert_eq!(
            tokens(&joined),
            vec![
                ("Apple's", "B-ORG"),
                ("Steve", "B-PER"),
                ("Jobs", "I-PER"),
                ("died", "O"),
                ("in", "O"),
                ("2011", "O"),
                ("in", "O"),
                ("Palo", "B-LOC"),
                ("Alto,", "I-LOC"),
                ("California.", "B-LOC"),
            ]
        );
    }

    #[test]
    fn test_whitespace_terminated_document() {
        // "U.S.-based firms " as sent from a reference sentence
        let doc = DocBuilder::new()
            .token(TokenData::new("U.S.", "PROPN", "npadvmod", 2).no_space())
            .token(TokenData::new("-", "PUNCT", "punct", 2).no_space())
            .token(TokenData::new("based", "VERB", "amod", 3))
            .token(TokenData::new("firms", "NOUN", "ROOT", 3))
            .entity(0, 1, "GPE")
            .build()
            .unwrap();
        let tags = pipeline_tags(&doc, Some(&LabelMap::spacy_to_conll()));
        let joined = join_subword_tokens(&doc, &tags);
        assert_eq!(
            tokens(&joined),
            vec![("U.S.-based", "B-LOC"), ("firms", "O")]
        );
    }
}
