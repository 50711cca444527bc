/*!
Fixing entity segmentation errors with the dependency parse: an entity covering only part of a
noun compound (`New York` in `New York Times`) is extended to the whole compound.
*/
use crate::alignment::{TaggedToken, OUTSIDE};
use crate::doc::{Doc, Token};
use crate::labels::{convert, LabelMap};
use std::collections::BTreeSet;

const COMPOUND: &str = "compound";

/// Which `compound` arcs are followed when extending an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtensionConfig {
    /// Climb from each entity token to the head of its compound
    pub head_compound: bool,
    /// Collect the compound children, recursively
    pub children_compound: bool,
}

impl ExtensionConfig {
    pub fn new(head_compound: bool, children_compound: bool) -> Self {
        ExtensionConfig {
            head_compound,
            children_compound,
        }
    }
}

fn collect_compound_children(
    token: Token<'_>,
    indices: &mut BTreeSet<usize>,
    visited: &mut BTreeSet<usize>,
) {
    for child in token.children() {
        if child.dep() == COMPOUND && visited.insert(child.i()) {
            indices.insert(child.i());
            collect_compound_children(child, indices, visited);
        }
    }
}

/// One `(text, tag)` pair per token of `doc`, with every entity extended along `compound` arcs.
/// Later entities overwrite earlier ones and entities with a dropped label leave their tokens
/// untouched.
pub fn extend_entity_span(
    doc: &Doc,
    config: ExtensionConfig,
    labels: Option<&LabelMap>,
) -> Vec<TaggedToken> {
    let mut tags: Vec<Option<String>> = vec![None; doc.len()];
    for ent in doc.ents() {
        let mut indices = BTreeSet::new();
        for token in ent.tokens() {
            indices.insert(token.i());
            let mut current = token;
            if config.head_compound {
                let mut steps = 0;
                while current.dep() == COMPOUND && !current.is_root() && steps < doc.len() {
                    current = current.head();
                    indices.insert(current.i());
                    steps += 1;
                }
            }
            if config.children_compound {
                let mut visited = BTreeSet::from([current.i()]);
                collect_compound_children(current, &mut indices, &mut visited);
            }
        }
        let Some(label) = ent.label().and_then(|l| convert(l, labels)) else {
            continue;
        };
        for (n, i) in indices.into_iter().enumerate() {
            let prefix = if n == 0 { "B" } else { "I" };
            tags[i] = Some(format!("{}-{}", prefix, label));
        }
    }
    doc.tokens()
        .zip(tags)
        .map(|(token, tag)| {
            TaggedToken::new(token.text(), tag.unwrap_or_else(|| String::from(OUTSIDE)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::fixtures::{new_york_times, steve_jobs};
    use crate::doc::{DocBuilder, TokenData};
    use rstest::rstest;

    fn tags_of(tokens: &[TaggedToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.tag.as_str()).collect()
    }

    #[rstest]
    #[case(false, false, vec!["O", "O", "O", "B-GPE", "I-GPE", "O", "B-DATE", "O"])]
    #[case(true, false, vec!["O", "O", "O", "B-GPE", "I-GPE", "I-GPE", "B-DATE", "O"])]
    #[case(false, true, vec!["O", "O", "O", "B-GPE", "I-GPE", "O", "B-DATE", "O"])]
    #[case(true, true, vec!["O", "O", "O", "B-GPE", "I-GPE", "I-GPE", "B-DATE", "O"])]
    fn test_extension_modes(
        #[case] head: bool,
        #[case] children: bool,
        #[case] expected: Vec<&str>,
    ) {
        let doc = new_york_times();
        let extended = extend_entity_span(&doc, ExtensionConfig::new(head, children), None);
        assert_eq!(tags_of(&extended), expected);
        assert_eq!(extended[5].text, "Times");
    }

    #[test]
    fn test_children_compound() {
        // The entity only covers "Times"
        let doc = DocBuilder::new()
            .token(TokenData::new("She", "PRON", "nsubj", 1))
            .token(TokenData::new("read", "VERB", "ROOT", 1))
            .token(TokenData::new("the", "DET", "det", 5))
            .token(TokenData::new("New", "PROPN", "compound", 4))
            .token(TokenData::new("York", "PROPN", "compound", 5))
            .token(TokenData::new("Times", "PROPN", "dobj", 1).no_space())
            .token(TokenData::new(".", "PUNCT", "punct", 1).no_space())
            .entity(5, 6, "ORG")
            .build()
            .unwrap();
        let extended = extend_entity_span(&doc, ExtensionConfig::new(false, true), None);
        assert_eq!(
            tags_of(&extended),
            vec!["O", "O", "O", "B-ORG", "I-ORG", "I-ORG", "O"]
        );
    }

    #[test]
    fn test_dropped_label() {
        let doc = new_york_times();
        let map = LabelMap::spacy_to_conll();
        let extended = extend_entity_span(&doc, ExtensionConfig::new(true, true), Some(&map));
        assert_eq!(
            tags_of(&extended),
            vec!["O", "O", "O", "B-LOC", "I-LOC", "I-LOC", "O", "O"]
        );
    }

    #[test]
    fn test_steve_jobs_head_and_children() {
        let doc = steve_jobs();
        let extended = extend_entity_span(&doc, ExtensionConfig::new(true, true), None);
        assert_eq!(
            tags_of(&extended),
            vec![
                "B-ORG", "O", "B-PERSON", "I-PERSON", "O", "O", "B-DATE", "O", "B-GPE", "I-GPE",
                "O", "B-GPE", "O"
            ]
        );
    }

    #[test]
    fn test_head_then_children() {
        let doc = DocBuilder::new()
            .token(TokenData::new("New", "PROPN", "compound", 1))
            .token(TokenData::new("York", "PROPN", "compound", 2))
            .token(TokenData::new("Times", "PROPN", "ROOT", 2))
            .entity(1, 2, "GPE")
            .build()
            .unwrap();
        let extended = extend_entity_span(&doc, ExtensionConfig::new(true, true), None);
        assert_eq!(tags_of(&extended), vec!["B-GPE", "I-GPE", "I-GPE"]);
        let head_only = extend_entity_span(&doc, ExtensionConfig::new(true, false), None);
        assert_eq!(tags_of(&head_only), vec!["O", "B-GPE", "I-GPE"]);
    }

    #[test]
    fn test_compound_cycle_terminates() {
        let doc = DocBuilder::new()
            .token(TokenData::new("a", "PROPN", "compound", 1))
            .token(TokenData::new("b", "PROPN", "compound", 0))
            .entity(0, 1, "ORG")
            .build()
            .unwrap();
        let extended = extend_entity_span(&doc, ExtensionConfig::new(true, true), None);
        assert_eq!(tags_of(&extended), vec!["B-ORG", "I-ORG"]);
    }
}
