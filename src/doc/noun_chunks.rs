use super::{Doc, Span};

const NP_LABEL: &str = "NP";
const CONJ: &str = "conj";
const NP_DEPS: [&str; 10] = [
    "oprd",
    "nsubj",
    "dobj",
    "nsubjpass",
    "pcomp",
    "pobj",
    "dative",
    "appos",
    "attr",
    "ROOT",
];

fn is_nominal(pos: &str) -> bool {
    matches!(pos, "NOUN" | "PROPN" | "PRON")
}

/// English base noun phrases. A chunk runs from the left edge of a nominal word to the word itself
/// and chunks never overlap.
pub(super) fn noun_chunks(doc: &Doc) -> Vec<Span<'_>> {
    let mut chunks = Vec::new();
    let mut prev_end: Option<usize> = None;
    for word in doc.tokens() {
        if !is_nominal(word.pos()) {
            continue;
        }
        let left_edge = word.left_edge().i();
        if prev_end.is_some_and(|end| left_edge <= end) {
            continue;
        }
        let is_chunk = if NP_DEPS.contains(&word.dep()) {
            true
        } else if word.dep() == CONJ {
            let mut head = word.head();
            let mut steps = 0;
            while head.dep() == CONJ && head.head().i() < head.i() && steps < doc.len() {
                head = head.head();
                steps += 1;
            }
            NP_DEPS.contains(&head.dep())
        } else {
            false
        };
        if is_chunk {
            prev_end = Some(word.i());
            chunks.push(Span::labelled(doc, left_edge, word.i() + 1, NP_LABEL));
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{DocBuilder, TokenData};
    use rstest::rstest;

    fn bounds(doc: &super::Doc) -> Vec<(usize, usize)> {
        doc.noun_chunks()
            .iter()
            .map(|c| (c.start(), c.end()))
            .collect()
    }

    #[rstest]
    #[case(steve_jobs(), vec![(0, 4), (8, 10), (11, 12)])]
    #[case(telescope(), vec![(0, 1), (2, 4), (5, 7), (8, 9), (12, 14)])]
    #[case(new_york_times(), vec![(0, 1), (2, 6)])]
    fn test_noun_chunks(#[case] doc: super::Doc, #[case] expected: Vec<(usize, usize)>) {
        assert_eq!(bounds(&doc), expected);
    }

    #[test]
    fn test_chunks_are_labelled() {
        let doc = telescope();
        assert!(doc.noun_chunks().iter().all(|c| c.label() == Some("NP")));
        assert_eq!(doc.noun_chunks()[1].text(), "a man");
    }

    #[test]
    fn test_conjuncts() {
        // "cats and dogs sleep"
        let doc = DocBuilder::new()
            .token(TokenData::new("cats", "NOUN", "nsubj", 3))
            .token(TokenData::new("and", "CCONJ", "cc", 0))
            .token(TokenData::new("dogs", "NOUN", "conj", 0))
            .token(TokenData::new("sleep", "VERB", "ROOT", 3))
            .build()
            .unwrap();
        assert_eq!(bounds(&doc), vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn test_non_argument_nouns_are_skipped() {
        // "yesterday" is an adverbial modifier, not a chunk
        let doc = new_york_times();
        assert!(doc.noun_chunks().iter().all(|c| c.start() != 6));
    }
}
