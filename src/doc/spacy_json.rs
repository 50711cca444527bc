use super::{Doc, EntitySpan, TokenData};
use crate::error::SynevalError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Token of a pipeline document. Offsets are character offsets into the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacyToken {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub dep: String,
    pub head: usize,
}

/// Named entity of a pipeline document, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacyEntity {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// A document in the JSON layout of the external pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacyDoc {
    pub text: String,
    pub tokens: Vec<SpacyToken>,
    #[serde(default)]
    pub ents: Vec<SpacyEntity>,
}

impl TryFrom<SpacyDoc> for Doc {
    type Error = SynevalError;
    fn try_from(value: SpacyDoc) -> Result<Self, Self::Error> {
        let chars: Vec<char> = value.text.chars().collect();
        let mut starts = AHashMap::with_capacity(value.tokens.len());
        let mut ends = AHashMap::with_capacity(value.tokens.len());
        let mut tokens = Vec::with_capacity(value.tokens.len());
        for (i, token) in value.tokens.into_iter().enumerate() {
            if token.start > token.end || token.end > chars.len() {
                return Err(SynevalError::SpanOutOfBounds {
                    start: token.start,
                    end: token.end,
                    len: chars.len(),
                });
            }
            starts.insert(token.start, i);
            ends.insert(token.end, i + 1);
            tokens.push(TokenData {
                text: chars[token.start..token.end].iter().collect(),
                whitespace: chars.get(token.end) == Some(&' '),
                tag: token.tag,
                pos: token.pos,
                lemma: token.lemma,
                dep: token.dep,
                head: token.head,
            });
        }
        let ents = value
            .ents
            .into_iter()
            .map(|ent| match (starts.get(&ent.start), ends.get(&ent.end)) {
                (Some(&start), Some(&end)) => Ok(EntitySpan {
                    start,
                    end,
                    label: ent.label,
                }),
                _ => Err(SynevalError::MisalignedEntity {
                    label: ent.label,
                    start: ent.start,
                    end: ent.end,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Doc::new(tokens, ents)
    }
}

impl From<&Doc> for SpacyDoc {
    fn from(doc: &Doc) -> Self {
        let mut offset = 0;
        let mut offsets = Vec::with_capacity(doc.len());
        let tokens = doc
            .token_data()
            .iter()
            .enumerate()
            .map(|(id, token)| {
                let start = offset;
                let end = start + token.text.chars().count();
                offset = end + usize::from(token.whitespace);
                offsets.push((start, end));
                SpacyToken {
                    id,
                    start,
                    end,
                    tag: token.tag.clone(),
                    pos: token.pos.clone(),
                    lemma: token.lemma.clone(),
                    dep: token.dep.clone(),
                    head: token.head,
                }
            })
            .collect();
        let ents = doc
            .entity_spans()
            .iter()
            .map(|e| SpacyEntity {
                start: offsets[e.start].0,
                end: offsets[e.end - 1].1,
                label: e.label.clone(),
            })
            .collect();
        SpacyDoc {
            text: doc.text(),
            tokens,
            ents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::steve_jobs;
    use super::*;
    use crate::doc::EntIob;

    const PARIS: &str = r#"{"text":"Visit Paris now!","tokens":[
        {"id":0,"start":0,"end":5,"tag":"VB","pos":"VERB","lemma":"visit","dep":"ROOT","head":0},
        {"id":1,"start":6,"end":11,"tag":"NNP","pos":"PROPN","lemma":"Paris","dep":"dobj","head":0},
        {"id":2,"start":12,"end":15,"tag":"RB","pos":"ADV","lemma":"now","dep":"advmod","head":0},
        {"id":3,"start":15,"end":16,"tag":".","pos":"PUNCT","lemma":"!","dep":"punct","head":0}],
        "ents":[{"start":6,"end":11,"label":"GPE"}]}"#;

    #[test]
    fn test_from_spacy_json() {
        let doc = Doc::from_spacy_json(PARIS).unwrap();
        assert_eq!(doc.words(), vec!["Visit", "Paris", "now", "!"]);
        assert_eq!(doc.text(), "Visit Paris now!");
        let paris = doc.token(1).unwrap();
        assert_eq!(paris.ent_iob(), EntIob::B);
        assert_eq!(paris.ent_type(), "GPE");
        assert_eq!(paris.head().text(), "Visit");
        assert!(doc.token(0).unwrap().is_root());
        assert!(!doc.token(2).unwrap().whitespace());
    }

    #[test]
    fn test_multibyte_offsets() {
        let json = r#"{"text":"Café Müller","tokens":[
            {"id":0,"start":0,"end":4,"pos":"PROPN","dep":"compound","head":1},
            {"id":1,"start":5,"end":11,"pos":"PROPN","dep":"ROOT","head":1}],
            "ents":[{"start":0,"end":11,"label":"ORG"}]}"#;
        let doc = Doc::from_spacy_json(json).unwrap();
        assert_eq!(doc.words(), vec!["Café", "Müller"]);
        assert_eq!(doc.ents().next().unwrap().text(), "Café Müller");
    }

    #[test]
    fn test_misaligned_entity() {
        let json = PARIS.replace(r#""start":6,"end":11,"label""#, r#""start":7,"end":11,"label""#);
        assert!(matches!(
            Doc::from_spacy_json(&json),
            Err(SynevalError::MisalignedEntity { start: 7, .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Doc::from_spacy_json("{\"text\": 3}"),
            Err(SynevalError::Json(_))
        ));
    }

    #[test]
    fn test_back_and_forth() {
        let doc = steve_jobs();
        let raw = SpacyDoc::from(&doc);
        assert_eq!(raw.ents[1].start, 8);
        assert_eq!(raw.ents[1].end, 18);
        let parsed = Doc::try_from(raw).unwrap();
        assert_eq!(parsed, doc);
    }
}
