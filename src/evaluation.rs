/*!
End-to-end NER experiment: the sentences of a CoNLL corpus go through the pipeline, the resulting
entities are turned into hypothesis tags (as predicted, or extended along `compound` arcs) and
scored against the reference, token by token and chunk by chunk.
*/
use crate::alignment::{join_subword_tokens, pipeline_tags, TaggedToken};
use crate::annotate::Annotator;
use crate::config::EvaluationConfig;
use crate::conll::ConllSentence;
use crate::doc::Doc;
use crate::error::{Result, SynevalError};
use crate::extension::{extend_entity_span, ExtensionConfig};
use crate::grouping::GroupFrequencies;
use crate::labels::{convert, LabelMap};
use crate::metrics::{chunk_report, token_report};
use crate::reporter::{ChunkReport, TokenReport};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, warn};

/// Where the hypothesis tags come from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisSource {
    /// Entities as recognized by the pipeline
    Pipeline,
    HeadCompound,
    ChildrenCompound,
    HeadAndChildrenCompound,
}

impl HypothesisSource {
    /// The compound arcs followed by this source, if any.
    pub fn extension(self) -> Option<ExtensionConfig> {
        match self {
            HypothesisSource::Pipeline => None,
            HypothesisSource::HeadCompound => Some(ExtensionConfig::new(true, false)),
            HypothesisSource::ChildrenCompound => Some(ExtensionConfig::new(false, true)),
            HypothesisSource::HeadAndChildrenCompound => Some(ExtensionConfig::new(true, true)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisSource::Pipeline => "pipeline",
            HypothesisSource::HeadCompound => "head_compound",
            HypothesisSource::ChildrenCompound => "children_compound",
            HypothesisSource::HeadAndChildrenCompound => "head_and_children_compound",
        }
    }
}

impl Display for HypothesisSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParsingError(String);

impl Display for SourceParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unknown hypothesis source `{}`, expected one of: {}",
            self.0,
            enum_iterator::all::<HypothesisSource>()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
impl std::error::Error for SourceParsingError {}

impl FromStr for HypothesisSource {
    type Err = SourceParsingError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        enum_iterator::all::<HypothesisSource>()
            .find(|source| source.as_str() == normalized)
            .ok_or_else(|| SourceParsingError(String::from(s)))
    }
}

/// Hypothesis tags of one document, re-aligned on whitespace-separated words.
pub fn hypothesis(
    doc: &Doc,
    source: HypothesisSource,
    labels: Option<&LabelMap>,
) -> Vec<TaggedToken> {
    let tags = match source.extension() {
        None => pipeline_tags(doc, labels),
        Some(config) => extend_entity_span(doc, config, labels)
            .into_iter()
            .map(|t| t.tag)
            .collect(),
    };
    join_subword_tokens(doc, &tags)
}

/// Scores of one hypothesis source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub source: HypothesisSource,
    pub token_level: TokenReport,
    pub chunk_level: ChunkReport,
}

impl Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "== {} ==", self.source)?;
        writeln!(f, "{}", self.token_level)?;
        write!(f, "{}", self.chunk_level)
    }
}

fn tags_of(sentences: &[Vec<TaggedToken>]) -> Vec<Vec<&str>> {
    sentences
        .iter()
        .map(|s| s.iter().map(|t| t.tag.as_str()).collect())
        .collect()
}

/// Scores aligned reference and hypothesis sentences. Both sides must hold the same number of
/// sentences, and each pair of sentences the same number of tokens.
pub fn evaluate(
    source: HypothesisSource,
    references: &[Vec<TaggedToken>],
    hypotheses: &[Vec<TaggedToken>],
    config: &EvaluationConfig,
) -> Result<EvaluationReport> {
    if references.len() != hypotheses.len() {
        return Err(SynevalError::SizeMismatch {
            what: String::from("corpus"),
            reference: references.len(),
            hypothesis: hypotheses.len(),
        });
    }
    for (i, (r, h)) in references.iter().zip(hypotheses).enumerate() {
        if r.len() != h.len() {
            return Err(SynevalError::SizeMismatch {
                what: format!("sentence {}", i),
                reference: r.len(),
                hypothesis: h.len(),
            });
        }
    }
    let y_true = tags_of(references);
    let y_pred = tags_of(hypotheses);
    Ok(EvaluationReport {
        source,
        token_level: token_report(&y_true, &y_pred, config)?,
        chunk_level: chunk_report(&y_true, &y_pred, config)?,
    })
}

/// Runs the pipeline over a reference corpus and scores its entities.
pub struct NerEvaluator<'a, A: Annotator + ?Sized> {
    annotator: &'a A,
    labels: Option<&'a LabelMap>,
    config: EvaluationConfig,
    docs: Vec<Doc>,
}

impl<'a, A: Annotator + ?Sized> NerEvaluator<'a, A> {
    /// `labels` converts the pipeline labels into those of the reference corpus.
    pub fn new(annotator: &'a A, labels: Option<&'a LabelMap>, config: EvaluationConfig) -> Self {
        NerEvaluator {
            annotator,
            labels,
            config,
            docs: Vec::new(),
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Documents of the last run.
    pub fn docs(&self) -> &[Doc] {
        &self.docs
    }

    /// Annotates every sentence in a single batch, then scores each source.
    pub fn run(
        &mut self,
        sentences: &[ConllSentence],
        sources: &[HypothesisSource],
    ) -> Result<Vec<EvaluationReport>> {
        let texts: Vec<String> = sentences.iter().map(ConllSentence::text).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        debug!(sentences = texts.len(), "annotating the reference corpus");
        self.docs = self.annotator.annotate_batch(&texts)?;
        self.evaluate_docs(sentences, sources)
    }

    /// Scores the documents of the last run. Sentences whose pipeline tokens cannot be re-aligned
    /// with the reference words are left out, with a warning.
    pub fn evaluate_docs(
        &self,
        sentences: &[ConllSentence],
        sources: &[HypothesisSource],
    ) -> Result<Vec<EvaluationReport>> {
        if sentences.len() != self.docs.len() {
            return Err(SynevalError::SizeMismatch {
                what: String::from("documents"),
                reference: sentences.len(),
                hypothesis: self.docs.len(),
            });
        }
        let mut reports = Vec::with_capacity(sources.len());
        for &source in sources {
            let mut references = Vec::with_capacity(sentences.len());
            let mut hypotheses = Vec::with_capacity(sentences.len());
            for (i, (sentence, doc)) in sentences.iter().zip(&self.docs).enumerate() {
                let reference = sentence.tagged();
                let hyp = hypothesis(doc, source, self.labels);
                if reference.len() != hyp.len() {
                    warn!(
                        sentence = i,
                        %source,
                        reference = reference.len(),
                        hypothesis = hyp.len(),
                        "dropping a sentence whose tokens cannot be aligned"
                    );
                    continue;
                }
                references.push(reference);
                hypotheses.push(hyp);
            }
            debug!(%source, sentences = references.len(), "scoring hypotheses");
            reports.push(evaluate(source, &references, &hypotheses, &self.config)?);
        }
        Ok(reports)
    }

    /// Entity group frequencies over the documents of the last run.
    pub fn group_frequencies(&self, labels: Option<&LabelMap>) -> GroupFrequencies {
        let mut frequencies = GroupFrequencies::new();
        for doc in &self.docs {
            frequencies.add_doc(doc, labels);
        }
        frequencies
    }

    /// Entity labels the pipeline emitted over the documents of the last run, converted with
    /// `labels` when given. Dropped labels are left out.
    pub fn pipeline_labels<'s>(&'s self, labels: Option<&'s LabelMap>) -> BTreeSet<&'s str> {
        self.docs
            .iter()
            .flat_map(|doc| doc.ents())
            .filter_map(|ent| ent.label())
            .filter_map(|label| convert(label, labels))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::PrecomputedAnnotator;
    use crate::conll::parse_corpus;
    use crate::doc::fixtures::{new_york_times, steve_jobs, telescope};
    use crate::doc::SpacyDoc;
    use crate::reporter::Average;
    use rstest::rstest;

    const CORPUS: &str = "-DOCSTART- O

Apple's B-ORG
Steve B-PER
Jobs I-PER
died O
in O
2011 O
in O
Palo B-LOC
Alto, I-LOC
California. B-LOC

She O
read O
the O
New B-ORG
York I-ORG
Times I-ORG
yesterday. O
";

    fn annotator() -> PrecomputedAnnotator {
        PrecomputedAnnotator::from_docs([&steve_jobs(), &new_york_times()].map(SpacyDoc::from))
            .unwrap()
    }

    #[rstest]
    #[case("pipeline", HypothesisSource::Pipeline)]
    #[case("head-compound", HypothesisSource::HeadCompound)]
    #[case("HEAD_AND_CHILDREN_COMPOUND", HypothesisSource::HeadAndChildrenCompound)]
    fn test_parse_source(#[case] input: &str, #[case] expected: HypothesisSource) {
        assert_eq!(input.parse::<HypothesisSource>().unwrap(), expected);
    }

    #[test]
    fn test_sources() {
        assert_eq!(enum_iterator::all::<HypothesisSource>().count(), 4);
        assert!("compound".parse::<HypothesisSource>().is_err());
        assert_eq!(HypothesisSource::Pipeline.extension(), None);
    }

    #[test]
    fn test_hypothesis() {
        let doc = new_york_times();
        let map = LabelMap::spacy_to_conll();
        let pipeline = hypothesis(&doc, HypothesisSource::Pipeline, Some(&map));
        let tags: Vec<_> = pipeline.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, vec!["O", "O", "O", "B-LOC", "I-LOC", "O", "O"]);
        assert_eq!(pipeline[6].text, "yesterday.");
        let extended = hypothesis(&doc, HypothesisSource::HeadCompound, Some(&map));
        let tags: Vec<_> = extended.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, vec!["O", "O", "O", "B-LOC", "I-LOC", "I-LOC", "O"]);
    }

    #[test]
    fn test_run() {
        let annotator = annotator();
        let map = LabelMap::spacy_to_conll();
        let sentences = parse_corpus(CORPUS, " ", true).unwrap();
        let mut evaluator = NerEvaluator::new(&annotator, Some(&map), EvaluationConfig::default());
        let reports = evaluator
            .run(
                &sentences,
                &[HypothesisSource::Pipeline, HypothesisSource::HeadCompound],
            )
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(evaluator.docs().len(), 2);

        // New York is a LOC for the pipeline, the reference has an ORG
        let pipeline = reports[0].chunk_level.total().unwrap();
        assert_eq!(pipeline.support, 5);
        assert!((pipeline.precision - 0.8).abs() < 1e-6);
        assert!((pipeline.recall - 0.8).abs() < 1e-6);
        assert_eq!(reports[0].token_level.support(), 17);
        let org = reports[0].chunk_level.reporter().get("ORG").unwrap();
        assert_eq!(org.support, 2);
        assert_eq!(org.recall, 0.5);

        let extended = &reports[1];
        assert_eq!(extended.source, HypothesisSource::HeadCompound);
        let loc = extended.token_level.reporter().get("I-LOC").unwrap();
        assert_eq!(loc.support, 1);
        assert!(extended
            .token_level
            .reporter()
            .overall(Average::Weighted)
            .is_some());
    }

    /// Answers every text with the same parse.
    struct Fixed(Doc);

    impl Annotator for Fixed {
        fn annotate(&self, _text: &str) -> Result<Doc> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_misaligned_sentences_are_dropped() {
        let annotator = Fixed(steve_jobs());
        let mut content = String::from(CORPUS);
        content.push_str("\nApple's B-ORG\nSteve B-PER\n");
        let sentences = parse_corpus(&content, " ", true).unwrap();
        assert_eq!(sentences.len(), 3);
        let mut evaluator = NerEvaluator::new(&annotator, None, EvaluationConfig::default());
        let reports = evaluator
            .run(&sentences, &[HypothesisSource::Pipeline])
            .unwrap();
        // Only the first sentence has as many words as the parse
        assert_eq!(reports[0].token_level.support(), 10);
    }

    #[test]
    fn test_every_sentence_misaligned() {
        let annotator = Fixed(telescope());
        let sentences = parse_corpus("Apple's B-ORG\n", " ", true).unwrap();
        let mut evaluator = NerEvaluator::new(&annotator, None, EvaluationConfig::default());
        assert!(matches!(
            evaluator.run(&sentences, &[HypothesisSource::Pipeline]),
            Err(SynevalError::Computation(_))
        ));
    }

    #[test]
    fn test_evaluate_size_mismatch() {
        let config = EvaluationConfig::default();
        let reference = vec![vec![TaggedToken::new("a", "O")]];
        let hypothesis = vec![vec![TaggedToken::new("a", "O"), TaggedToken::new("b", "O")]];
        assert!(matches!(
            evaluate(HypothesisSource::Pipeline, &reference, &hypothesis, &config),
            Err(SynevalError::SizeMismatch { .. })
        ));
        assert!(matches!(
            evaluate(HypothesisSource::Pipeline, &reference, &[], &config),
            Err(SynevalError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_group_frequencies() {
        let annotator = annotator();
        let map = LabelMap::spacy_to_conll();
        let sentences = parse_corpus(CORPUS, " ", true).unwrap();
        let mut evaluator = NerEvaluator::new(&annotator, Some(&map), EvaluationConfig::default());
        evaluator
            .run(&sentences, &[HypothesisSource::Pipeline])
            .unwrap();
        let conll = evaluator.group_frequencies(Some(&map));
        assert_eq!(conll.get(&["ORG", "PER"]), 1);
        assert_eq!(conll.get(&["LOC"]), 3);
        let native = evaluator.group_frequencies(None);
        assert_eq!(native.get(&["GPE"]), 3);
        assert_eq!(native.get(&["DATE"]), 2);
    }
}
