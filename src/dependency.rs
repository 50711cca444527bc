/*!
Analyses of the dependency parse of a sentence: paths from the root, subtrees, head of a span and
core arguments of the main verb.
*/
use crate::annotate::Annotator;
use crate::detokenize::detokenize;
use crate::doc::{Doc, Span, Token, ROOT_LABEL};
use crate::error::{Result, SynevalError};
use serde::Serialize;

/// For every token, the dependency relations from the sentence root down to the token, such as
/// `[ROOT, --ROOT-->, saw, --nsubj-->, I]`.
pub fn dependency_paths(doc: &Doc) -> Result<Vec<Vec<String>>> {
    let mut paths = Vec::with_capacity(doc.len());
    for token in doc.tokens() {
        let mut path = vec![token.text().to_string(), format!("--{}-->", token.dep())];
        let mut current = token;
        let mut steps = 0;
        while current.dep() != ROOT_LABEL && !current.is_root() {
            if steps >= doc.len() {
                return Err(SynevalError::MalformedTree(token.i()));
            }
            current = current.head();
            path.push(current.text().to_string());
            path.push(format!("--{}-->", current.dep()));
            steps += 1;
        }
        path.push(String::from(ROOT_LABEL));
        path.reverse();
        paths.push(path);
    }
    Ok(paths)
}

fn subtree_words(token: Token<'_>) -> Vec<String> {
    token
        .subtree()
        .iter()
        .map(|t| t.text().to_string())
        .collect()
}

/// For every token, the words of its subtree in sentence order.
pub fn dependents_subtrees(doc: &Doc) -> Vec<Vec<String>> {
    doc.tokens().map(subtree_words).collect()
}

/// A segment of text handed to the subtree and head analyses.
#[derive(Debug, Clone)]
pub enum Segment<'a> {
    Span(Span<'a>),
    Tokens(Vec<Token<'a>>),
    Words(Vec<&'a str>),
    /// Raw text, tokenized by the pipeline
    Text(&'a str),
}

impl<'a> From<Span<'a>> for Segment<'a> {
    fn from(value: Span<'a>) -> Self {
        Segment::Span(value)
    }
}

impl<'a> From<Vec<Token<'a>>> for Segment<'a> {
    fn from(value: Vec<Token<'a>>) -> Self {
        Segment::Tokens(value)
    }
}

impl<'a> From<Vec<&'a str>> for Segment<'a> {
    fn from(value: Vec<&'a str>) -> Self {
        Segment::Words(value)
    }
}

impl<'a> From<&'a str> for Segment<'a> {
    fn from(value: &'a str) -> Self {
        Segment::Text(value)
    }
}

impl Segment<'_> {
    fn words<A: Annotator + ?Sized>(&self, annotator: &A) -> Result<Vec<String>> {
        Ok(match self {
            Segment::Span(span) => span.words().into_iter().map(String::from).collect(),
            Segment::Tokens(tokens) => tokens.iter().map(|t| t.text().to_string()).collect(),
            Segment::Words(words) => words.iter().map(|w| w.to_string()).collect(),
            Segment::Text(text) => annotator
                .annotate(text)?
                .words()
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }
}

/// Does the ordered list of words of `segment` match the subtree of a token of `doc`?
pub fn forms_subtree<A: Annotator + ?Sized>(
    doc: &Doc,
    segment: &Segment<'_>,
    annotator: &A,
) -> Result<bool> {
    let words = segment.words(annotator)?;
    Ok(doc.tokens().any(|t| {
        let subtree = t.subtree();
        subtree.len() == words.len()
            && subtree
                .iter()
                .zip(&words)
                .all(|(t, w)| t.text() == w.as_str())
    }))
}

/// Text of the syntactic head of `segment`. A `Span` is answered from its own parse; token and word
/// lists are detokenized and parsed again on their own, as is raw text.
pub fn span_head<A: Annotator + ?Sized>(segment: &Segment<'_>, annotator: &A) -> Result<String> {
    let text = match segment {
        Segment::Span(span) => return Ok(span.root()?.text().to_string()),
        Segment::Tokens(tokens) => {
            detokenize(&tokens.iter().map(|t| t.text()).collect::<Vec<_>>())
        }
        Segment::Words(words) => detokenize(words),
        Segment::Text(text) => text.to_string(),
    };
    if text.trim().is_empty() {
        return Err(SynevalError::EmptySpan);
    }
    let doc = annotator.annotate(&text)?;
    let head = doc.as_span().root()?.text().to_string();
    Ok(head)
}

/// Subject, direct object and indirect object of the main verb, as the words of their subtrees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoreArguments {
    pub nsubj: Vec<String>,
    pub dobj: Vec<String>,
    pub iobj: Vec<String>,
}

/// Core arguments of the first `ROOT` token of `doc`. Several children with the same label have
/// their subtrees concatenated.
pub fn core_arguments(doc: &Doc) -> CoreArguments {
    let mut args = CoreArguments::default();
    let Some(root) = doc.tokens().find(|t| t.dep() == ROOT_LABEL) else {
        return args;
    };
    for child in root.children() {
        let target = match child.dep() {
            "nsubj" => &mut args.nsubj,
            "dobj" => &mut args.dobj,
            "iobj" => &mut args.iobj,
            _ => continue,
        };
        target.extend(subtree_words(child));
    }
    args
}

/// Runs the analyses on raw sentences, parsed through an annotator.
pub struct SentenceAnalyzer<'a, A: Annotator + ?Sized> {
    annotator: &'a A,
}

impl<'a, A: Annotator + ?Sized> SentenceAnalyzer<'a, A> {
    pub fn new(annotator: &'a A) -> Self {
        SentenceAnalyzer { annotator }
    }

    pub fn parse(&self, sentence: &str) -> Result<Doc> {
        self.annotator.annotate(sentence)
    }

    pub fn dependency_paths(&self, sentence: &str) -> Result<Vec<Vec<String>>> {
        dependency_paths(&self.parse(sentence)?)
    }

    pub fn dependents_subtrees(&self, sentence: &str) -> Result<Vec<Vec<String>>> {
        Ok(dependents_subtrees(&self.parse(sentence)?))
    }

    pub fn forms_subtree(&self, sentence: &str, segment: &Segment<'_>) -> Result<bool> {
        forms_subtree(&self.parse(sentence)?, segment, self.annotator)
    }

    pub fn span_head(&self, segment: &Segment<'_>) -> Result<String> {
        span_head(segment, self.annotator)
    }

    pub fn core_arguments(&self, sentence: &str) -> Result<CoreArguments> {
        Ok(core_arguments(&self.parse(sentence)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::PrecomputedAnnotator;
    use crate::doc::fixtures::telescope;
    use crate::doc::{DocBuilder, SpacyDoc, TokenData};
    use rstest::rstest;

    const SENTENCE: &str = "I saw a man with a telescope, he was looking at the Moon.";

    /// Parses of the sentence and of the segments that get parsed again.
    fn annotator() -> PrecomputedAnnotator {
        let segment = DocBuilder::new()
            .token(TokenData::new("a", "DET", "det", 1))
            .token(TokenData::new("man", "NOUN", "ROOT", 1))
            .token(TokenData::new("with", "ADP", "prep", 1))
            .token(TokenData::new("a", "DET", "det", 4))
            .token(TokenData::new("telescope", "NOUN", "pobj", 2).no_space())
            .build()
            .unwrap();
        let wrong = DocBuilder::new()
            .token(TokenData::new("a", "DET", "det", 1))
            .token(TokenData::new("telescope", "NOUN", "ROOT", 1).no_space())
            .token(TokenData::new(",", "PUNCT", "punct", 1).no_space())
            .build()
            .unwrap();
        PrecomputedAnnotator::from_docs([&telescope(), &segment, &wrong].map(SpacyDoc::from))
            .unwrap()
    }

    #[test]
    fn test_dependency_paths() {
        let paths = dependency_paths(&telescope()).unwrap();
        assert_eq!(paths.len(), 15);
        assert_eq!(paths[0], vec!["ROOT", "--ROOT-->", "saw", "--nsubj-->", "I"]);
        assert_eq!(paths[1], vec!["ROOT", "--ROOT-->", "saw"]);
        assert_eq!(
            paths[13],
            vec![
                "ROOT",
                "--ROOT-->",
                "saw",
                "--ccomp-->",
                "looking",
                "--prep-->",
                "at",
                "--pobj-->",
                "Moon"
            ]
        );
    }

    #[test]
    fn test_dependency_paths_cycle() {
        let doc = DocBuilder::new()
            .token(TokenData::new("a", "X", "dep", 1))
            .token(TokenData::new("b", "X", "dep", 0))
            .build()
            .unwrap();
        assert!(matches!(
            dependency_paths(&doc),
            Err(SynevalError::MalformedTree(0))
        ));
    }

    #[test]
    fn test_dependents_subtrees() {
        let subtrees = dependents_subtrees(&telescope());
        assert_eq!(subtrees[3], vec!["a", "man", "with", "a", "telescope"]);
        assert_eq!(subtrees[0], vec!["I"]);
        assert_eq!(subtrees[1].len(), 15);
    }

    #[rstest]
    #[case(2, 7, true)]
    #[case(5, 8, false)]
    #[case(12, 14, true)]
    fn test_forms_subtree_span(#[case] start: usize, #[case] end: usize, #[case] expected: bool) {
        let doc = telescope();
        let span = doc.span(start, end).unwrap();
        let annotator = annotator();
        assert_eq!(
            forms_subtree(&doc, &Segment::from(span), &annotator).unwrap(),
            expected
        );
        let tokens: Vec<_> = span.tokens().collect();
        assert_eq!(
            forms_subtree(&doc, &Segment::from(tokens), &annotator).unwrap(),
            expected
        );
        assert_eq!(
            forms_subtree(&doc, &Segment::from(span.words()), &annotator).unwrap(),
            expected
        );
    }

    #[test]
    fn test_forms_subtree_text() {
        let doc = telescope();
        let annotator = annotator();
        assert!(forms_subtree(&doc, &Segment::Text("a man with a telescope"), &annotator).unwrap());
        assert!(!forms_subtree(&doc, &Segment::Text("a telescope,"), &annotator).unwrap());
    }

    #[test]
    fn test_span_head() {
        let doc = telescope();
        let annotator = annotator();
        let span = doc.span(2, 7).unwrap();
        assert_eq!(span_head(&Segment::from(span), &annotator).unwrap(), "man");
        assert_eq!(
            span_head(&Segment::from(span.words()), &annotator).unwrap(),
            "man"
        );
        assert_eq!(
            span_head(&Segment::from(span.tokens().collect::<Vec<_>>()), &annotator).unwrap(),
            "man"
        );
        assert_eq!(
            span_head(&Segment::Text("a telescope,"), &annotator).unwrap(),
            "telescope"
        );
    }

    #[test]
    fn test_span_head_empty() {
        let annotator = annotator();
        assert!(matches!(
            span_head(&Segment::Words(vec![]), &annotator),
            Err(SynevalError::EmptySpan)
        ));
        let doc = telescope();
        let empty = doc.span(4, 4).unwrap();
        assert!(matches!(
            span_head(&Segment::from(empty), &annotator),
            Err(SynevalError::EmptySpan)
        ));
    }

    #[test]
    fn test_core_arguments() {
        let args = core_arguments(&telescope());
        assert_eq!(args.nsubj, vec!["I"]);
        assert_eq!(args.dobj, vec!["a", "man", "with", "a", "telescope"]);
        assert!(args.iobj.is_empty());
    }

    #[test]
    fn test_sentence_analyzer() {
        let annotator = annotator();
        let analyzer = SentenceAnalyzer::new(&annotator);
        assert_eq!(analyzer.dependency_paths(SENTENCE).unwrap().len(), 15);
        assert_eq!(
            analyzer.core_arguments(SENTENCE).unwrap(),
            core_arguments(&telescope())
        );
        assert!(analyzer
            .forms_subtree(SENTENCE, &Segment::Text("a man with a telescope"))
            .unwrap());
        assert!(analyzer.dependency_paths("Not parsed.").is_err());
    }
}
