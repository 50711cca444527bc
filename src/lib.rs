//! Analyses built on top of the output of a pretrained NLP pipeline (tokens, part-of-speech tags,
//! dependency parse and named entities). The library walks dependency trees (paths from the root,
//! subtrees, span heads, core arguments), groups named entities by noun chunk, re-aligns the
//! pipeline tokens with a whitespace-tokenized reference and evaluates the recognized entities
//! against a CoNLL corpus, token by token and chunk by chunk.
//!
//! The pipeline itself is external: its documents are read in the spaCy JSON format, either from a
//! JSON-lines file produced ahead of time or from a subprocess (see [`annotate`]).

pub mod alignment;
pub mod annotate;
pub mod config;
pub mod conll;
pub mod dependency;
pub mod detokenize;
pub mod doc;
pub mod entity;
pub mod error;
pub mod evaluation;
pub mod extension;
pub mod grouping;
pub mod labels;
pub mod metrics;
pub mod reporter;

pub use alignment::{join_subword_tokens, pipeline_tags, TaggedToken};
pub use annotate::{Annotator, CommandAnnotator, PrecomputedAnnotator};
pub use config::{EvaluationConfig, EvaluationConfigBuilder};
pub use conll::{corpus_labels, parse_corpus, read_corpus, ConllSentence};
pub use dependency::{
    core_arguments, dependency_paths, dependents_subtrees, forms_subtree, span_head,
    CoreArguments, Segment, SentenceAnalyzer,
};
pub use detokenize::detokenize;
pub use doc::{Doc, DocBuilder, EntIob, Span, Token, TokenData};
pub use entity::{Chunk, Chunks, Prefix};
pub use error::{Result, SynevalError};
pub use evaluation::{evaluate, hypothesis, EvaluationReport, HypothesisSource, NerEvaluator};
pub use extension::{extend_entity_span, ExtensionConfig};
pub use grouping::{group_named_entities, GroupFrequencies};
pub use labels::LabelMap;
pub use metrics::{chunk_report, token_report, DivByZeroStrat};
pub use reporter::{Average, ChunkReport, ClassMetrics, Reporter, TokenReport};
