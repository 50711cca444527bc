use anyhow::Context;
use clap::Parser;
use serde_json::json;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use syneval::grouping::GroupCount;
use syneval::metrics::DivByZeroStrat;
use syneval::{
    corpus_labels, extend_entity_span, group_named_entities, read_corpus, EvaluationConfigBuilder,
    ExtensionConfig, HypothesisSource, LabelMap, NerEvaluator,
};
use syneval_cli::{init_tracing, PipelineArgs};
use tracing::info;

/// Evaluates the named entities of the pipeline against a CoNLL corpus, as predicted and extended
/// along `compound` arcs, and counts how the entities group into noun chunks. The label sets of
/// the corpus and of the pipeline are printed first.
#[derive(Debug, Parser)]
struct Args {
    /// CoNLL corpus, the tag in the last column
    corpus: PathBuf,
    /// Hypothesis sources to evaluate
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = enum_all_sources()
    )]
    sources: Vec<HypothesisSource>,
    /// JSON object mapping the pipeline labels to those of the corpus. An empty string drops a
    /// label. spaCy to CoNLL-2003 by default
    #[arg(long)]
    label_map: Option<PathBuf>,
    /// Column separator of the corpus
    #[arg(long, default_value = " ")]
    separator: String,
    /// Also evaluate the -DOCSTART- sentences
    #[arg(long)]
    keep_doc_start: bool,
    /// Value of the ill-defined token-level metrics: zero, one or error
    #[arg(long, default_value_t = DivByZeroStrat::ReplaceBy0)]
    zero_division: DivByZeroStrat,
    #[arg(long, default_value_t = 3)]
    digits: usize,
    /// Divide the metrics in parallel
    #[arg(long)]
    parallel: bool,
    /// Number of most common entity groups shown
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    pipeline: PipelineArgs,
}

fn enum_all_sources() -> Vec<HypothesisSource> {
    enum_iterator::all::<HypothesisSource>().collect()
}

fn join(labels: &BTreeSet<&str>) -> String {
    labels.iter().copied().collect::<Vec<_>>().join(" ")
}

fn print_counts(title: &str, counts: &[GroupCount]) {
    println!("{}", title);
    for c in counts {
        println!("  {:>6}  {}", c.count, c.group.join(" "));
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = EvaluationConfigBuilder::new()
        .division_by_zero(args.zero_division)
        .digits(args.digits)
        .separator(args.separator.as_str())
        .skip_doc_start(!args.keep_doc_start)
        .parallel(args.parallel)
        .build();
    info!("evaluation config:\n {}", config);

    let labels = match &args.label_map {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open the label map {}", path.display()))?;
            LabelMap::from_json_reader(BufReader::new(file))?
        }
        None => LabelMap::spacy_to_conll(),
    };
    let sentences = read_corpus(&args.corpus, config.separator(), config.skip_doc_start())?;
    let annotator = args.pipeline.annotator()?;

    let mut evaluator = NerEvaluator::new(annotator.as_ref(), Some(&labels), config);
    let reports = evaluator.run(&sentences, &args.sources)?;

    let reference_labels = corpus_labels(&sentences, evaluator.config().outside_tag());
    let emitted_native = evaluator.pipeline_labels(None);
    let emitted_converted = evaluator.pipeline_labels(Some(&labels));

    let example = evaluator.docs().first();
    let example_extended = example
        .map(|doc| extend_entity_span(doc, ExtensionConfig::new(true, true), None))
        .unwrap_or_default();
    let example_native = example
        .map(|doc| group_named_entities(doc, None))
        .unwrap_or_default();
    let example_converted = example
        .map(|doc| group_named_entities(doc, Some(&labels)))
        .unwrap_or_default();
    let native = evaluator.group_frequencies(None).most_common();
    let converted = evaluator.group_frequencies(Some(&labels)).most_common();
    let native: Vec<_> = native.into_iter().take(args.top).collect();
    let converted: Vec<_> = converted.into_iter().take(args.top).collect();

    if args.json {
        let output = json!({
            "corpus_labels": reference_labels,
            "pipeline_labels": {
                "native": emitted_native,
                "converted": emitted_converted,
            },
            "reports": reports,
            "extension_example": {
                "text": example.map(|doc| doc.text()),
                "tokens": example_extended,
            },
            "grouping_example": {
                "text": example.map(|doc| doc.text()),
                "native": example_native,
                "converted": example_converted,
            },
            "group_frequencies": {
                "native": native,
                "converted": converted,
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Corpus labels: {}", join(&reference_labels));
    println!("Pipeline labels (native): {}", join(&emitted_native));
    println!("Pipeline labels (converted): {}", join(&emitted_converted));
    println!();
    for report in &reports {
        println!("{}", report);
    }
    if let Some(doc) = example {
        println!("Extension example (head and children compounds): {}", doc.text());
        for token in &example_extended {
            println!("  {:<20} {}", token.text, token.tag);
        }
        println!();
        println!("Grouping example: {}", doc.text());
        println!("  native: {:?}", example_native);
        println!("  converted: {:?}", example_converted);
        println!();
    }
    print_counts("Most common entity groups (native labels):", &native);
    print_counts("Most common entity groups (converted labels):", &converted);
    Ok(())
}
