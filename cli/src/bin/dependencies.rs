use clap::Parser;
use serde_json::json;
use syneval::{Segment, SentenceAnalyzer};
use syneval_cli::{init_tracing, PipelineArgs};

/// Dependency-tree analyses of a sentence: paths from the root, subtrees, whether a span forms a
/// subtree, head of the span and core arguments of the main verb.
#[derive(Debug, Parser)]
struct Args {
    /// Sentence to analyse
    sentence: String,
    /// First token of the example span
    #[arg(long, default_value_t = 0)]
    span_start: usize,
    /// End (excluded) of the example span, the end of the sentence by default
    #[arg(long)]
    span_end: Option<usize>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    pipeline: PipelineArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let annotator = args.pipeline.annotator()?;
    let analyzer = SentenceAnalyzer::new(annotator.as_ref());

    let doc = analyzer.parse(&args.sentence)?;
    let span = doc.span(args.span_start, args.span_end.unwrap_or(doc.len()))?;
    let segment = Segment::from(span);

    let paths = syneval::dependency_paths(&doc)?;
    let subtrees = syneval::dependents_subtrees(&doc);
    let is_subtree = syneval::forms_subtree(&doc, &segment, annotator.as_ref())?;
    let head = analyzer.span_head(&segment)?;
    let arguments = syneval::core_arguments(&doc);

    if args.json {
        let output = json!({
            "sentence": doc.text(),
            "dependency_paths": paths,
            "dependents_subtrees": subtrees,
            "span": span.words(),
            "forms_subtree": is_subtree,
            "span_head": head,
            "core_arguments": arguments,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Sentence: {}", doc.text());
    println!("\nDependency paths:");
    for path in &paths {
        println!("  {}", path.join(" "));
    }
    println!("\nSubtrees:");
    for (token, subtree) in doc.tokens().zip(&subtrees) {
        println!("  {}: {}", token.text(), subtree.join(" "));
    }
    println!("\nSpan: {}", span);
    println!("  forms a subtree: {}", is_subtree);
    println!("  head: {}", head);
    println!("\nCore arguments:");
    println!("  nsubj: {}", arguments.nsubj.join(" "));
    println!("  dobj: {}", arguments.dobj.join(" "));
    println!("  iobj: {}", arguments.iobj.join(" "));
    Ok(())
}
