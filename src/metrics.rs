/*!
Precision, recall, F-score and support, computed per token or per chunk.
*/
use crate::config::EvaluationConfig;
use crate::entity::{Chunks, ParsingError};
use crate::reporter::{
    Average, ChunkReport, ClassMetrics, Reporter, TokenReport, MACRO_AVG, TOTAL, WEIGHTED_AVG,
};
use ahash::AHashMap;
use core::fmt;
use itertools::multizip;
use ndarray::{prelude::*, Zip};
use ndarray_stats::{errors::MultiInputError, SummaryStatisticsExt};
use num::Num;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

const WARN_FOR: [Metric; 2] = [Metric::Precision, Metric::Recall];

#[derive(Debug, PartialEq, Hash, Clone, Copy)]
enum Metric {
    Precision,
    Recall,
    /// CoNLL conventions, silently applied
    ChunkPrecision,
    ChunkRecall,
}
impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DivByZeroStrat {
    /// The ill-defined metric is set to `1`
    ReplaceBy1,
    /// Returns an error
    ReturnError,
    /// The ill-defined metric is set to `0`
    #[default]
    ReplaceBy0,
}

impl Display for DivByZeroStrat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReplaceBy1 => "one",
            Self::ReturnError => "error",
            Self::ReplaceBy0 => "zero",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingDivisionByZeroStrategyError(String);

impl Display for ParsingDivisionByZeroStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not parse the {} into a a `DivByZeroStrat`",
            self.0
        )
    }
}
impl Error for ParsingDivisionByZeroStrategyError {}

impl FromStr for DivByZeroStrat {
    type Err = ParsingDivisionByZeroStrategyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "replaceby1" | "replacebyone" | "one" | "1" => Ok(DivByZeroStrat::ReplaceBy1),
            "replaceby0" | "replacebyzero" | "zero" | "0" => Ok(DivByZeroStrat::ReplaceBy0),
            "returnerror" | "error" => Ok(DivByZeroStrat::ReturnError),
            _ => Err(ParsingDivisionByZeroStrategyError(String::from(s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionByZeroError;

impl Display for DivisionByZeroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Encountered division by zero")
    }
}

impl Error for DivisionByZeroError {}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Error type to represent when two lists or arrays are not of the
/// same length (when they should be).
pub struct InconsistentLengthError(pub usize, pub usize);

impl Display for InconsistentLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inconsistent length between two lists. `y_true` is length {}, `y_pred` is length {}",
            self.0, self.1
        )
    }
}
impl Error for InconsistentLengthError {}

#[derive(Debug, Clone)]
/// Enum error encompassing many type of failures that could happen when computing the precison,
/// recall, f-score and the support.
pub enum ComputationError {
    InconsistentLength(InconsistentLengthError),
    Parsing(ParsingError),
    DivisionByZero(DivisionByZeroError),
    InputError(MultiInputError),
    EmptyArray(String),
}
impl Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentLength(length_err) => std::fmt::Display::fmt(length_err, f),
            Self::Parsing(parsing_err) => std::fmt::Display::fmt(parsing_err, f),
            Self::DivisionByZero(div_err) => std::fmt::Display::fmt(div_err, f),
            Self::InputError(input_err) => std::fmt::Display::fmt(input_err, f),
            Self::EmptyArray(empty_err) => write!(f, "Found an empty array in {}", empty_err),
        }
    }
}
impl Error for ComputationError {}

impl From<InconsistentLengthError> for ComputationError {
    fn from(value: InconsistentLengthError) -> Self {
        Self::InconsistentLength(value)
    }
}
impl From<ParsingError> for ComputationError {
    fn from(value: ParsingError) -> Self {
        Self::Parsing(value)
    }
}
impl From<DivisionByZeroError> for ComputationError {
    fn from(value: DivisionByZeroError) -> Self {
        Self::DivisionByZero(value)
    }
}
impl From<MultiInputError> for ComputationError {
    fn from(value: MultiInputError) -> Self {
        Self::InputError(value)
    }
}

pub(crate) fn check_consistent_length<T, U>(
    y_true: &[Vec<T>],
    y_pred: &[Vec<U>],
) -> Result<(), InconsistentLengthError> {
    if y_true.len() != y_pred.len() {
        return Err(InconsistentLengthError(y_true.len(), y_pred.len()));
    }
    for (t, p) in y_true.iter().zip(y_pred) {
        if t.len() != p.len() {
            return Err(InconsistentLengthError(t.len(), p.len()));
        }
    }
    Ok(())
}

/// `true` where the denominator is zero.
type ZeroMask<D> = Array<bool, D>;

/// Divides elementwise, leaving `0` wherever the denominator is `0`. The second return value marks
/// those cells.
fn prf_divide_results_and_mask<I: Num + Copy, D: Dimension>(
    numerator: ArrayView<I, D>,
    denominator: ArrayView<I, D>,
) -> (Array<I, D>, ZeroMask<D>) {
    let mask = denominator.mapv(|d| d == I::zero());
    let result = Zip::from(&numerator)
        .and(&denominator)
        .map_collect(|&n, &d| if d == I::zero() { I::zero() } else { n / d });
    (result, mask)
}

/// Parallel version of `prf_divide_results_and_mask`.
fn par_prf_divide_results_and_mask<I: Num + Copy + Send + Sync, D: Dimension>(
    numerator: ArrayView<I, D>,
    denominator: ArrayView<I, D>,
) -> (Array<I, D>, ZeroMask<D>) {
    let mut mask = Array::from_elem(denominator.raw_dim(), false);
    Zip::from(&mut mask)
        .and(&denominator)
        .par_for_each(|m, &d| *m = d == I::zero());
    let result = Zip::from(&numerator)
        .and(&denominator)
        .par_map_collect(|&n, &d| if d == I::zero() { I::zero() } else { n / d });
    (result, mask)
}

/// Helper function to overwrite the masked cells of an array.
fn replace_masked<I: Copy + Send + Sync, D: Dimension>(
    array: &mut Array<I, D>,
    mask: &ZeroMask<D>,
    new_value: I,
    parallel: bool,
) {
    let zip = Zip::from(array).and(mask);
    if parallel {
        zip.par_for_each(|v, &m| {
            if m {
                *v = new_value
            }
        });
    } else {
        zip.for_each(|v, &m| {
            if m {
                *v = new_value
            }
        });
    }
}

fn prf_divide<I: Num + Copy + Send + Sync, D: Dimension>(
    numerator: ArrayView<I, D>,
    denominator: ArrayView<I, D>,
    parallel: bool,
    metric: Metric,
    zero_division: DivByZeroStrat,
) -> Result<Array<I, D>, DivisionByZeroError> {
    let (mut result, mask) = if parallel {
        par_prf_divide_results_and_mask(numerator, denominator)
    } else {
        prf_divide_results_and_mask(numerator, denominator)
    };
    let zeros = mask.iter().filter(|&&m| m).count();
    if zeros == 0 {
        return Ok(result);
    }
    match zero_division {
        DivByZeroStrat::ReturnError => return Err(DivisionByZeroError),
        DivByZeroStrat::ReplaceBy1 => replace_masked(&mut result, &mask, I::one(), parallel),
        DivByZeroStrat::ReplaceBy0 => (),
    }
    if WARN_FOR.contains(&metric) {
        warn!(
            %metric,
            labels = zeros,
            strategy = ?zero_division,
            "ill-defined metric, encountered a division by zero"
        );
    }
    Ok(result)
}

/// `2pr / (p + r)`, or `0` when `p + r == 0`.
fn fscore(precision: &Array1<f32>, recall: &Array1<f32>) -> Array1<f32> {
    Zip::from(precision)
        .and(recall)
        .map_collect(|&p, &r| if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) })
}

/// Token-level classification report over the flattened tag sequences. Each distinct tag, `O`
/// included, is a class.
pub fn token_report<S: AsRef<str>>(
    y_true: &[Vec<S>],
    y_pred: &[Vec<S>],
    config: &EvaluationConfig,
) -> Result<TokenReport, ComputationError> {
    check_consistent_length(y_true, y_pred)?;
    let flat_true: Vec<&str> = y_true.iter().flatten().map(|t| t.as_ref()).collect();
    let flat_pred: Vec<&str> = y_pred.iter().flatten().map(|t| t.as_ref()).collect();
    if flat_true.is_empty() {
        return Err(ComputationError::EmptyArray(String::from("y_true")));
    }
    let target_names: BTreeSet<&str> = flat_true.iter().chain(&flat_pred).copied().collect();
    let index: AHashMap<&str, usize> = target_names
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i))
        .collect();

    let n_labels = target_names.len();
    let mut tp_sum = Array1::<f32>::zeros(n_labels);
    let mut pred_sum = Array1::<f32>::zeros(n_labels);
    let mut true_sum = Array1::<f32>::zeros(n_labels);
    for (t, p) in flat_true.iter().zip(&flat_pred) {
        // Every tag is a key of the index
        let (ti, pi) = (index[t], index[p]);
        true_sum[ti] += 1.0;
        pred_sum[pi] += 1.0;
        if ti == pi {
            tp_sum[ti] += 1.0;
        }
    }

    let parallel = config.parallel();
    let zero_division = config.zero_division();
    let precision = prf_divide(
        tp_sum.view(),
        pred_sum.view(),
        parallel,
        Metric::Precision,
        zero_division,
    )?;
    let recall = prf_divide(
        tp_sum.view(),
        true_sum.view(),
        parallel,
        Metric::Recall,
        zero_division,
    )?;
    let f_score = fscore(&precision, &recall);

    let mut reporter = Reporter::default();
    for (name, p, r, f, s) in multizip((
        target_names.iter(),
        precision.iter(),
        recall.iter(),
        f_score.iter(),
        true_sum.iter(),
    )) {
        reporter.insert(ClassMetrics::new(*name, Average::None, *p, *r, *f, *s as usize));
    }

    let support = flat_true.len();
    let empty = || ComputationError::EmptyArray(String::from("labels"));
    reporter.insert(ClassMetrics::new(
        MACRO_AVG,
        Average::Macro,
        precision.mean().ok_or_else(empty)?,
        recall.mean().ok_or_else(empty)?,
        f_score.mean().ok_or_else(empty)?,
        support,
    ));
    reporter.insert(ClassMetrics::new(
        WEIGHTED_AVG,
        Average::Weighted,
        precision.weighted_mean(&true_sum)?,
        recall.weighted_mean(&true_sum)?,
        f_score.weighted_mean(&true_sum)?,
        support,
    ));
    let accuracy = tp_sum.sum() / support as f32;
    Ok(TokenReport {
        reporter,
        accuracy,
        support,
        digits: config.digits(),
    })
}

/// `(ref, hyp, correct)` chunk counts of one class.
fn chunk_counts(refs: &Chunks<'_>, hyps: &Chunks<'_>, label: &str) -> (f32, f32, f32) {
    let ref_set = refs.filter(label);
    let hyp_set = hyps.filter(label);
    let correct = ref_set.intersection(&hyp_set).count();
    (ref_set.len() as f32, hyp_set.len() as f32, correct as f32)
}

/// CoNLL chunk-level evaluation: a chunk is correct when its boundaries and label both match.
/// Precision is `1` without hypothesis chunks, recall is `0` without reference chunks.
pub fn chunk_report<S: AsRef<str>>(
    refs: &[Vec<S>],
    hyps: &[Vec<S>],
    config: &EvaluationConfig,
) -> Result<ChunkReport, ComputationError> {
    check_consistent_length(refs, hyps)?;
    let otag = config.outside_tag();
    let ref_chunks = Chunks::try_from_sentences(refs, otag)?;
    let hyp_chunks = Chunks::try_from_sentences(hyps, otag)?;
    let target_names: BTreeSet<&str> = ref_chunks
        .labels()
        .union(&hyp_chunks.labels())
        .copied()
        .collect();

    // Per class, then the pooled total in the last cell
    let n = target_names.len() + 1;
    let mut ref_sum = Array1::<f32>::zeros(n);
    let mut hyp_sum = Array1::<f32>::zeros(n);
    let mut correct_sum = Array1::<f32>::zeros(n);
    for (i, label) in target_names.iter().enumerate() {
        let (r, h, c) = chunk_counts(&ref_chunks, &hyp_chunks, label);
        ref_sum[i] = r;
        hyp_sum[i] = h;
        correct_sum[i] = c;
    }
    ref_sum[n - 1] = ref_sum.slice(s![..n - 1]).sum();
    hyp_sum[n - 1] = hyp_sum.slice(s![..n - 1]).sum();
    correct_sum[n - 1] = correct_sum.slice(s![..n - 1]).sum();

    let parallel = config.parallel();
    let precision = prf_divide(
        correct_sum.view(),
        hyp_sum.view(),
        parallel,
        Metric::ChunkPrecision,
        DivByZeroStrat::ReplaceBy1,
    )?;
    let recall = prf_divide(
        correct_sum.view(),
        ref_sum.view(),
        parallel,
        Metric::ChunkRecall,
        DivByZeroStrat::ReplaceBy0,
    )?;
    let f_score = fscore(&precision, &recall);

    let mut reporter = Reporter::default();
    let names = target_names
        .iter()
        .map(|name| (*name, Average::None))
        .chain([(TOTAL, Average::Micro)]);
    for ((name, average), p, r, f, s) in multizip((
        names,
        precision.iter(),
        recall.iter(),
        f_score.iter(),
        ref_sum.iter(),
    )) {
        reporter.insert(ClassMetrics::new(name, average, *p, *r, *f, *s as usize));
    }
    Ok(ChunkReport {
        reporter,
        digits: config.digits(),
    })
}
