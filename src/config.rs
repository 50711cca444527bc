/*
 * Quality of life structs to parametrize an evaluation run. Most importantly, it contains the
 * `EvaluationConfig` struct, which implements the default trait, and its builder.
*/
use crate::metrics::DivByZeroStrat;
use std::fmt::Display;

pub const DEFAULT_OUTSIDE_TAG: &str = "O";
pub const DEFAULT_SEPARATOR: &str = " ";
pub const DEFAULT_DIGITS: usize = 3;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
/// Parameters of the token-level and chunk-level evaluations and of the CoNLL reader.
pub struct EvaluationConfig {
    zero_division: DivByZeroStrat,
    digits: usize,
    outside_tag: String,
    separator: String,
    skip_doc_start: bool,
    parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            zero_division: DivByZeroStrat::ReplaceBy0,
            digits: DEFAULT_DIGITS,
            outside_tag: String::from(DEFAULT_OUTSIDE_TAG),
            separator: String::from(DEFAULT_SEPARATOR),
            skip_doc_start: true,
            parallel: false,
        }
    }
}

impl EvaluationConfig {
    /// Strategy used when a token-level precision or recall divides by zero
    pub fn zero_division(&self) -> DivByZeroStrat {
        self.zero_division
    }
    /// Number of digits printed in the reports
    pub fn digits(&self) -> usize {
        self.digits
    }
    pub fn outside_tag(&self) -> &str {
        &self.outside_tag
    }
    /// Column separator of the CoNLL files
    pub fn separator(&self) -> &str {
        &self.separator
    }
    pub fn skip_doc_start(&self) -> bool {
        self.skip_doc_start
    }
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

impl Display for EvaluationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Strategy when encountering a division by zero: {:?}\n Digits: {}\n Outside tag: {:?}\n Column separator: {:?}\n Skipping -DOCSTART- sentences: {}\n Using parallel computations: {}", self.zero_division, self.digits, self.outside_tag, self.separator, self.skip_doc_start, self.parallel);
        write!(f, "{}", string)
    }
}

/// This builder can be used to build and customize an `EvaluationConfig` structure.
#[derive(Debug, Clone, Default)]
pub struct EvaluationConfigBuilder {
    config: EvaluationConfig,
}

impl EvaluationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn division_by_zero(mut self, division_by_zero: DivByZeroStrat) -> Self {
        self.config.zero_division = division_by_zero;
        self
    }
    pub fn digits(mut self, digits: usize) -> Self {
        self.config.digits = digits;
        self
    }
    pub fn outside_tag(mut self, outside_tag: impl Into<String>) -> Self {
        self.config.outside_tag = outside_tag.into();
        self
    }
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.config.separator = separator.into();
        self
    }
    pub fn skip_doc_start(mut self, skip_doc_start: bool) -> Self {
        self.config.skip_doc_start = skip_doc_start;
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }
    pub fn build(self) -> EvaluationConfig {
        self.config
    }
}

impl From<EvaluationConfig> for EvaluationConfigBuilder {
    fn from(config: EvaluationConfig) -> Self {
        Self { config }
    }
}
