/**
Pretty-printing of the evaluation results. Token-level results are rendered as the usual
right-aligned classification report; chunk-level results as a `p r f s` table with a `total` row.
*/
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Display;

/// How the metrics of a row were obtained. Rows of single classes (`None`) come first.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Serialize, Deserialize)]
pub enum Average {
    None,
    /// Pooled counts, such as the CoNLL `total`
    Micro,
    Macro,
    Weighted,
}

impl Display for Average {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Metrics of a single class, or of an average over the classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// The class, such as "PER", "LOC", or the name of the average
    pub class: String,
    pub average: Average,
    pub precision: f32,
    pub recall: f32,
    pub fscore: f32,
    pub support: usize,
}

impl ClassMetrics {
    pub(crate) fn new(
        class: impl Into<String>,
        average: Average,
        precision: f32,
        recall: f32,
        fscore: f32,
        support: usize,
    ) -> Self {
        ClassMetrics {
            class: class.into(),
            average,
            precision,
            recall,
            fscore,
            support,
        }
    }
}

impl PartialEq for ClassMetrics {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.average == other.average
    }
}
impl Eq for ClassMetrics {}

impl PartialOrd for ClassMetrics {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassMetrics {
    fn cmp(&self, other: &Self) -> Ordering {
        self.average
            .cmp(&other.average)
            .then_with(|| self.class.cmp(&other.class))
    }
}

/// A class metrics acts as the line of a dataframe when displayed.
impl Display for ClassMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.class, self.precision, self.recall, self.fscore, self.support
        )
    }
}

/// Ordered collection of class metrics: single classes by name, then the averages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Reporter {
    classes: BTreeSet<ClassMetrics>,
}

impl Reporter {
    pub(crate) fn insert(&mut self, metrics: ClassMetrics) -> bool {
        self.classes.insert(metrics)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassMetrics> {
        self.classes.iter()
    }

    /// Rows of single classes.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMetrics> {
        self.classes.iter().filter(|c| c.average == Average::None)
    }

    pub fn get(&self, class: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.class == class)
    }

    pub fn overall(&self, average: Average) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.average == average)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Display for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Class, Precision, Recall, Fscore, Support")?;
        for v in self.classes.iter() {
            writeln!(f, "{}", v)?
        }
        Ok(())
    }
}

pub const MACRO_AVG: &str = "macro avg";
pub const WEIGHTED_AVG: &str = "weighted avg";
pub const TOTAL: &str = "total";

/// Token-level classification report: one row per tag, then accuracy, macro and weighted averages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenReport {
    pub(crate) reporter: Reporter,
    pub(crate) accuracy: f32,
    pub(crate) support: usize,
    #[serde(skip)]
    pub(crate) digits: usize,
}

impl TokenReport {
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn accuracy(&self) -> f32 {
        self.accuracy
    }

    /// Number of evaluated tokens.
    pub fn support(&self) -> usize {
        self.support
    }
}

impl Display for TokenReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.digits;
        let width = self
            .reporter
            .classes()
            .map(|c| c.class.chars().count())
            .chain([WEIGHTED_AVG.len(), digits])
            .max()
            .unwrap_or(WEIGHTED_AVG.len());
        write!(f, "{:>width$} ", "")?;
        for header in ["precision", "recall", "f1-score", "support"] {
            write!(f, " {:>9}", header)?;
        }
        writeln!(f, "\n")?;
        let row = |f: &mut std::fmt::Formatter<'_>, c: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}",
                c.class, c.precision, c.recall, c.fscore, c.support
            )
        };
        for class in self.reporter.classes() {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.digits$} {:>9}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        for average in [Average::Macro, Average::Weighted] {
            if let Some(c) = self.reporter.overall(average) {
                row(f, c)?;
            }
        }
        Ok(())
    }
}

/// Chunk-level results, per class and in total.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChunkReport {
    pub(crate) reporter: Reporter,
    #[serde(skip)]
    pub(crate) digits: usize,
}

impl ChunkReport {
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn total(&self) -> Option<&ClassMetrics> {
        self.reporter.overall(Average::Micro)
    }
}

impl Display for ChunkReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.digits;
        let width = self
            .reporter
            .iter()
            .map(|c| c.class.chars().count())
            .max()
            .unwrap_or(TOTAL.len());
        let col = (digits + 2).max(5);
        writeln!(
            f,
            "{:<width$} {:>col$} {:>col$} {:>col$} {:>col$}",
            "", "p", "r", "f", "s"
        )?;
        for c in self.reporter.iter() {
            writeln!(
                f,
                "{:<width$} {:>col$.digits$} {:>col$.digits$} {:>col$.digits$} {:>col$}",
                c.class, c.precision, c.recall, c.fscore, c.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_report() -> TokenReport {
        let mut reporter = Reporter::default();
        reporter.insert(ClassMetrics::new("O", Average::None, 1.0, 0.5, 2.0 / 3.0, 2));
        reporter.insert(ClassMetrics::new("B-PER", Average::None, 0.5, 1.0, 2.0 / 3.0, 1));
        reporter.insert(ClassMetrics::new(MACRO_AVG, Average::Macro, 0.75, 0.75, 2.0 / 3.0, 3));
        reporter.insert(ClassMetrics::new(
            WEIGHTED_AVG,
            Average::Weighted,
            5.0 / 6.0,
            2.0 / 3.0,
            2.0 / 3.0,
            3,
        ));
        TokenReport {
            reporter,
            accuracy: 2.0 / 3.0,
            support: 3,
            digits: 3,
        }
    }

    #[test]
    fn test_ordering() {
        let report = token_report();
        let classes: Vec<_> = report.reporter.iter().map(|c| c.class.as_str()).collect();
        assert_eq!(classes, vec!["B-PER", "O", MACRO_AVG, WEIGHTED_AVG]);
        assert_eq!(report.reporter.classes().count(), 2);
    }

    #[test]
    fn test_token_report_display() {
        let expected = "              precision    recall  f1-score   support

       B-PER      0.500     1.000     0.667         1
           O      1.000     0.500     0.667         2

    accuracy                          0.667         3
   macro avg      0.750     0.750     0.667         3
weighted avg      0.833     0.667     0.667         3
";
        assert_eq!(token_report().to_string(), expected);
    }

    #[test]
    fn test_chunk_report_display() {
        let mut reporter = Reporter::default();
        reporter.insert(ClassMetrics::new("PER", Average::None, 1.0, 0.5, 2.0 / 3.0, 2));
        reporter.insert(ClassMetrics::new(TOTAL, Average::Micro, 1.0, 0.5, 2.0 / 3.0, 2));
        let report = ChunkReport {
            reporter,
            digits: 3,
        };
        let expected = "          p     r     f     s
PER   1.000 0.500 0.667     2
total 1.000 0.500 0.667     2
";
        assert_eq!(report.to_string(), expected);
        assert_eq!(report.total().unwrap().support, 2);
    }
}
