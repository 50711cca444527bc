/*!
Conversion between entity taxonomies. The pipeline annotates OntoNotes labels while the CoNLL-2003
reference only knows `PER`, `LOC`, `ORG` and `MISC`. A label mapped to the empty string is dropped:
it never becomes an `O` tag nor an unknown class.
*/
use crate::error::Result;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

const ONTONOTES_TO_CONLL: [(&str, &str); 18] = [
    ("CARDINAL", ""),
    ("DATE", ""),
    ("EVENT", "MISC"),
    ("FAC", "LOC"),
    ("GPE", "LOC"),
    ("LANGUAGE", "MISC"),
    ("LAW", ""),
    ("LOC", "LOC"),
    ("MONEY", ""),
    ("NORP", "MISC"),
    ("ORDINAL", ""),
    ("ORG", "ORG"),
    ("PERCENT", ""),
    ("PERSON", "PER"),
    ("PRODUCT", "ORG"),
    ("QUANTITY", ""),
    ("TIME", ""),
    ("WORK_OF_ART", ""),
];

/// Mapping from pipeline labels to target labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMap {
    table: AHashMap<String, String>,
    #[serde(skip)]
    reported: Reported,
}

/// Unknown labels already warned about.
#[derive(Debug, Default)]
struct Reported(Mutex<AHashSet<String>>);

impl Reported {
    /// Is it the first time `label` is reported?
    fn first(&self, label: &str) -> bool {
        let mut seen = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(label) {
            return false;
        }
        seen.insert(String::from(label))
    }
}

impl Clone for Reported {
    fn clone(&self) -> Self {
        let seen = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        Reported(Mutex::new(seen.clone()))
    }
}

// Not part of the mapping
impl PartialEq for Reported {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl LabelMap {
    /// OntoNotes to CoNLL-2003 conversion.
    pub fn spacy_to_conll() -> Self {
        ONTONOTES_TO_CONLL.into_iter().collect()
    }

    /// Reads a custom table from a JSON object, such as `{"PERSON": "PER", "DATE": ""}`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Target label of `label`, or `None` if the label is dropped. Labels missing from the table
    /// are dropped as well, with a warning the first time each is met.
    pub fn map(&self, label: &str) -> Option<&str> {
        match self.table.get(label) {
            Some(mapped) if mapped.is_empty() => None,
            Some(mapped) => Some(mapped.as_str()),
            None => {
                if self.reported.first(label) {
                    warn!(label, "entity label missing from the conversion table, dropping it");
                }
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        LabelMap {
            table: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            reported: Reported::default(),
        }
    }
}

/// Label of an entity once converted. `None` as a map keeps the pipeline's own label.
pub fn convert<'a>(label: &'a str, labels: Option<&'a LabelMap>) -> Option<&'a str> {
    match labels {
        Some(map) => map.map(label),
        None => Some(label),
    }
}
