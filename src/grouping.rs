/*!
Grouping of the named entities of a document by the noun chunks containing them, and frequency
analysis of the resulting groups over a corpus.
*/
use crate::doc::Doc;
use crate::labels::{convert, LabelMap};
use ahash::AHashMap;
use serde::Serialize;
use std::cmp::Reverse;

/// A group of entity labels, in document order.
pub type EntityGroup = Vec<String>;

/// Groups the entities of `doc` by noun chunk. A cursor follows the noun chunks: entities inside
/// the current chunk share a group, the cursor moves forward once a group is closed and entities
/// outside of any chunk form groups of their own. Labels dropped by `labels` are left out.
pub fn group_named_entities(doc: &Doc, labels: Option<&LabelMap>) -> Vec<EntityGroup> {
    let chunks = doc.noun_chunks();
    let mut cursor = 0;
    let mut groups = Vec::new();
    let mut open: EntityGroup = Vec::new();
    for ent in doc.ents() {
        let label = ent.label().and_then(|l| convert(l, labels));
        let inside = |cursor: usize| chunks.get(cursor).is_some_and(|c| c.contains(&ent));
        if inside(cursor) {
            open.extend(label.map(String::from));
        } else if !open.is_empty() {
            groups.push(std::mem::take(&mut open));
            cursor += 1;
            if inside(cursor) {
                open.extend(label.map(String::from));
            } else if let Some(label) = label {
                groups.push(vec![String::from(label)]);
            }
        } else if let Some(label) = label {
            groups.push(vec![String::from(label)]);
        }
    }
    if !open.is_empty() {
        groups.push(open);
    }
    groups
}

/// Number of occurrences of each entity group over a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFrequencies {
    counts: AHashMap<EntityGroup, usize>,
}

/// A group and its number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: EntityGroup,
    pub count: usize,
}

impl GroupFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the groups of one more document.
    pub fn add_doc(&mut self, doc: &Doc, labels: Option<&LabelMap>) {
        for group in group_named_entities(doc, labels) {
            *self.counts.entry(group).or_insert(0) += 1;
        }
    }

    pub fn get(&self, group: &[&str]) -> usize {
        let key: EntityGroup = group.iter().map(|s| String::from(*s)).collect();
        self.counts.get(&key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Groups by descending count, ties broken by the group itself.
    pub fn most_common(&self) -> Vec<GroupCount> {
        let mut res: Vec<GroupCount> = self
            .counts
            .iter()
            .map(|(group, count)| GroupCount {
                group: group.clone(),
                count: *count,
            })
            .collect();
        res.sort_by(|a, b| {
            (Reverse(a.count), &a.group).cmp(&(Reverse(b.count), &b.group))
        });
        res
    }
}

impl<'d> FromIterator<&'d Doc> for GroupFrequencies {
    fn from_iter<T: IntoIterator<Item = &'d Doc>>(iter: T) -> Self {
        let mut freq = GroupFrequencies::new();
        for doc in iter {
            freq.add_doc(doc, None);
        }
        freq
    }
}
