/*!
Extraction of chunks (typed spans) out of IOB-style tag sequences. The rules are lenient: a chunk
starts or ends whenever the prefix or the type changes, whatever the tagging scheme. `U` and `L`
behave like `S` and `E`.
*/
use crate::conll::parse_iob;
use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// Prefix of a tag, such as the `B` of `B-PER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    I,
    O,
    B,
    E,
    S,
    U,
    L,
}

impl FromStr for Prefix {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(Self::I),
            "O" => Ok(Self::O),
            "B" => Ok(Self::B),
            "E" => Ok(Self::E),
            "S" => Ok(Self::S),
            "U" => Ok(Self::U),
            "L" => Ok(Self::L),
            "" => Err(ParsingError::EmptyToken),
            _ => Err(ParsingError::PrefixError(String::from(s))),
        }
    }
}

impl Prefix {
    /// BILOU prefixes mapped to their IOBES counterpart.
    fn boundary(self) -> Self {
        match self {
            Self::U => Self::S,
            Self::L => Self::E,
            p => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    PrefixError(String),
    EmptyToken,
}

impl Display for ParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrefixError(s) => write!(
                f,
                "Could not parse the following string into a Prefix: {}",
                s
            ),
            Self::EmptyToken => write!(f, "Received an empty string/&str"),
        }
    }
}
impl Error for ParsingError {}

/// A chunk of a sentence: tokens `[start, end)` sharing the entity type `label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Chunk<'a> {
    pub start: usize,
    pub end: usize,
    pub label: &'a str,
}

impl<'a> Chunk<'a> {
    pub fn new(start: usize, end: usize, label: &'a str) -> Self {
        Chunk { start, end, label }
    }
}

impl Display for Chunk<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.label, self.start, self.end)
    }
}

/// Iterates over the chunks of a *single* sentence. An outside tag is implicitly appended so that
/// a chunk running until the end of the sentence is closed.
pub struct LenientChunkIter<'a, S: AsRef<str>> {
    tags: &'a [S],
    otag: &'a str,
    /// The prefix of the previous tag
    prev_prefix: Prefix,
    /// The type of the previous tag (e.g. `"PER"`)
    prev_label: &'a str,
    begin_offset: usize,
    index: usize,
}

impl<'a, S: AsRef<str>> LenientChunkIter<'a, S> {
    pub fn new(tags: &'a [S], otag: &'a str) -> Self {
        LenientChunkIter {
            tags,
            otag,
            prev_prefix: Prefix::O,
            prev_label: "",
            begin_offset: 0,
            index: 0,
        }
    }

    fn parse(&self, tag: &'a str) -> Result<(Prefix, &'a str), ParsingError> {
        let (prefix, label) = parse_iob(tag, self.otag);
        if label.is_none() {
            return Ok((Prefix::O, ""));
        }
        Ok((prefix.parse::<Prefix>()?.boundary(), label.unwrap_or_default()))
    }

    /// Did a chunk end between the previous and the current tag?
    fn end_of_chunk(&self, prefix: Prefix, label: &str) -> bool {
        match (self.prev_prefix, prefix) {
            (Prefix::E, _) | (Prefix::S, _) => true,
            (Prefix::B, Prefix::B) | (Prefix::B, Prefix::S) | (Prefix::B, Prefix::O) => true,
            (Prefix::I, Prefix::B) | (Prefix::I, Prefix::S) | (Prefix::I, Prefix::O) => true,
            (prev, _) => prev != Prefix::O && self.prev_label != label,
        }
    }

    /// Did a chunk start between the previous and the current tag?
    fn start_of_chunk(&self, prefix: Prefix, label: &str) -> bool {
        match (self.prev_prefix, prefix) {
            (_, Prefix::B) | (_, Prefix::S) => true,
            (Prefix::E, Prefix::E) | (Prefix::E, Prefix::I) => true,
            (Prefix::S, Prefix::E) | (Prefix::S, Prefix::I) => true,
            (Prefix::O, Prefix::E) | (Prefix::O, Prefix::I) => true,
            (_, current) => current != Prefix::O && self.prev_label != label,
        }
    }
}

impl<'a, S: AsRef<str>> Iterator for LenientChunkIter<'a, S> {
    type Item = Result<Chunk<'a>, ParsingError>;
    fn next(&mut self) -> Option<Self::Item> {
        let tags = self.tags;
        while self.index <= tags.len() {
            let tag = tags.get(self.index).map_or(self.otag, |t| t.as_ref());
            let (prefix, label) = match self.parse(tag) {
                Ok(v) => v,
                Err(e) => {
                    // No chunk can be trusted after a malformed tag
                    self.index = tags.len() + 1;
                    return Some(Err(e));
                }
            };
            let ended = self
                .end_of_chunk(prefix, label)
                .then(|| Chunk::new(self.begin_offset, self.index, self.prev_label));
            if self.start_of_chunk(prefix, label) {
                self.begin_offset = self.index;
            }
            self.prev_prefix = prefix;
            self.prev_label = label;
            self.index += 1;
            if let Some(chunk) = ended {
                return Some(Ok(chunk));
            }
        }
        None
    }
}

/// Chunks of every sentence of a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunks<'a>(Vec<Vec<Chunk<'a>>>);

impl<'a> Chunks<'a> {
    pub fn try_from_sentences<S: AsRef<str>>(
        sentences: &'a [Vec<S>],
        otag: &'a str,
    ) -> Result<Self, ParsingError> {
        let mut res = Vec::with_capacity(sentences.len());
        for sentence in sentences {
            let chunks: Result<Vec<_>, _> = LenientChunkIter::new(sentence, otag).collect();
            res.push(chunks?);
        }
        Ok(Chunks(res))
    }

    pub fn sentences(&self) -> &[Vec<Chunk<'a>>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }

    /// Sorted set of the chunk types.
    pub fn labels(&self) -> BTreeSet<&'a str> {
        self.0.iter().flatten().map(|c| c.label).collect()
    }

    /// Chunks of type `label`, keyed by sentence index and boundaries.
    pub fn filter(&self, label: &str) -> AHashSet<(usize, usize, usize)> {
        self.0
            .iter()
            .enumerate()
            .flat_map(|(i, sentence)| {
                sentence
                    .iter()
                    .filter(move |c| c.label == label)
                    .map(move |c| (i, c.start, c.end))
            })
            .collect()
    }
}
