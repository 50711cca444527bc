/*!
Annotated documents, as produced by the external pipeline. A `Doc` owns the tokens and the entity
spans of a text; `Token` and `Span` are cheap views borrowing the document, giving access to the
dependency tree (heads, children, subtrees) and the entity annotation of each token.
*/
use crate::error::{Result, SynevalError};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod noun_chunks;
mod spacy_json;

pub use spacy_json::{SpacyDoc, SpacyEntity, SpacyToken};

/// Dependency label of a sentence root.
pub const ROOT_LABEL: &str = "ROOT";

/// Position of a token in an entity: at the beginning, inside or outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
pub enum EntIob {
    B,
    I,
    O,
}

impl EntIob {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B => "B",
            Self::I => "I",
            Self::O => "O",
        }
    }
}

impl Display for EntIob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Annotation of a single token. `head` is the absolute index of the syntactic head; a sentence
/// root is its own head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub text: String,
    /// Is the token followed by a space in the original text?
    pub whitespace: bool,
    /// Fine-grained tag, such as `NNP`
    pub tag: String,
    /// Coarse-grained part of speech, such as `PROPN`
    pub pos: String,
    pub lemma: String,
    /// Dependency label, such as `nsubj`
    pub dep: String,
    pub head: usize,
}

impl TokenData {
    /// Token followed by a space, without tag nor lemma.
    pub fn new(
        text: impl Into<String>,
        pos: impl Into<String>,
        dep: impl Into<String>,
        head: usize,
    ) -> Self {
        Self {
            text: text.into(),
            whitespace: true,
            tag: String::new(),
            pos: pos.into(),
            lemma: String::new(),
            dep: dep.into(),
            head,
        }
    }

    /// Marks the token as directly followed by the next one.
    pub fn no_space(mut self) -> Self {
        self.whitespace = false;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = lemma.into();
        self
    }
}

/// A named entity, in token offsets. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// A parsed and NER-annotated text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Doc {
    tokens: Vec<TokenData>,
    ents: Vec<EntitySpan>,
    #[serde(skip)]
    children: Vec<Vec<usize>>,
    /// For each token, the index of the entity covering it.
    #[serde(skip)]
    token_ents: Vec<Option<usize>>,
}

impl Doc {
    /// Builds a document and checks its consistency: every head must be a token of the document
    /// and entities must be non-empty, in bounds and non-overlapping.
    pub fn new(tokens: Vec<TokenData>, mut ents: Vec<EntitySpan>) -> Result<Self> {
        let len = tokens.len();
        let mut children = vec![Vec::new(); len];
        for (i, token) in tokens.iter().enumerate() {
            if token.head >= len {
                return Err(SynevalError::HeadOutOfBounds {
                    token: i,
                    head: token.head,
                    len,
                });
            }
            if token.head != i {
                children[token.head].push(i);
            }
        }

        ents.sort_by_key(|e| (e.start, e.end));
        let mut token_ents = vec![None; len];
        for (idx, ent) in ents.iter().enumerate() {
            let invalid = |reason| SynevalError::InvalidEntity {
                label: ent.label.clone(),
                start: ent.start,
                end: ent.end,
                reason,
            };
            if ent.start >= ent.end {
                return Err(invalid("empty entity"));
            }
            if ent.end > len {
                return Err(invalid("entity out of bounds"));
            }
            for slot in &mut token_ents[ent.start..ent.end] {
                if slot.is_some() {
                    return Err(invalid("overlapping entities"));
                }
                *slot = Some(idx);
            }
        }

        Ok(Self {
            tokens,
            ents,
            children,
            token_ents,
        })
    }

    /// Parses a document in the JSON layout of the external pipeline.
    pub fn from_spacy_json(json: &str) -> Result<Self> {
        let raw: SpacyDoc = serde_json::from_str(json)?;
        Doc::try_from(raw)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Reconstructs the text from the tokens and their trailing whitespace.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for token in &self.tokens {
            text.push_str(&token.text);
            if token.whitespace {
                text.push(' ');
            }
        }
        text
    }

    pub fn token(&self, i: usize) -> Option<Token<'_>> {
        (i < self.len()).then_some(Token { doc: self, i })
    }

    pub fn tokens(&self) -> impl Iterator<Item = Token<'_>> + '_ {
        (0..self.len()).map(move |i| Token { doc: self, i })
    }

    /// Raw annotation of the tokens.
    pub fn token_data(&self) -> &[TokenData] {
        &self.tokens
    }

    pub fn words(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Span over `[start, end)`.
    pub fn span(&self, start: usize, end: usize) -> Result<Span<'_>> {
        if start > end || end > self.len() {
            return Err(SynevalError::SpanOutOfBounds {
                start,
                end,
                len: self.len(),
            });
        }
        Ok(Span {
            doc: self,
            start,
            end,
            label: None,
        })
    }

    /// Span covering the whole document.
    pub fn as_span(&self) -> Span<'_> {
        Span {
            doc: self,
            start: 0,
            end: self.len(),
            label: None,
        }
    }

    /// Named entities, in document order.
    pub fn ents(&self) -> impl Iterator<Item = Span<'_>> + '_ {
        self.ents.iter().map(move |e| Span {
            doc: self,
            start: e.start,
            end: e.end,
            label: Some(e.label.as_str()),
        })
    }

    pub fn entity_spans(&self) -> &[EntitySpan] {
        &self.ents
    }

    /// Base noun phrases of the document, labelled `NP`.
    pub fn noun_chunks(&self) -> Vec<Span<'_>> {
        noun_chunks::noun_chunks(self)
    }
}

/// Builder used to assemble a `Doc` token by token.
#[derive(Debug, Default, Clone)]
pub struct DocBuilder {
    tokens: Vec<TokenData>,
    ents: Vec<EntitySpan>,
}

impl DocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: TokenData) -> Self {
        self.tokens.push(token);
        self
    }

    pub fn tokens<I: IntoIterator<Item = TokenData>>(mut self, tokens: I) -> Self {
        self.tokens.extend(tokens);
        self
    }

    /// Adds an entity over the tokens `[start, end)`.
    pub fn entity(mut self, start: usize, end: usize, label: impl Into<String>) -> Self {
        self.ents.push(EntitySpan {
            start,
            end,
            label: label.into(),
        });
        self
    }

    pub fn build(self) -> Result<Doc> {
        Doc::new(self.tokens, self.ents)
    }
}

/// A token of a document.
#[derive(Debug, Clone, Copy)]
pub struct Token<'d> {
    doc: &'d Doc,
    i: usize,
}

impl<'d> Token<'d> {
    fn data(&self) -> &'d TokenData {
        &self.doc.tokens[self.i]
    }

    /// Index of the token in the document.
    pub fn i(&self) -> usize {
        self.i
    }

    pub fn doc(&self) -> &'d Doc {
        self.doc
    }

    pub fn text(&self) -> &'d str {
        &self.data().text
    }

    pub fn whitespace(&self) -> bool {
        self.data().whitespace
    }

    pub fn dep(&self) -> &'d str {
        &self.data().dep
    }

    pub fn pos(&self) -> &'d str {
        &self.data().pos
    }

    pub fn tag(&self) -> &'d str {
        &self.data().tag
    }

    pub fn lemma(&self) -> &'d str {
        &self.data().lemma
    }

    pub fn head(&self) -> Token<'d> {
        Token {
            doc: self.doc,
            i: self.data().head,
        }
    }

    /// A sentence root is its own head.
    pub fn is_root(&self) -> bool {
        self.data().head == self.i
    }

    /// Syntactic children, in document order.
    pub fn children(&self) -> impl Iterator<Item = Token<'d>> + 'd {
        let doc = self.doc;
        doc.children[self.i].iter().map(move |&i| Token { doc, i })
    }

    /// Children preceding the token.
    pub fn lefts(&self) -> impl Iterator<Item = Token<'d>> + 'd {
        let i = self.i;
        self.children().filter(move |c| c.i < i)
    }

    /// Children following the token.
    pub fn rights(&self) -> impl Iterator<Item = Token<'d>> + 'd {
        let i = self.i;
        self.children().filter(move |c| c.i > i)
    }

    /// The token and all its descendants: the subtrees of the left children, the token itself and
    /// the subtrees of the right children.
    pub fn subtree(&self) -> Vec<Token<'d>> {
        let mut visited = vec![false; self.doc.len()];
        let mut out = Vec::new();
        self.collect_subtree(&mut visited, &mut out);
        out
    }

    fn collect_subtree(&self, visited: &mut [bool], out: &mut Vec<Token<'d>>) {
        // Malformed parses may contain cycles
        if visited[self.i] {
            return;
        }
        visited[self.i] = true;
        for left in self.lefts() {
            left.collect_subtree(visited, out);
        }
        out.push(*self);
        for right in self.rights() {
            right.collect_subtree(visited, out);
        }
    }

    /// Leftmost token of the subtree.
    pub fn left_edge(&self) -> Token<'d> {
        self.subtree()
            .into_iter()
            .min_by_key(|t| t.i)
            .unwrap_or(*self)
    }

    /// Heads of the token, from the closest to the sentence root. Stops early on cycles.
    pub fn ancestors(&self) -> Ancestors<'d> {
        Ancestors {
            current: *self,
            remaining: self.doc.len(),
        }
    }

    /// Number of arcs between the token and its sentence root.
    pub fn root_distance(&self) -> Result<usize> {
        let mut current = *self;
        let mut steps = 0;
        while !current.is_root() {
            if steps >= self.doc.len() {
                return Err(SynevalError::MalformedTree(self.i));
            }
            current = current.head();
            steps += 1;
        }
        Ok(steps)
    }

    /// Childless punctuation or whitespace.
    pub(crate) fn is_filler(&self) -> bool {
        (self.pos() == "PUNCT" || self.text().trim().is_empty())
            && self.doc.children[self.i].is_empty()
    }

    pub fn ent_iob(&self) -> EntIob {
        match self.doc.token_ents[self.i] {
            None => EntIob::O,
            Some(idx) if self.doc.ents[idx].start == self.i => EntIob::B,
            Some(_) => EntIob::I,
        }
    }

    /// Label of the entity covering the token, or an empty string.
    pub fn ent_type(&self) -> &'d str {
        match self.doc.token_ents[self.i] {
            Some(idx) => &self.doc.ents[idx].label,
            None => "",
        }
    }
}

impl PartialEq for Token<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.i == other.i
    }
}
impl Eq for Token<'_> {}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Iterator over the heads of a token. See `Token::ancestors`.
pub struct Ancestors<'d> {
    current: Token<'d>,
    remaining: usize,
}

impl<'d> Iterator for Ancestors<'d> {
    type Item = Token<'d>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_root() || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.current = self.current.head();
        Some(self.current)
    }
}

/// A contiguous slice `[start, end)` of a document, optionally labelled (entities, noun chunks).
#[derive(Debug, Clone, Copy)]
pub struct Span<'d> {
    doc: &'d Doc,
    start: usize,
    end: usize,
    label: Option<&'d str>,
}

impl<'d> Span<'d> {
    pub(crate) fn labelled(doc: &'d Doc, start: usize, end: usize, label: &'d str) -> Self {
        Span {
            doc,
            start,
            end,
            label: Some(label),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn label(&self) -> Option<&'d str> {
        self.label
    }

    pub fn doc(&self) -> &'d Doc {
        self.doc
    }

    pub fn tokens(&self) -> impl Iterator<Item = Token<'d>> + 'd {
        let doc = self.doc;
        (self.start..self.end).map(move |i| Token { doc, i })
    }

    pub fn words(&self) -> Vec<&'d str> {
        self.tokens().map(|t| t.text()).collect()
    }

    /// Text of the span, keeping the whitespace between its tokens.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for token in self.tokens() {
            text.push_str(token.text());
            if token.whitespace() && token.i + 1 < self.end {
                text.push(' ');
            }
        }
        text
    }

    /// Is `other` entirely inside this span?
    pub fn contains(&self, other: &Span<'_>) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Entities lying entirely inside the span.
    pub fn ents(&self) -> Vec<Span<'d>> {
        self.doc.ents().filter(|e| self.contains(e)).collect()
    }

    /// Syntactic head of the span. A sentence root inside the span is returned right away;
    /// otherwise, among the tokens whose head lies outside of the span, the one closest to its
    /// sentence root wins (the first one on ties). Childless punctuation and whitespace count as
    /// `len - 1` steps away, so any word beats them. Without a candidate, the first token is used.
    pub fn root(&self) -> Result<Token<'d>> {
        if self.is_empty() {
            return Err(SynevalError::EmptySpan);
        }
        if let Some(root) = self.tokens().find(|t| t.is_root()) {
            return Ok(root);
        }
        let mut best: Option<(usize, Token<'d>)> = None;
        for token in self.tokens() {
            let head = token.head().i;
            if head >= self.start && head < self.end {
                continue;
            }
            let distance = if token.is_filler() {
                self.doc.len() - 1
            } else {
                token.root_distance()?
            };
            match best {
                Some((current, _)) if current <= distance => {}
                _ => best = Some((distance, token)),
            }
        }
        Ok(best.map_or_else(|| Token { doc: self.doc, i: self.start }, |(_, token)| token))
    }
}

impl PartialEq for Span<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc)
            && self.start == other.start
            && self.end == other.end
            && self.label == other.label
    }
}

impl Display for Span<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}
