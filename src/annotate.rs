/*!
Adapters to the external NLP pipeline. The pipeline is either replayed from a JSON-lines file of
documents it produced beforehand, or run as a subprocess answering one JSON document per input line.
*/
use crate::doc::{Doc, SpacyDoc};
use crate::error::{Result, SynevalError};
use ahash::AHashMap;
use serde_jsonlines::{json_lines, JsonLinesReader};
use std::ffi::OsString;
use std::io::{BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Something able to tokenize, tag, parse and recognize the entities of a text.
pub trait Annotator {
    fn annotate(&self, text: &str) -> Result<Doc>;

    /// Annotates several texts. The result holds one document per text, in order.
    fn annotate_batch(&self, texts: &[&str]) -> Result<Vec<Doc>> {
        texts.iter().map(|t| self.annotate(t)).collect()
    }
}

/// Documents produced ahead of time, looked up by their whitespace-trimmed text.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedAnnotator {
    docs: AHashMap<String, Doc>,
}

impl PrecomputedAnnotator {
    /// Loads a JSON-lines file holding one pipeline document per line.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = json_lines::<SpacyDoc, _>(path.as_ref())?.collect::<std::io::Result<Vec<_>>>()?;
        let annotator = Self::from_docs(raw)?;
        debug!(
            path = %path.as_ref().display(),
            documents = annotator.len(),
            "loaded precomputed annotations"
        );
        Ok(annotator)
    }

    pub fn from_docs<I: IntoIterator<Item = SpacyDoc>>(docs: I) -> Result<Self> {
        let mut index = AHashMap::new();
        for raw in docs {
            let key = raw.text.trim().to_string();
            index.insert(key, Doc::try_from(raw)?);
        }
        Ok(PrecomputedAnnotator { docs: index })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Annotator for PrecomputedAnnotator {
    fn annotate(&self, text: &str) -> Result<Doc> {
        self.docs
            .get(text.trim())
            .cloned()
            .ok_or_else(|| SynevalError::NotAnnotated(String::from(text.trim())))
    }
}

/// Runs the pipeline as an external program. The program reads one text per line on its standard
/// input and writes one JSON document per line on its standard output.
#[derive(Debug, Clone)]
pub struct CommandAnnotator {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandAnnotator {
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        CommandAnnotator {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Annotator for CommandAnnotator {
    fn annotate(&self, text: &str) -> Result<Doc> {
        self.annotate_batch(&[text])?
            .pop()
            .ok_or_else(|| SynevalError::Annotator(String::from("no document returned")))
    }

    fn annotate_batch(&self, texts: &[&str]) -> Result<Vec<Doc>> {
        debug!(program = ?self.program, texts = texts.len(), "running the pipeline");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SynevalError::Annotator(String::from("stdin unavailable")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SynevalError::Annotator(String::from("stdout unavailable")))?;

        // One text per line
        let input: String = texts
            .iter()
            .map(|t| format!("{}\n", t.replace(['\n', '\r'], " ")))
            .collect();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            stdin.write_all(input.as_bytes())?;
            stdin.flush()
        });

        let raw = JsonLinesReader::new(BufReader::new(stdout))
            .read_all::<SpacyDoc>()
            .collect::<std::io::Result<Vec<_>>>();
        let written = writer
            .join()
            .map_err(|_| SynevalError::Annotator(String::from("writer thread panicked")))?;
        let status = child.wait()?;
        if !status.success() {
            return Err(SynevalError::Annotator(format!(
                "pipeline exited with {}",
                status
            )));
        }
        written?;
        let raw = raw?;
        if raw.len() != texts.len() {
            return Err(SynevalError::Annotator(format!(
                "expected {} documents, received {}",
                texts.len(),
                raw.len()
            )));
        }
        raw.into_iter().map(Doc::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::fixtures::{steve_jobs, telescope};

    fn precomputed() -> PrecomputedAnnotator {
        PrecomputedAnnotator::from_docs(vec![
            SpacyDoc::from(&steve_jobs()),
            SpacyDoc::from(&telescope()),
        ])
        .unwrap()
    }

    #[test]
    fn test_precomputed_lookup() {
        let annotator = precomputed();
        assert_eq!(annotator.len(), 2);
        let doc = annotator
            .annotate("  I saw a man with a telescope, he was looking at the Moon. ")
            .unwrap();
        assert_eq!(doc, telescope());
    }

    #[test]
    fn test_precomputed_batch() {
        let annotator = precomputed();
        let docs = annotator
            .annotate_batch(&[
                "Apple's Steve Jobs died in 2011 in Palo Alto, California.",
                "I saw a man with a telescope, he was looking at the Moon.",
            ])
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].len(), 13);
    }

    #[test]
    fn test_not_annotated() {
        let annotator = precomputed();
        assert!(matches!(
            annotator.annotate("Unknown sentence."),
            Err(SynevalError::NotAnnotated(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for doc in [steve_jobs(), telescope()] {
            let line = serde_json::to_string(&SpacyDoc::from(&doc)).unwrap();
            writeln!(file, "{}", line).unwrap();
        }
        let annotator = PrecomputedAnnotator::from_path(file.path()).unwrap();
        assert_eq!(annotator.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_annotator() {
        let line = serde_json::to_string(&SpacyDoc::from(&telescope())).unwrap();
        let script = format!("while read -r line; do echo '{}'; done", line);
        let annotator = CommandAnnotator::new("sh").args(["-c", script.as_str()]);
        let docs = annotator.annotate_batch(&["one", "two"]).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1], telescope());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_annotator_failure() {
        let annotator = CommandAnnotator::new("sh").args(["-c", "cat > /dev/null; exit 3"]);
        assert!(matches!(
            annotator.annotate("text"),
            Err(SynevalError::Annotator(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_annotator_missing_documents() {
        let annotator = CommandAnnotator::new("sh").args(["-c", "cat > /dev/null"]);
        assert!(matches!(
            annotator.annotate_batch(&["a", "b"]),
            Err(SynevalError::Annotator(_))
        ));
    }
}
