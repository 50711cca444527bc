/*!
Penn-Treebank detokenization: rebuilds a plain string out of a list of tokens, so that it can be
sent back through the pipeline.
*/

/// Split forms re-joined into a single word.
const SPLIT_FORMS: [(&str, &str); 10] = [
    ("can", "not"),
    ("d", "'ye"),
    ("gon", "na"),
    ("got", "ta"),
    ("wan", "na"),
    ("lem", "me"),
    ("gim", "me"),
    ("more", "'n"),
    ("'t", "is"),
    ("'t", "was"),
];
const CLOSING: [&str; 12] = [",", ".", "!", "?", ";", ":", "%", ")", "]", "}", ">", "..."];
const CLITICS: [&str; 7] = ["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];
const OPENING: [&str; 6] = ["(", "[", "{", "<", "$", "#"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attach {
    /// No space before the token
    Left,
    /// No space after the token
    Right,
    Free,
}

fn rejoin_split_forms<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut out = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let word = words[i].as_ref();
        let joined = words.get(i + 1).and_then(|next| {
            let next = next.as_ref();
            SPLIT_FORMS
                .iter()
                .any(|(a, b)| word.eq_ignore_ascii_case(a) && next.eq_ignore_ascii_case(b))
                .then(|| format!("{}{}", word, next))
        });
        match joined {
            Some(w) => {
                out.push(w);
                i += 2;
            }
            None => {
                out.push(String::from(word));
                i += 1;
            }
        }
    }
    out
}

fn classify<'w>(word: &'w str, quote_open: &mut bool) -> (&'w str, Attach) {
    match word {
        "``" => {
            *quote_open = true;
            ("\"", Attach::Right)
        }
        "''" => {
            *quote_open = false;
            ("\"", Attach::Left)
        }
        "\"" => {
            *quote_open = !*quote_open;
            let attach = if *quote_open {
                Attach::Right
            } else {
                Attach::Left
            };
            (word, attach)
        }
        w if CLOSING.contains(&w) => (word, Attach::Left),
        w if CLITICS.iter().any(|c| w.eq_ignore_ascii_case(c)) => (word, Attach::Left),
        w if OPENING.contains(&w) => (word, Attach::Right),
        _ => (word, Attach::Free),
    }
}

/// Joins Treebank tokens into a string: no space before closing punctuation and clitics, no space
/// after opening brackets and currency signs, Treebank quotes rendered as `"`.
pub fn detokenize<S: AsRef<str>>(words: &[S]) -> String {
    let words = rejoin_split_forms(words);
    let mut out = String::new();
    let mut quote_open = false;
    let mut glue_next = true;
    for word in &words {
        let (text, attach) = classify(word, &mut quote_open);
        if !glue_next && attach != Attach::Left {
            out.push(' ');
        }
        out.push_str(text);
        glue_next = attach == Attach::Right;
    }
    out
}
