//! Splitting the transcript corpus into overlapping chunks for indexing.

mod recursive;

pub use recursive::{TextSplitter, DEFAULT_SEPARATORS};

use serde::{Deserialize, Serialize};

/// A slice of the corpus.
///
/// `start..end` is the byte span of `text` within the corpus it was split
/// from; both ends lie on `char` boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    /// Length in characters.
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Reassemble the corpus from ordered chunks, dropping the overlaps.
pub fn rejoin(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0;

    for chunk in chunks {
        if chunk.end <= covered && !out.is_empty() {
            continue;
        }
        let skip = covered.saturating_sub(chunk.start);
        out.push_str(&chunk.text[skip..]);
        covered = chunk.end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn corpus() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z \n]{0,600}",
            "[a-zA-Zé ñ.\n]{0,400}",
            "([a-z]{1,12}( |\n|\n\n)){0,80}",
        ]
    }

    proptest! {
        #[test]
        fn split_then_rejoin_reproduces_corpus(
            text in corpus(),
            size in 1usize..120,
            overlap_frac in 0.0f64..1.0,
        ) {
            let overlap = ((size as f64) * overlap_frac) as usize;
            prop_assume!(overlap < size);

            let splitter = TextSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split(&text);

            prop_assert_eq!(rejoin(&chunks), text.clone());

            for chunk in &chunks {
                prop_assert!(chunk.len_chars() <= size);
                prop_assert_eq!(&text[chunk.start..chunk.end], chunk.text.as_str());
            }

            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start <= pair[0].end);
                let shared = text[pair[1].start..pair[0].end].chars().count();
                prop_assert!(shared <= overlap);
            }
        }
    }

    #[test]
    fn test_two_transcripts_fit_in_one_batch() {
        let corpus = format!("{}\n\n{}\n\n", "a".repeat(600), "b".repeat(600));
        let chunks = TextSplitter::new(500, 100).unwrap().split(&corpus);

        assert!(chunks.len() <= 10);
        assert!(chunks.len() >= 3);
        assert_eq!(rejoin(&chunks), corpus);
    }
}
