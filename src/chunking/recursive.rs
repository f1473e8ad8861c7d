//! Recursive separator splitter.
//!
//! Text is first cut into atoms: pieces no longer than the chunk size,
//! obtained by splitting on the coarsest separator that works and falling
//! back to finer ones. Atoms are then merged greedily into chunks, and each
//! new chunk starts with the tail of the previous one.

use super::Chunk;
use crate::error::{Result, VidqaError};
use std::collections::VecDeque;
use std::ops::Range;

/// Separators in priority order. The empty separator splits per character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits a corpus into overlapping, size-bounded chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(VidqaError::Config("chunk size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(VidqaError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_settings(settings: &crate::config::ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into ordered chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        let mut atoms = Vec::new();
        self.collect_atoms(text, 0, &separators, &mut atoms);

        self.merge(text, &atoms)
    }

    fn collect_atoms(
        &self,
        text: &str,
        offset: usize,
        separators: &[&str],
        atoms: &mut Vec<Atom>,
    ) {
        let len = text.chars().count();
        if len <= self.chunk_size {
            atoms.push(Atom::new(offset..offset + text.len(), len));
            return;
        }

        match separators.split_first() {
            Some((&separator, rest)) if !separator.is_empty() => {
                for piece in split_keeping_separator(text, separator) {
                    let piece_text = &text[piece.clone()];
                    self.collect_atoms(piece_text, offset + piece.start, rest, atoms);
                }
            }
            _ => {
                for (i, c) in text.char_indices() {
                    let start = offset + i;
                    atoms.push(Atom::new(start..start + c.len_utf8(), 1));
                }
            }
        }
    }

    fn merge(&self, text: &str, atoms: &[Atom]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&Atom> = VecDeque::new();
        let mut total = 0;

        for atom in atoms {
            if total + atom.chars > self.chunk_size && !window.is_empty() {
                chunks.push(Self::emit(text, &window));

                while total > self.chunk_overlap
                    || (total > 0 && total + atom.chars > self.chunk_size)
                {
                    if let Some(front) = window.pop_front() {
                        total -= front.chars;
                    }
                }
            }

            window.push_back(atom);
            total += atom.chars;
        }

        if !window.is_empty() {
            chunks.push(Self::emit(text, &window));
        }

        chunks
    }

    fn emit(text: &str, window: &VecDeque<&Atom>) -> Chunk {
        let start = window.front().map(|a| a.span.start).unwrap_or_default();
        let end = window.back().map(|a| a.span.end).unwrap_or(start);
        Chunk {
            text: text[start..end].to_string(),
            start,
            end,
        }
    }
}

/// A contiguous piece of the corpus no longer than the chunk size.
#[derive(Debug, Clone)]
struct Atom {
    span: Range<usize>,
    chars: usize,
}

impl Atom {
    fn new(span: Range<usize>, chars: usize) -> Self {
        Self { span, chars }
    }
}

/// Split at a separator, keeping the separator attached to the preceding piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(start..end);
        start = end;
    }

    if start < text.len() {
        result.push(start..text.len());
    }

    result
}
