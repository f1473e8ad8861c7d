//! Plain-text transcript files.
//!
//! One `.txt` per processed video, named after the downloaded audio file.
//! The concatenation of all of them is the ingestion corpus.

use crate::error::{Result, VidqaError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Separator appended after every transcript in the corpus.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Directory of transcript files.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Transcript path for an audio file: same base name, `.txt` extension.
    pub fn path_for(&self, audio_path: &Path) -> Result<PathBuf> {
        let stem = audio_path.file_stem().ok_or_else(|| {
            VidqaError::InvalidInput(format!("Audio path has no file name: {:?}", audio_path))
        })?;
        Ok(self.dir.join(format!("{}.txt", stem.to_string_lossy())))
    }

    /// Write a transcript, creating the directory if needed.
    #[instrument(skip(self, text))]
    pub fn write(&self, audio_path: &Path, text: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(audio_path)?;
        std::fs::write(&path, text)?;
        info!("Transcript saved to: {}", path.display());
        Ok(path)
    }

    /// All transcript files, sorted by name.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Concatenate every transcript, each followed by a blank line.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn load_corpus(&self) -> Result<String> {
        let files = self.list()?;
        if files.is_empty() {
            return Err(VidqaError::NoInput(self.dir.clone()));
        }

        let mut corpus = String::new();
        for file in &files {
            debug!("Loading transcript {}", file.display());
            corpus.push_str(&std::fs::read_to_string(file)?);
            corpus.push_str(DOCUMENT_SEPARATOR);
        }

        info!("Loaded {} transcript files ({} chars)", files.len(), corpus.chars().count());
        Ok(corpus)
    }
}
