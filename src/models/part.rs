use serde::{Deserialize, Serialize};

/// One transcribed segment of the source audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptPart {
    /// Position of the segment in the original audio (1-based, not
    /// necessarily contiguous)
    pub sequence: u32,
    /// Raw transcript text with locally-numbered speaker tags
    pub content: String,
}

impl TranscriptPart {
    pub fn new(sequence: u32, content: impl Into<String>) -> Self {
        Self {
            sequence,
            content: content.into(),
        }
    }

    /// Number of whitespace-delimited words in the content
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Result of combining unified parts into a single transcript
#[derive(Debug, Clone)]
pub struct UnifiedDocument {
    /// Concatenated, speaker-unified text with continuation separators
    pub full_text: String,
    /// Distinct global speaker numbers observed in the full text,
    /// ascending
    pub speaker_ids: Vec<u32>,
}

impl UnifiedDocument {
    /// Speaker labels for reporting ("HABLANTE 1, HABLANTE 2, ...")
    pub fn speaker_labels(&self) -> String {
        self.speaker_ids
            .iter()
            .map(|id| format!("HABLANTE {}", id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
