pub mod io;
pub mod llm;
pub mod merge;
pub mod minutes;
pub mod models;
pub mod pipeline;

pub use io::{
    find_part_files, load_part, load_parts, parse_sequence, project_name, ArtifactStore,
    PartNameError, SpeakerRegistry,
};
pub use llm::{
    build_minutes_prompt, render_correction_prompt, ChatSession, GeminiClient, GeminiConfig,
    GenerateOutcome, TextBackend, CONTINUE_INSTRUCTION, CORRECTION_PROMPT,
};
pub use merge::{combine_parts, merge_parts, unify_speakers, CONTINUATION_MARKER};
pub use minutes::{extract_fields, Commitment, MeetingInfo, MinutesFields};
pub use models::{SpeakerKey, SpeakerMap, TranscriptPart, UnifiedDocument};
pub use pipeline::{
    correct_document, correct_file, generate_minutes, CorrectionOutcome, CorrectionReport,
    CorrectorConfig,
};
