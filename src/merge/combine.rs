use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::merge::speakers::unify_speakers;
use crate::models::{TranscriptPart, UnifiedDocument};

/// Unified global tag, always a bare number after speaker unification
static GLOBAL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"INTERVIENE HABLANTE (\d+):").expect("Invalid regex"));

/// Combine independently transcribed parts into one document.
///
/// Speaker tags are unified first, then parts are concatenated in
/// ascending sequence order (whatever order they arrived in) with a
/// continuation separator announcing each part after the first. The
/// distinct global speaker numbers found in the final text are reported
/// ascending.
pub fn combine_parts(parts: &[TranscriptPart]) -> UnifiedDocument {
    let mut unified = unify_speakers(parts);
    unified.sort_by_key(|part| part.sequence);

    let mut full_text = String::new();
    for (index, part) in unified.iter().enumerate() {
        if index > 0 {
            full_text.push_str(&format!(
                "\n\n\n--- CONTINUACIÓN PARTE {} ---\n\n\n",
                part.sequence
            ));
        }
        full_text.push_str(&part.content);
    }

    let speaker_ids: BTreeSet<u32> = GLOBAL_TAG
        .captures_iter(&full_text)
        .filter_map(|capture| capture[1].parse().ok())
        .collect();
    let speaker_ids: Vec<u32> = speaker_ids.into_iter().collect();

    info!(
        "combined {} parts, {} distinct speakers",
        unified.len(),
        speaker_ids.len()
    );

    UnifiedDocument {
        full_text,
        speaker_ids,
    }
}
