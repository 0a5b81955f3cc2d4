use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{SpeakerKey, SpeakerMap, TranscriptPart};

/// Speaker tag as emitted per part: a bare number once unified, or an
/// opaque diarizer token (SPEAKER_00 style) straight from transcription
static LOCAL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"INTERVIENE HABLANTE (SPEAKER_\d+|\d+):").expect("Invalid regex"));

/// Rewrite every part's local speaker tags to one global numbering.
///
/// The fold threads a [`SpeakerMap`] through the parts in input order: the
/// first time a `(sequence, local tag)` pair is seen it gets the next free
/// global number, and every occurrence of that exact tag literal inside
/// that part is rewritten. Tags are never rewritten across parts, so equal
/// local ids in different parts stay distinct speakers.
pub fn unify_speakers(parts: &[TranscriptPart]) -> Vec<TranscriptPart> {
    unify_speakers_with_map(parts).0
}

/// Same as [`unify_speakers`], also returning the assignment map
pub fn unify_speakers_with_map(parts: &[TranscriptPart]) -> (Vec<TranscriptPart>, SpeakerMap) {
    let mut map = SpeakerMap::new();

    let unified = parts
        .iter()
        .map(|part| {
            let mut content = part.content.clone();

            let mut local_tags: Vec<String> = Vec::new();
            for capture in LOCAL_TAG.captures_iter(&part.content) {
                let local = capture[1].to_string();
                if !local_tags.contains(&local) {
                    local_tags.push(local);
                }
            }

            for local in local_tags {
                let global = map.assign(SpeakerKey::new(part.sequence, local.as_str()));
                debug!(
                    "speaker {} (parte {}) -> HABLANTE {}",
                    local, part.sequence, global
                );
                content = content.replace(
                    &format!("INTERVIENE HABLANTE {}:", local),
                    &format!("INTERVIENE HABLANTE {}:", global),
                );
            }

            TranscriptPart::new(part.sequence, content)
        })
        .collect();

    (unified, map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_renumbers_diarizer_tags() {
        let parts = vec![
            TranscriptPart::new(
                1,
                "INTERVIENE HABLANTE SPEAKER_00: buenos días\nINTERVIENE HABLANTE SPEAKER_01: hola",
            ),
            TranscriptPart::new(2, "INTERVIENE HABLANTE SPEAKER_00: continuamos"),
        ];

        let unified = unify_speakers(&parts);

        assert_eq!(
            unified[0].content,
            "INTERVIENE HABLANTE 1: buenos días\nINTERVIENE HABLANTE 2: hola"
        );
        // Same diarizer tag in another part is a different real speaker
        assert_eq!(unified[1].content, "INTERVIENE HABLANTE 3: continuamos");
    }

    #[test]
    fn test_unify_is_deterministic() {
        let parts = vec![
            TranscriptPart::new(1, "INTERVIENE HABLANTE 1: a\nINTERVIENE HABLANTE 2: b"),
            TranscriptPart::new(2, "INTERVIENE HABLANTE 1: c"),
        ];

        let first = unify_speakers(&parts);
        let second = unify_speakers(&parts);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_unify_no_collision_between_parts() {
        let parts = vec![
            TranscriptPart::new(3, "INTERVIENE HABLANTE 1: soy la primera persona"),
            TranscriptPart::new(7, "INTERVIENE HABLANTE 1: soy otra persona"),
        ];

        let (unified, map) = unify_speakers_with_map(&parts);

        assert_eq!(unified[0].content, "INTERVIENE HABLANTE 1: soy la primera persona");
        assert_eq!(unified[1].content, "INTERVIENE HABLANTE 2: soy otra persona");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_unify_rewrites_every_occurrence_within_a_part() {
        let parts = vec![TranscriptPart::new(
            2,
            "INTERVIENE HABLANTE SPEAKER_03: uno\nINTERVIENE HABLANTE SPEAKER_03: dos",
        )];

        let unified = unify_speakers(&parts);

        assert_eq!(
            unified[0].content,
            "INTERVIENE HABLANTE 1: uno\nINTERVIENE HABLANTE 1: dos"
        );
    }

    #[test]
    fn test_unify_is_idempotent_on_unified_parts() {
        let parts = vec![
            TranscriptPart::new(1, "INTERVIENE HABLANTE SPEAKER_00: a\nINTERVIENE HABLANTE SPEAKER_01: b"),
            TranscriptPart::new(2, "INTERVIENE HABLANTE SPEAKER_00: c"),
        ];

        let once = unify_speakers(&parts);
        let twice = unify_speakers(&once);

        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_unify_keeps_sequence_numbers_and_order() {
        let parts = vec![
            TranscriptPart::new(5, "INTERVIENE HABLANTE 1: x"),
            TranscriptPart::new(2, "INTERVIENE HABLANTE 1: y"),
        ];

        let unified = unify_speakers(&parts);

        assert_eq!(unified[0].sequence, 5);
        assert_eq!(unified[1].sequence, 2);
    }

    #[test]
    fn test_unify_untagged_text_is_untouched() {
        let parts = vec![TranscriptPart::new(1, "texto sin etiquetas de hablante")];
        let unified = unify_speakers(&parts);
        assert_eq!(unified[0].content, parts[0].content);
    }
}
