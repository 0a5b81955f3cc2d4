use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::TranscriptPart;

/// Suffix every per-segment transcript file carries
pub const TRANSCRIPT_SUFFIX: &str = "_transcripcion.txt";

static PART_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_parte_(\d+)").expect("Invalid regex"));
static PROJECT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(_parte_\d+|_transcripcion)").expect("Invalid regex"));

/// Failure to read a sequence number out of a part file name
#[derive(Debug, Error)]
pub enum PartNameError {
    #[error("file name has no _parte_<N> segment: {0}")]
    MissingSequence(String),
    #[error("part number out of range in: {0}")]
    InvalidSequence(String),
}

/// Sequence number from the `_parte_<N>` naming convention
pub fn parse_sequence(file_name: &str) -> Result<u32, PartNameError> {
    let capture = PART_NUMBER
        .captures(file_name)
        .ok_or_else(|| PartNameError::MissingSequence(file_name.to_string()))?;
    capture[1]
        .parse()
        .map_err(|_| PartNameError::InvalidSequence(file_name.to_string()))
}

/// Project name: the file stem with part/transcript suffixes stripped
pub fn project_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    PROJECT_SUFFIX.replace_all(stem, "").to_string()
}

/// Per-segment transcript files (`*_parte_<N>*_transcripcion.txt`) in a
/// directory, sorted by name
pub fn find_part_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.ends_with(TRANSCRIPT_SUFFIX) && PART_NUMBER.is_match(name)
                })
        })
        .collect();
    files.sort();

    Ok(files)
}

/// Load one segment's transcript, taking the sequence number from the file
/// name
pub fn load_part(path: &Path) -> Result<TranscriptPart> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Part path has no file name: {:?}", path))?;
    let sequence = parse_sequence(file_name)
        .with_context(|| format!("Cannot determine part number for {:?}", path))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {:?}", path))?;

    Ok(TranscriptPart::new(sequence, content))
}

/// Load every part file in order
pub fn load_parts(paths: &[PathBuf]) -> Result<Vec<TranscriptPart>> {
    paths.iter().map(|path| load_part(path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("comite_parte_3_transcripcion.txt").unwrap(), 3);
        assert_eq!(parse_sequence("audio_parte_12.wav").unwrap(), 12);
        assert!(matches!(
            parse_sequence("comite_transcripcion.txt"),
            Err(PartNameError::MissingSequence(_))
        ));
    }

    #[test]
    fn test_project_name_strips_suffixes() {
        assert_eq!(project_name("comite_marzo_parte_2_transcripcion.txt"), "comite_marzo");
        assert_eq!(project_name("reunion_transcripcion.txt"), "reunion");
        assert_eq!(project_name("simple.txt"), "simple");
    }

    #[test]
    fn test_find_and_load_parts() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("acta_parte_1_transcripcion.txt");
        let second = dir.path().join("acta_parte_2_transcripcion.txt");
        std::fs::write(&first, "INTERVIENE HABLANTE 1: hola").unwrap();
        std::fs::write(&second, "INTERVIENE HABLANTE 1: sigo").unwrap();
        // Neither a part file nor a transcript: ignored
        std::fs::write(dir.path().join("notas.txt"), "x").unwrap();
        std::fs::write(dir.path().join("acta_transcripcion.txt"), "x").unwrap();

        let files = find_part_files(dir.path()).unwrap();
        assert_eq!(files, vec![first, second]);

        let parts = load_parts(&files).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].sequence, 1);
        assert_eq!(parts[1].sequence, 2);
        assert_eq!(parts[1].content, "INTERVIENE HABLANTE 1: sigo");
    }

    #[test]
    fn test_load_part_missing_file() {
        let result = load_part(Path::new("/nonexistent/x_parte_1_transcripcion.txt"));
        assert!(result.is_err());
    }
}
