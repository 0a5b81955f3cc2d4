use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("Invalid regex"));

/// Write text creating parent directories, best-effort: a failure is
/// logged and reported as `false`, never propagated. Used where the text
/// computation already succeeded and losing the write must not fail the
/// run.
pub fn save_text(path: &Path, text: &str) -> bool {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                error!("could not create {:?}: {}", parent, err);
                return false;
            }
        }
    }
    match std::fs::write(path, text) {
        Ok(()) => true,
        Err(err) => {
            error!("could not save {:?}: {}", path, err);
            false
        }
    }
}

/// Write text, propagating failures
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    std::fs::write(path, text).with_context(|| format!("Failed to write: {:?}", path))
}

/// Project folder for generated minutes: `<base>/finales/<project>` for
/// final versions, `<base>/versiones/<project>` otherwise
pub fn project_dir(base: &Path, project: &str, is_final: bool) -> PathBuf {
    let bucket = if is_final { "finales" } else { "versiones" };
    base.join(bucket).join(sanitize_project(project))
}

/// Minutes file path: `<project>_final.md`, or dated `<project>_<date>.md`
pub fn minutes_path(dir: &Path, project: &str, is_final: bool) -> PathBuf {
    let project = sanitize_project(project);
    let file_name = if is_final {
        format!("{}_final.md", project)
    } else {
        format!("{}_{}.md", project, Local::now().format("%Y-%m-%d"))
    };
    dir.join(file_name)
}

/// Default output path for a corrected transcript: `<stem>_corregida.txt`
/// next to the input
pub fn corrected_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("transcripcion");
    input.with_file_name(format!("{}_corregida.txt", stem))
}

fn sanitize_project(project: &str) -> String {
    UNSAFE_CHARS.replace_all(project, "_").to_string()
}

/// Write the combined transcript under `<base>/transcripciones/<project>/`
pub fn write_unified_transcript(base: &Path, project: &str, full_text: &str) -> Result<PathBuf> {
    let dir = base.join("transcripciones").join(sanitize_project(project));
    let path = dir.join(format!("{}.txt", sanitize_project(project)));
    write_text(&path, full_text)?;
    info!("combined transcript written to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_text_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/salida.txt");

        assert!(save_text(&path, "contenido"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "contenido");
    }

    #[test]
    fn test_save_text_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("ocupado");
        std::fs::write(&blocker, "soy un archivo").unwrap();

        // Parent "directory" is a file: the write cannot succeed
        let path = blocker.join("salida.txt");
        assert!(!save_text(&path, "contenido"));
    }

    #[test]
    fn test_minutes_path_final_vs_dated() {
        let dir = PathBuf::from("/tmp/actas");
        let final_path = minutes_path(&dir, "comite marzo", true);
        assert_eq!(final_path, dir.join("comite_marzo_final.md"));

        let dated = minutes_path(&dir, "comite", false);
        let name = dated.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("comite_") && name.ends_with(".md"));
    }

    #[test]
    fn test_corrected_path() {
        assert_eq!(
            corrected_path(Path::new("/x/acta_transcripcion.txt")),
            PathBuf::from("/x/acta_transcripcion_corregida.txt")
        );
    }

    #[test]
    fn test_project_dir_buckets() {
        let base = Path::new("/data");
        assert_eq!(
            project_dir(base, "comite", true),
            PathBuf::from("/data/finales/comite")
        );
        assert_eq!(
            project_dir(base, "comite", false),
            PathBuf::from("/data/versiones/comite")
        );
    }
}
