use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

static PROJECT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(_transcripcion|_parte_\d+|_completa)").expect("Invalid regex"));
static PROGRAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)programa\s+([^.]{15,150})",
        r"(?i)técnico\s+en\s+([^.]{10,100})",
        r"(?i)del\s+programa\s+([^.]{10,100})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});
static FILE_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)ficha\s*:?\s*(\d[-\d]*)",
        r"(?i)de\s+la\s+ficha\s+(\d+)",
        r"(?i)ficha\s+número\s+(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});
static TRAINEE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"aprendiz\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,4})",
        r"del\s+aprendiz\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,4})",
        r"estudiante\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(\d{1,2}\s+de\s+\w+\s+de\s+\d{4})",
        r"(\d{1,2}/\d{1,2}/\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});
static INSTRUCTOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)instructora?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,4})",
        r"(?i)profesora?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

static FIELD_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CIUDAD Y FECHA:\s*([^\n]+)").expect("Invalid regex"));
static FIELD_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)HORA INICIO:\s*([^\n]+)").expect("Invalid regex"));
static FIELD_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)HORA FIN:\s*([^\n]+)").expect("Invalid regex"));
static PARTICIPANTS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)##\s*PARTICIPANTES").expect("Invalid regex"));
static OBJECTIVES_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)##\s*OBJETIVO\(?S\)? DE LA REUNIÓN[^\n]*\n").expect("Invalid regex")
});
static FACTS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)###\s*3\.?[^\n]*HECHOS[^\n]*").expect("Invalid regex"));
static ANALYSIS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)###\s*5\.?[^\n]*DESARROLLO[^\n]*").expect("Invalid regex"));
static CONCLUSIONS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)###\s*6\.?[^\n]*CONCLUSIONES[^\n]*").expect("Invalid regex"));
static COMMITMENTS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)##\s*COMPROMISOS Y SEGUIMIENTO").expect("Invalid regex"));
static SECTION_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n##\s+|\n###\s*\d+\.").expect("Invalid regex"));
static TABLE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-{3,}$").expect("Invalid regex"));

/// Context detected before generation: project naming plus whatever the
/// transcript itself reveals about the meeting
#[derive(Debug, Clone)]
pub struct MeetingInfo {
    /// Base name with part/transcript suffixes stripped
    pub project_name: String,
    /// Date mentioned in the transcript, else today
    pub meeting_date: String,
    pub program: Option<String>,
    pub file_number: Option<String>,
    pub trainee: Option<String>,
    pub lead_instructor: Option<String>,
    /// Minutes serial, CEyS-YYMMDD
    pub serial: String,
}

impl MeetingInfo {
    /// Detect meeting context from the source file name and raw transcript
    pub fn detect(file_name: &str, transcript: &str) -> Self {
        let project_name = PROJECT_SUFFIX.replace_all(file_name, "").to_string();

        let program = first_capture(&PROGRAM_PATTERNS, transcript)
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "));
        let file_number = first_capture(&FILE_NUMBER_PATTERNS, transcript);
        let lead_instructor = first_capture(&INSTRUCTOR_PATTERNS, transcript);

        let mut trainees: Vec<String> = Vec::new();
        for pattern in TRAINEE_PATTERNS.iter() {
            for capture in pattern.captures_iter(transcript) {
                let name = capture[1].trim().to_string();
                if !trainees.contains(&name) {
                    trainees.push(name);
                }
            }
        }
        let trainee = if trainees.is_empty() {
            None
        } else {
            Some(trainees.join(", "))
        };

        let today = Local::now();
        let meeting_date = first_capture(&DATE_PATTERNS, transcript)
            .unwrap_or_else(|| today.format("%d/%m/%Y").to_string());
        let serial = format!("CEyS-{}", today.format("%y%m%d"));

        Self {
            project_name,
            meeting_date,
            program,
            file_number,
            trainee,
            lead_instructor,
            serial,
        }
    }
}

/// One row of the commitments table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub activity: String,
    pub due_date: String,
    pub responsible: String,
}

/// Structured fields pulled out of the drafted minutes. Every field is
/// optional: an absent field stays `None` rather than an empty string so
/// downstream rendering can tell "missing" from "blank".
#[derive(Debug, Clone, Default)]
pub struct MinutesFields {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub participants: Vec<String>,
    pub objectives: Option<String>,
    pub facts: Option<String>,
    pub case_analysis: Option<String>,
    pub conclusions: Option<String>,
    pub commitments: Vec<Commitment>,
}

/// Extract the structured fields from generated minutes markdown
pub fn extract_fields(minutes: &str) -> MinutesFields {
    MinutesFields {
        date: line_field(&FIELD_DATE, minutes),
        start_time: line_field(&FIELD_START, minutes),
        end_time: line_field(&FIELD_END, minutes),
        participants: extract_participants(minutes),
        objectives: section_after(&OBJECTIVES_HEADER, minutes),
        facts: section_after(&FACTS_HEADER, minutes),
        case_analysis: section_after(&ANALYSIS_HEADER, minutes),
        conclusions: section_after(&CONCLUSIONS_HEADER, minutes),
        commitments: extract_commitments(minutes),
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text).map(|c| c[1].trim().to_string()))
}

fn line_field(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .map(|c| c[1].replace('*', "").trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extract_participants(minutes: &str) -> Vec<String> {
    let Some(found) = PARTICIPANTS_HEADER.find(minutes) else {
        return Vec::new();
    };

    let mut participants = Vec::new();
    for line in minutes[found.end()..].lines() {
        let line = line.trim();
        if line.starts_with("##") {
            break;
        }
        if let Some(entry) = line.strip_prefix('-') {
            let entry = entry.replace('*', "").trim().to_string();
            if !entry.is_empty() {
                participants.push(entry);
            }
        }
    }
    participants
}

/// Text between a section header and the next `##`/numbered `###` header
fn section_after(header: &Regex, minutes: &str) -> Option<String> {
    let found = header.find(minutes)?;
    let rest = &minutes[found.end()..];
    let body = match SECTION_END.find(rest) {
        Some(end) => &rest[..end.start()],
        None => rest,
    };
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

fn extract_commitments(minutes: &str) -> Vec<Commitment> {
    let Some(found) = COMMITMENTS_HEADER.find(minutes) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for line in minutes[found.end()..].lines() {
        let line = line.trim();
        if line.starts_with("##") {
            break;
        }
        if !line.starts_with('|') {
            continue;
        }
        let cells: Vec<&str> = line.split('|').map(str::trim).collect();
        if cells.len() < 4 {
            continue;
        }
        if TABLE_RULE.is_match(cells[1]) || cells[1] == "Actividad/Decisión" {
            continue;
        }
        rows.push(Commitment {
            activity: cells[1].to_string(),
            due_date: cells[2].to_string(),
            responsible: cells[3].to_string(),
        });
    }
    rows
}
