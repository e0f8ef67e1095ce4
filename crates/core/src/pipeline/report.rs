use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use super::identify_faces_use_case::IdentifiedFace;

pub const REPORT_FILE_NAME: &str = "report.json";

/// Counts over a batch of identified faces.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub faces: usize,
    pub known: usize,
    pub unknown: usize,
    pub frontalized: usize,
    /// Faces per recognized person, by name.
    pub people: BTreeMap<String, usize>,
}

impl Summary {
    pub fn of(faces: &[IdentifiedFace]) -> Self {
        let mut summary = Summary {
            faces: faces.len(),
            ..Summary::default()
        };
        for face in faces {
            if face.identity.is_known() {
                summary.known += 1;
                *summary
                    .people
                    .entry(face.identity.name().to_string())
                    .or_default() += 1;
            } else {
                summary.unknown += 1;
            }
            if face.frontal.is_some() {
                summary.frontalized += 1;
            }
        }
        summary
    }
}

#[derive(Serialize)]
struct Report<'a> {
    source: Option<&'a Path>,
    summary: Summary,
    faces: &'a [IdentifiedFace],
}

/// Writes the per-face records and their summary as pretty JSON.
pub fn write_report(
    path: &Path,
    source: Option<&Path>,
    faces: &[IdentifiedFace],
) -> std::io::Result<Summary> {
    let summary = Summary::of(faces);
    let report = Report {
        source,
        summary: summary.clone(),
        faces,
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(summary)
}
