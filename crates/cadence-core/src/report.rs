//! Per-scenario score records, run-wide aggregation and CSV reports.
//!
//! Both reports are written as UTF-8 with a leading byte-order mark so
//! spreadsheet tools pick the right encoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{AccuracyScore, AccuracyWeights, DiversityPool};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors from writing reports.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Scores for one scenario. Created once and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: String,
    /// `<Location>-<Goal>`
    pub context: String,
    pub accuracy: AccuracyScore,
    pub total_accuracy: f64,
    pub stability: u8,
    pub search_success: u8,
    pub consistency: f64,
    pub primary_tag: String,
    pub output_reasoning: String,
    pub recommended_track: String,
}

impl ScoreRecord {
    /// A well-formed track that the catalog could not confirm.
    pub fn is_hallucination(&self) -> bool {
        self.stability == 1 && self.search_success == 0
    }

    /// The recommended track when it is a hallucination, empty otherwise.
    pub fn hallucination_track(&self) -> &str {
        if self.is_hallucination() {
            &self.recommended_track
        } else {
            ""
        }
    }

    /// Total accuracy with the given weights, rounded to one decimal.
    pub fn weighted_total(accuracy: &AccuracyScore, weights: &AccuracyWeights) -> f64 {
        round1(accuracy.total(weights))
    }
}

/// Run-wide means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub accuracy_total: f64,
    pub accuracy_logic: f64,
    pub accuracy_math: f64,
    /// Percentage.
    pub stability: f64,
    /// Percentage.
    pub search_success_rate: f64,
    pub consistency: f64,
    /// Percentage.
    pub diversity: f64,
}

impl KpiSummary {
    /// Means over `records`; every mean is 0 for an empty set.
    pub fn from_records(records: &[ScoreRecord], diversity: f64) -> Self {
        Self {
            accuracy_total: mean(records, |r| r.total_accuracy),
            accuracy_logic: mean(records, |r| r.accuracy.judged),
            accuracy_math: mean(records, |r| round1(r.accuracy.semantic)),
            stability: mean(records, |r| f64::from(r.stability)) * 100.0,
            search_success_rate: mean(records, |r| f64::from(r.search_success)) * 100.0,
            consistency: mean(records, |r| r.consistency),
            diversity,
        }
    }

    /// `(KPI_Name, Score)` rows of the summary report.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Accuracy (Total)", format!("{:.1}", self.accuracy_total)),
            ("Accuracy (Logic)", format!("{:.1}", self.accuracy_logic)),
            ("Accuracy (Math)", format!("{:.1}", self.accuracy_math)),
            ("Stability", format!("{:.1}%", self.stability)),
            ("Search Success Rate", format!("{:.1}%", self.search_success_rate)),
            ("Consistency", format!("{:.2}", self.consistency)),
            ("Diversity", format!("{:.1}%", self.diversity)),
        ]
    }
}

/// Full result of an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub records: Vec<ScoreRecord>,
    pub summary: KpiSummary,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// Aggregate finished score records and the run's diversity pool.
    pub fn aggregate(records: Vec<ScoreRecord>, pool: &DiversityPool) -> Self {
        let summary = KpiSummary::from_records(&records, pool.score());
        Self {
            records,
            summary,
            evaluated_at: Utc::now(),
        }
    }

    /// Write the per-scenario report.
    pub fn write_detail<W: Write>(&self, mut writer: W) -> Result<(), ReportError> {
        writer.write_all(UTF8_BOM).map_err(|source| ReportError::Io {
            path: "<detail>".to_string(),
            source,
        })?;

        let diversity = round1(self.summary.diversity);
        let overall = format!("{:.1}%", self.summary.search_success_rate);

        let mut csv = csv::Writer::from_writer(writer);
        for record in &self.records {
            csv.serialize(DetailRow {
                id: &record.id,
                context: &record.context,
                total_accuracy: record.total_accuracy,
                accuracy_logic: record.accuracy.judged,
                accuracy_math: round1(record.accuracy.semantic),
                stability: record.stability,
                search_success: record.search_success,
                consistency: record.consistency,
                primary_tag: &record.primary_tag,
                hallucination_track: record.hallucination_track(),
                output_reasoning: &record.output_reasoning,
                recommended_track: &record.recommended_track,
                diversity,
                overall_search_success_rate: &overall,
            })?;
        }
        if self.records.is_empty() {
            csv.write_record(DETAIL_HEADERS)?;
        }
        csv.flush().map_err(|source| ReportError::Io {
            path: "<detail>".to_string(),
            source,
        })?;
        Ok(())
    }

    /// Write the `KPI_Name, Score` summary report.
    pub fn write_summary<W: Write>(&self, mut writer: W) -> Result<(), ReportError> {
        writer.write_all(UTF8_BOM).map_err(|source| ReportError::Io {
            path: "<summary>".to_string(),
            source,
        })?;

        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["KPI_Name", "Score"])?;
        for (name, score) in self.summary.rows() {
            csv.write_record([name, score.as_str()])?;
        }
        csv.flush().map_err(|source| ReportError::Io {
            path: "<summary>".to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn write_detail_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        self.write_detail(create(path.as_ref())?)
    }

    pub fn write_summary_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        self.write_summary(create(path.as_ref())?)
    }
}

const DETAIL_HEADERS: [&str; 14] = [
    "ID",
    "Context",
    "Score_Total_Accuracy",
    "Score_Accuracy_Logic",
    "Score_Accuracy_Math",
    "Score_Stability",
    "Score_SearchSuccess",
    "Score_Consistency",
    "Primary_Tag",
    "Hallucination_Track",
    "Output_Reasoning",
    "Recommended_Track",
    "Score_Diversity",
    "Overall_Search_Success_Rate",
];

#[derive(Serialize)]
struct DetailRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Context")]
    context: &'a str,
    #[serde(rename = "Score_Total_Accuracy")]
    total_accuracy: f64,
    #[serde(rename = "Score_Accuracy_Logic")]
    accuracy_logic: f64,
    #[serde(rename = "Score_Accuracy_Math")]
    accuracy_math: f64,
    #[serde(rename = "Score_Stability")]
    stability: u8,
    #[serde(rename = "Score_SearchSuccess")]
    search_success: u8,
    #[serde(rename = "Score_Consistency")]
    consistency: f64,
    #[serde(rename = "Primary_Tag")]
    primary_tag: &'a str,
    #[serde(rename = "Hallucination_Track")]
    hallucination_track: &'a str,
    #[serde(rename = "Output_Reasoning")]
    output_reasoning: &'a str,
    #[serde(rename = "Recommended_Track")]
    recommended_track: &'a str,
    #[serde(rename = "Score_Diversity")]
    diversity: f64,
    #[serde(rename = "Overall_Search_Success_Rate")]
    overall_search_success_rate: &'a str,
}

fn create(path: &Path) -> Result<BufWriter<File>, ReportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn mean(records: &[ScoreRecord], field: impl Fn(&ScoreRecord) -> f64) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(field).sum::<f64>() / records.len() as f64
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, stability: u8, search_success: u8, title: &str) -> ScoreRecord {
        let accuracy = AccuracyScore {
            semantic: 62.34,
            judged: 80.0,
        };
        ScoreRecord {
            id: id.to_string(),
            context: "library-focus".to_string(),
            total_accuracy: ScoreRecord::weighted_total(&accuracy, &AccuracyWeights::default()),
            accuracy,
            stability,
            search_success,
            consistency: 1.0,
            primary_tag: "focus_piano_calm".to_string(),
            output_reasoning: "Quiet piano, no lyrics.".to_string(),
            recommended_track: format!("Artist - {title}"),
        }
    }

    fn report() -> EvaluationReport {
        let mut pool = DiversityPool::new();
        pool.record_title("A");
        pool.record_title("B");
        EvaluationReport::aggregate(
            vec![record("1", 1, 1, "A"), record("2", 1, 0, "B")],
            &pool,
        )
    }

    #[test]
    fn test_hallucination_track() {
        assert_eq!(record("1", 1, 0, "A").hallucination_track(), "Artist - A");
        assert_eq!(record("1", 1, 1, "A").hallucination_track(), "");
        assert_eq!(record("1", 0, 0, "A").hallucination_track(), "");
    }

    #[test]
    fn test_summary_means() {
        let summary = report().summary;
        assert_eq!(summary.stability, 100.0);
        assert_eq!(summary.search_success_rate, 50.0);
        assert_eq!(summary.diversity, 100.0);
        assert!((summary.accuracy_math - 62.3).abs() < 1e-9);
        assert!((summary.accuracy_total - 74.7).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run_aggregates_to_zero() {
        let report = EvaluationReport::aggregate(Vec::new(), &DiversityPool::new());
        assert_eq!(report.summary, KpiSummary::default());
    }

    #[test]
    fn test_summary_csv_rows() {
        let mut buf = Vec::new();
        report().write_summary(&mut buf).unwrap();
        assert!(buf.starts_with(UTF8_BOM));

        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "KPI_Name,Score");
        assert_eq!(lines[4], "Stability,100.0%");
        assert_eq!(lines[5], "Search Success Rate,50.0%");
        assert_eq!(lines[6], "Consistency,1.00");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_detail_csv_columns() {
        let mut buf = Vec::new();
        report().write_detail(&mut buf).unwrap();
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut reader = csv::Reader::from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, DETAIL_HEADERS);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][9], "Artist - B");
        assert_eq!(&rows[0][9], "");
        assert_eq!(&rows[0][13], "50.0%");
    }

    #[test]
    fn test_empty_detail_still_has_headers() {
        let report = EvaluationReport::aggregate(Vec::new(), &DiversityPool::new());
        let mut buf = Vec::new();
        report.write_detail(&mut buf).unwrap();
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("ID,Context,Score_Total_Accuracy"));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = report();
        report.write_detail_csv(dir.path().join("final_kpi_report.csv")).unwrap();
        report.write_summary_csv(dir.path().join("summary_report.csv")).unwrap();
        let bytes = std::fs::read(dir.path().join("summary_report.csv")).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
    }
}
