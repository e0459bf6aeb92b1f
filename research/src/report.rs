//! Markdown report files.

use crate::config::ResearchConfig;
use crate::error::ResearchError;
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::info;

/// `research_report_<safe topic>_<mode>_<YYYYMMDD_HHMMSS>.md`
pub fn report_file_name(config: &ResearchConfig, at: NaiveDateTime) -> String {
    format!(
        "research_report_{}_{}_{}.md",
        config.safe_topic(),
        config.quality,
        at.format("%Y%m%d_%H%M%S")
    )
}

/// The report body under a header naming the topic, time, mode and language.
pub fn render_report(config: &ResearchConfig, body: &str, at: NaiveDateTime) -> String {
    format!(
        "# {} research report\n\n\
         **Generated:** {}\n\
         **Quality mode:** {}\n\
         **Language:** {}\n\n\
         ---\n\n\
         {}",
        config.topic,
        at.format("%Y-%m-%d %H:%M:%S"),
        config.quality,
        config.language,
        body
    )
}

/// Write the report into `dir`, creating it if needed.
pub async fn save_report(
    dir: &Path,
    config: &ResearchConfig,
    body: &str,
) -> Result<PathBuf, ResearchError> {
    if body.trim().is_empty() {
        return Err(ResearchError::EmptyReport);
    }

    let now = Local::now().naive_local();
    let path = dir.join(report_file_name(config, now));
    let write_error = |source: std::io::Error| ResearchError::Write {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_error)?;
    tokio::fs::write(&path, render_report(config, body, now))
        .await
        .map_err(write_error)?;

    info!(path = %path.display(), "report saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityMode;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_file_name() {
        let config =
            ResearchConfig::new("Space tech: 2025").with_quality(QualityMode::LanguageOptimized);
        assert_eq!(
            report_file_name(&config, at()),
            "research_report_Space_tech_2025_language_optimized_20250309_140507.md"
        );
    }

    #[test]
    fn test_header() {
        let config = ResearchConfig::new("Food tech").with_language("Korean");
        let text = render_report(&config, "Body text", at());
        assert!(text.starts_with("# Food tech research report\n\n"));
        assert!(text.contains("**Generated:** 2025-03-09 14:05:07\n"));
        assert!(text.contains("**Quality mode:** standard\n"));
        assert!(text.contains("**Language:** Korean\n\n---\n\nBody text"));
    }

    #[tokio::test]
    async fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let config = ResearchConfig::new("Rust");

        let path = save_report(&out, &config, "# Rust\n\nFast.").await.unwrap();

        assert_eq!(path.parent(), Some(out.as_path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("research_report_Rust_standard_"));
        assert!(name.ends_with(".md"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("# Rust\n\nFast."));
    }

    #[tokio::test]
    async fn test_empty_report_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_report(dir.path(), &ResearchConfig::new("Rust"), "  \n")
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::EmptyReport));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
