//! CSV export of scan results.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet tools pick up the
//! Chinese instrument names correctly.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::growth::{AnalysisResult, GrowthTier, TieredResults};
use super::report::ScanReport;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes tier and merged CSV files into one directory.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `hk_turnover_growth_<tag>_<YYYYMMDD>.csv`
    pub fn tier_file_name(tier: GrowthTier, date: NaiveDate) -> String {
        format!(
            "hk_turnover_growth_{}_{}.csv",
            tier.file_tag(),
            date.format("%Y%m%d")
        )
    }

    /// Write one file per non-empty tier; returns the paths written.
    pub fn save_tiers(&self, tiers: &TieredResults, date: NaiveDate) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        for tier in GrowthTier::ALL {
            let rows = tiers.tier(tier);
            if rows.is_empty() {
                continue;
            }
            let path = self.dir.join(Self::tier_file_name(tier, date));
            write_results(&path, rows)?;
            info!(tier = %tier, rows = rows.len(), path = %path.display(), "Saved tier CSV");
            written.push(path);
        }

        Ok(written)
    }

    /// Write the merged ranking; `None` when there is nothing to write.
    pub fn save_merged(
        &self,
        report: &ScanReport,
        timestamp: DateTime<Local>,
    ) -> Result<Option<PathBuf>> {
        if report.merged.is_empty() {
            return Ok(None);
        }

        let path = self.dir.join(format!(
            "hk_turnover_analysis_{}.csv",
            timestamp.format("%Y%m%d_%H%M%S")
        ));
        write_results(&path, &report.merged)?;
        info!(rows = report.merged.len(), path = %path.display(), "Saved merged CSV");
        Ok(Some(path))
    }
}

fn write_results(path: &Path, rows: &[AnalysisResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row for {}", row.symbol))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    Ok(())
}
