//! C4: split planner. Discovers the `<root>/<MMDD>/<stock>/snapshot.csv`
//! tree and produces, for each discovered trading day, a list of chunks
//! (disjoint groups of consecutive files) for workers to process.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PlanError;

/// One trading day's discovered files, partitioned into worker chunks.
#[derive(Debug, Clone)]
pub struct DayPlan {
    /// `month * 100 + day`.
    pub day_id: u32,
    /// The `MMDD` directory name, used for the output filename.
    pub mmdd: String,
    pub chunks: Vec<Vec<PathBuf>>,
}

/// The full plan: one [`DayPlan`] per discovered day, in discovery order.
/// Discovery order defines the `dayId -> partition` mapping the day-merger
/// routing layer uses (the k-th discovered day is written by the k-th
/// output writer).
#[derive(Debug, Clone)]
pub struct Plan {
    pub days: Vec<DayPlan>,
}

/// Build the split plan. `parallelism` is `P = min(8, hw parallelism)`,
/// already resolved by the caller (see `Settings::effective_parallelism`).
pub fn build_plan(input_root: &Path, parallelism: usize) -> Result<Plan, PlanError> {
    if !input_root.exists() {
        return Err(PlanError::RootNotFound(input_root.to_path_buf()));
    }
    if !input_root.is_dir() {
        return Err(PlanError::RootNotADirectory(input_root.to_path_buf()));
    }

    let mut day_dirs: Vec<PathBuf> = WalkDir::new(input_root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|p| p.is_dir())
        .collect();
    day_dirs.sort();

    if day_dirs.is_empty() {
        return Err(PlanError::NoTradingDays(input_root.to_path_buf()));
    }

    let mut days = Vec::with_capacity(day_dirs.len());
    for day_dir in day_dirs {
        let mmdd = day_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let day_id = parse_mmdd(&mmdd);

        let mut files: Vec<PathBuf> = WalkDir::new(&day_dir)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some("snapshot.csv"))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(PlanError::EmptyDay { day: mmdd });
        }

        let chunks = partition_into_chunks(files, parallelism);
        days.push(DayPlan {
            day_id,
            mmdd,
            chunks,
        });
    }

    Ok(Plan { days })
}

/// `S = min(P, N)` chunks of `ceil(N / S)` consecutive files each, last
/// chunk possibly shorter.
fn partition_into_chunks(files: Vec<PathBuf>, parallelism: usize) -> Vec<Vec<PathBuf>> {
    let n = files.len();
    let s = parallelism.min(n).max(1);
    let chunk_size = n.div_ceil(s);
    files
        .chunks(chunk_size)
        .map(|slice| slice.to_vec())
        .collect()
}

fn parse_mmdd(mmdd: &str) -> u32 {
    let bytes = mmdd.as_bytes();
    let mut month = 0u32;
    let mut day = 0u32;
    for &b in bytes.iter().take(2) {
        month = month * 10 + (b - b'0') as u32;
    }
    for &b in bytes.iter().skip(2).take(2) {
        day = day * 10 + (b - b'0') as u32;
    }
    month * 100 + day
}
