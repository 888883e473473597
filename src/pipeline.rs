//! C0: the driver. Resolves settings, builds the split plan, then spawns
//! every day's merger thread up front, spawns every chunk's worker thread
//! across all days, and lets each day commit its output as soon as its own
//! threads finish — days run concurrently with each other, not one at a
//! time.

use std::sync::mpsc::{SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use tracing::{info, info_span, warn};

use crate::config::Settings;
use crate::csv_writer;
use crate::error::{EngineError, WriteError};
use crate::merger::{self, FinalizedRow};
use crate::planner;
use crate::worker;

/// Outcome of running the whole pipeline: how many days committed versus
/// how many were discovered.
pub struct RunSummary {
    pub days_total: usize,
    pub days_committed: usize,
}

/// A day's merger thread, joined after all of that day's workers.
struct DayMerger {
    mmdd: String,
    handle: JoinHandle<Vec<FinalizedRow>>,
}

/// Run the engine end to end against `settings`. Returns `Ok` with a
/// summary if every day committed; if one or more days failed, the
/// remaining days still commit and the failure is reported via
/// `EngineError::PartialFailure` (per-day failures are isolated — see
/// DESIGN.md's resolved open question on worker-panic scope).
pub fn run(settings: &Settings) -> Result<RunSummary, EngineError> {
    let parallelism = settings.effective_parallelism();
    let plan = planner::build_plan(&settings.input_root, parallelism)?;
    let days_total = plan.days.len();

    info!(days = days_total, parallelism, "split plan built");

    std::fs::create_dir_all(&settings.output_root).map_err(|source| EngineError::Io {
        path: settings.output_root.clone(),
        source,
    })?;

    // Spawn every day's merger thread up front, before any worker exists.
    let mut mergers = Vec::with_capacity(days_total);
    let mut senders: Vec<SyncSender<worker::Record>> = Vec::with_capacity(days_total);
    for day in &plan.days {
        let (tx, rx) = sync_channel(settings.channel_capacity);
        let initial_capacity = settings.accumulator_initial_capacity;
        let load_factor = settings.accumulator_load_factor;
        let handle = thread::spawn(move || merger::merge_day(rx, initial_capacity, load_factor));
        mergers.push(DayMerger {
            mmdd: day.mmdd.clone(),
            handle,
        });
        senders.push(tx);
    }

    // Spawn every chunk's worker thread across all days, each holding a
    // clone of its day's sender.
    let mut worker_handles: Vec<Vec<JoinHandle<Result<(), EngineError>>>> =
        (0..days_total).map(|_| Vec::new()).collect();
    for (day_idx, day) in plan.days.iter().enumerate() {
        let tx = &senders[day_idx];
        for chunk in &day.chunks {
            let chunk = chunk.clone();
            let day_id = day.day_id;
            let initial_capacity = settings.accumulator_initial_capacity;
            let load_factor = settings.accumulator_load_factor;
            let tx = tx.clone();
            worker_handles[day_idx].push(thread::spawn(move || {
                worker::run_chunk(day_id, &chunk, initial_capacity, load_factor, &tx)
            }));
        }
    }
    // Drop the original senders so each day's channel closes once that
    // day's worker threads (which hold the only remaining clones) finish.
    drop(senders);

    // Join every worker thread first, recording which days failed.
    let mut day_failed = vec![false; days_total];
    for (day_idx, handles) in worker_handles.into_iter().enumerate() {
        let mmdd = &mergers[day_idx].mmdd;
        let span = info_span!("day", mmdd = %mmdd);
        let _enter = span.enter();
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(error = %err, "worker failed, day will not commit");
                    day_failed[day_idx] = true;
                }
                Err(payload) => {
                    let err = EngineError::ThreadPanic {
                        day: mmdd.clone(),
                        message: panic_message(&payload),
                    };
                    warn!(error = %err, "worker panicked, day will not commit");
                    day_failed[day_idx] = true;
                }
            }
        }
    }

    // Join every merger thread, then commit the days that survived.
    let mut committed = 0usize;
    for (day_idx, merger) in mergers.into_iter().enumerate() {
        let span = info_span!("day", mmdd = %merger.mmdd);
        let _enter = span.enter();
        let rows = match merger.handle.join() {
            Ok(rows) => rows,
            Err(payload) => {
                let err = EngineError::ThreadPanic {
                    day: merger.mmdd.clone(),
                    message: panic_message(&payload),
                };
                warn!(error = %err, "merger panicked, day will not commit");
                continue;
            }
        };
        if day_failed[day_idx] {
            continue;
        }
        match commit_day(settings, &merger.mmdd, &rows) {
            Ok(()) => {
                info!(rows = rows.len(), "day committed");
                committed += 1;
            }
            Err(err) => warn!(error = %err, "day failed to commit"),
        }
    }

    if committed == days_total {
        Ok(RunSummary {
            days_total,
            days_committed: committed,
        })
    } else {
        Err(EngineError::PartialFailure {
            count: days_total - committed,
            total: days_total,
        })
    }
}

fn commit_day(settings: &Settings, mmdd: &str, rows: &[FinalizedRow]) -> Result<(), EngineError> {
    let final_path = settings.output_root.join(format!("{mmdd}.csv"));
    let temp_path = settings.output_root.join(format!("{mmdd}.csv.tmp"));
    if let Err(err) = csv_writer::write_csv(&temp_path, rows) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err.into());
    }
    std::fs::rename(&temp_path, &final_path).map_err(|source| {
        let _ = std::fs::remove_file(&temp_path);
        EngineError::Write(WriteError::Commit {
            from: temp_path.clone(),
            to: final_path.clone(),
            source,
        })
    })?;
    Ok(())
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
