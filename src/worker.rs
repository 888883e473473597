//! C5: the per-chunk worker. Drives a list of files belonging to one
//! trading day through the parser (C1) and factor kernel (C2), folding
//! results into a map-side accumulator (C3), then forwards the drained
//! entries to the day's merger over a bounded channel.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::mpsc::SyncSender;

use crate::accumulator::Accumulator;
use crate::error::EngineError;
use crate::factors::{LagState, compute_factors, in_emit_window, update_lag_only};
use crate::packed_key;
use crate::parser::{ParsedRow, parse_line};

/// One drained accumulator entry in flight to the merger.
pub struct Record {
    pub packed_key: i32,
    pub sum: [f64; crate::factors::NUM_FACTORS],
    pub count: f64,
}

/// Process every file in `chunk` (already ordered by the planner) and send
/// every resulting record to `tx`. Lag state resets at each file boundary
/// and whenever `secOfDay` is observed to rewind within a file.
pub fn run_chunk(
    day_id: u32,
    chunk: &[PathBuf],
    accumulator_initial_capacity: usize,
    accumulator_load_factor: f64,
    tx: &SyncSender<Record>,
) -> Result<(), EngineError> {
    let mut acc = Accumulator::new(accumulator_initial_capacity, accumulator_load_factor);

    for path in chunk {
        let mut lag = LagState::reset();
        let file = fs::File::open(path).map_err(|source| EngineError::Io {
            path: path.clone(),
            source,
        })?;
        let reader = BufReader::with_capacity(1 << 16, file);

        for line in reader.lines() {
            let line = line.map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;

            let row = match parse_line(line.as_bytes(), in_emit_window) {
                ParsedRow::Skip => continue,
                ParsedRow::Row(row) => row,
            };

            if lag.is_rewind(row.sec_of_day) {
                lag = LagState::reset();
            }

            if in_emit_window(row.sec_of_day) {
                let factors = compute_factors(&row, &mut lag);
                let packed = packed_key::pack(day_id, row.sec_of_day);
                acc.add_or_accumulate(packed, &factors);
            } else {
                update_lag_only(&row, &mut lag);
            }
        }
    }

    for (packed_key, sum, count) in acc.drain() {
        // A closed receiver means the merger already gave up (e.g. a
        // sibling chunk's I/O error tore down the day); nothing left to do.
        if tx
            .send(Record {
                packed_key,
                sum,
                count,
            })
            .is_err()
        {
            break;
        }
    }

    Ok(())
}
