//! C6: the day-merger. Combines every worker's drained records for one
//! trading day into a single reduce-side accumulator, finalizes the
//! per-second mean vectors, and hands them to the writer in ascending
//! `secOfDay` order.

use std::sync::mpsc::Receiver;

use crate::accumulator::Accumulator;
use crate::factors::NUM_FACTORS;
use crate::packed_key;
use crate::worker::Record;

/// One finalized, ready-to-write output row.
pub struct FinalizedRow {
    pub sec_of_day: u32,
    pub means: [f32; NUM_FACTORS],
}

/// Drain `rx` until every worker for this day has finished (the sender
/// side is dropped), fold every record into a reduce-side accumulator,
/// then finalize and sort by `secOfDay`.
///
/// Runs on its own thread per day (see `pipeline::run`), spawned up front
/// alongside every other day's merger, so a probe overflow here panics
/// this thread alone, same as a worker's.
pub fn merge_day(
    rx: Receiver<Record>,
    accumulator_initial_capacity: usize,
    accumulator_load_factor: f64,
) -> Vec<FinalizedRow> {
    let mut acc = Accumulator::new(accumulator_initial_capacity, accumulator_load_factor);

    for record in rx {
        acc.add_partial(record.packed_key, &record.sum, record.count);
    }

    let mut rows: Vec<FinalizedRow> = acc
        .drain()
        .map(|(packed, sum, count)| {
            let mut means = [0.0f32; NUM_FACTORS];
            for i in 0..NUM_FACTORS {
                means[i] = (sum[i] / count) as f32;
            }
            FinalizedRow {
                sec_of_day: packed_key::sec_of_day(packed),
                means,
            }
        })
        .collect();
    rows.sort_by_key(|row| row.sec_of_day);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    fn factors(v: f64) -> [f64; NUM_FACTORS] {
        [v; NUM_FACTORS]
    }

    #[test]
    fn single_record_finalizes_to_its_own_mean() {
        let (tx, rx) = sync_channel(16);
        let packed = packed_key::pack(104, 34_200);
        tx.send(Record {
            packed_key: packed,
            sum: factors(10.0),
            count: 2.0,
        })
        .unwrap();
        drop(tx);

        let rows = merge_day(rx, 16, 0.555);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sec_of_day, 34_200);
        assert_eq!(rows[0].means[0], 5.0);
    }

    #[test]
    fn multiple_workers_combine_and_sort_by_time() {
        let (tx, rx) = sync_channel(16);
        let later = packed_key::pack(104, 41_000);
        let earlier = packed_key::pack(104, 34_200);
        tx.send(Record {
            packed_key: later,
            sum: factors(4.0),
            count: 1.0,
        })
        .unwrap();
        tx.send(Record {
            packed_key: earlier,
            sum: factors(2.0),
            count: 1.0,
        })
        .unwrap();
        drop(tx);

        let rows = merge_day(rx, 16, 0.555);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sec_of_day, 34_200);
        assert_eq!(rows[1].sec_of_day, 41_000);
    }

    #[test]
    fn same_key_from_two_workers_accumulates() {
        let (tx, rx) = sync_channel(16);
        let packed = packed_key::pack(104, 34_200);
        tx.send(Record {
            packed_key: packed,
            sum: factors(10.0),
            count: 2.0,
        })
        .unwrap();
        tx.send(Record {
            packed_key: packed,
            sum: factors(5.0),
            count: 1.0,
        })
        .unwrap();
        drop(tx);

        let rows = merge_day(rx, 16, 0.555);
        assert_eq!(rows.len(), 1);
        // total sum = 15 (per column), total count = 3 -> mean = 5.0
        assert_eq!(rows[0].means[0], 5.0);
    }
}
