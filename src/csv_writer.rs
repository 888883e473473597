//! C8: CSV output writer. Fixed header, one row per finalized record,
//! written through a reusable line buffer and a large `BufWriter`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::WriteError;
use crate::factors::NUM_FACTORS;
use crate::format_f32::format_f32;
use crate::merger::FinalizedRow;

const HEADER: &str = "tradeTime,alpha_1,alpha_2,alpha_3,alpha_4,alpha_5,alpha_6,alpha_7,alpha_8,alpha_9,alpha_10,alpha_11,alpha_12,alpha_13,alpha_14,alpha_15,alpha_16,alpha_17,alpha_18,alpha_19,alpha_20\n";

/// A line is at most `HHMMSS` (6) + 20 * (`,` + up to ~16 digits) + `\n`,
/// comfortably under 1024 bytes.
const LINE_BUF_CAP: usize = 1024;

/// Write `rows` (already in ascending `secOfDay` order) to `path` as
/// `<MMDD>.csv`-shaped content: the fixed header followed by one line per
/// row.
pub fn write_csv(path: &Path, rows: &[FinalizedRow]) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|source| WriteError::CreateTemp {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::with_capacity(1 << 20, file);

    writer
        .write_all(HEADER.as_bytes())
        .map_err(|source| WriteError::WriteRow {
            path: path.to_path_buf(),
            source,
        })?;

    let mut line = [0u8; LINE_BUF_CAP];
    for row in rows {
        let pos = write_row(&mut line, row);
        writer
            .write_all(&line[..pos])
            .map_err(|source| WriteError::WriteRow {
                path: path.to_path_buf(),
                source,
            })?;
    }

    writer.flush().map_err(|source| WriteError::WriteRow {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn write_row(buf: &mut [u8; LINE_BUF_CAP], row: &FinalizedRow) -> usize {
    let mut pos = write_hhmmss(buf, 0, row.sec_of_day);
    for i in 0..NUM_FACTORS {
        buf[pos] = b',';
        pos += 1;
        pos = format_f32(row.means[i], buf, pos);
    }
    buf[pos] = b'\n';
    pos + 1
}

/// Zero-padded `HHMMSS`, written via repeated divmod-by-10 pairs.
fn write_hhmmss(buf: &mut [u8], pos: usize, sec_of_day: u32) -> usize {
    let hh = sec_of_day / 3600;
    let mm = (sec_of_day % 3600) / 60;
    let ss = sec_of_day % 60;
    let mut pos = pos;
    pos = write_two_digits(buf, pos, hh);
    pos = write_two_digits(buf, pos, mm);
    write_two_digits(buf, pos, ss)
}

fn write_two_digits(buf: &mut [u8], pos: usize, value: u32) -> usize {
    buf[pos] = b'0' + (value / 10) as u8;
    buf[pos + 1] = b'0' + (value % 10) as u8;
    pos + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn row(sec_of_day: u32, fill: f32) -> FinalizedRow {
        FinalizedRow {
            sec_of_day,
            means: [fill; NUM_FACTORS],
        }
    }

    #[test]
    fn header_is_written_even_with_no_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0104.csv");
        write_csv(&path, &[]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, HEADER);
    }

    #[test]
    fn one_row_matches_expected_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0104.csv");
        write_csv(&path, &[row(34_200, 100.0)]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), HEADER.trim_end());
        let data_line = lines.next().unwrap();
        assert!(data_line.starts_with("093000,100,100,100"));
        assert_eq!(data_line.matches(',').count(), NUM_FACTORS);
    }

    #[test]
    fn hhmmss_is_zero_padded() {
        let mut buf = [0u8; LINE_BUF_CAP];
        let pos = write_hhmmss(&mut buf, 0, 61); // 00:01:01
        assert_eq!(&buf[..pos], b"000101");
    }
}
