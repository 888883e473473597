//! C1: zero-allocation byte-scan parser for one snapshot CSV line.
//!
//! The parser never builds an intermediate `String`, never allocates, and
//! trusts the input to be well-formed ASCII decimal — see SPEC_FULL.md
//! §4.1. A malformed byte where a digit is expected produces an
//! unspecified (garbage-in-garbage-out) result, by contract.

/// Number of order-book levels this engine consumes (levels 1..5 of the
/// ten present in the input).
pub const LEVELS: usize = 5;

/// Outcome of parsing one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedRow {
    /// Header line or empty line: no state extracted.
    Skip,
    Row(SnapshotRow),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotRow {
    /// `month * 100 + day`, as in the packed key.
    pub day_id: u32,
    pub sec_of_day: u32,
    /// Only meaningful when the row was parsed with `emit_window = true`;
    /// otherwise both are `0` (the fields were never read off the line).
    pub t_bid_vol: i64,
    pub t_ask_vol: i64,
    pub bp: [i64; LEVELS],
    pub bv: [i64; LEVELS],
    pub ap: [i64; LEVELS],
    pub av: [i64; LEVELS],
}

/// Parse one line. `in_emit_window` is evaluated against the parsed
/// `secOfDay` to decide whether `tBidVol`/`tAskVol` are worth reading;
/// those two fields are irrelevant to lag-state maintenance, so skipping
/// them unread on out-of-window rows is a pure optimization with no
/// observable effect on output.
pub fn parse_line(line: &[u8], in_emit_window: impl Fn(u32) -> bool) -> ParsedRow {
    let line = strip_trailing_cr(line);
    if line.is_empty() || !line[0].is_ascii_digit() {
        return ParsedRow::Skip;
    }

    let mut pos = 0usize;

    let trading_day = read_uint(line, &mut pos);
    skip_comma(line, &mut pos);
    let month = ((trading_day / 100) % 100) as u32;
    let day = (trading_day % 100) as u32;
    let day_id = month * 100 + day;

    // Field 1 is a single fixed 6-digit HHMMSS field, not three
    // comma-delimited ones: read exactly two digits per component.
    let hh = read_fixed_digits(line, &mut pos, 2);
    let mm = read_fixed_digits(line, &mut pos, 2);
    let ss = read_fixed_digits(line, &mut pos, 2);
    skip_comma(line, &mut pos);
    let sec_of_day = hh * 3600 + mm * 60 + ss;

    skip_fields(line, &mut pos, 10);

    let (t_bid_vol, t_ask_vol) = if in_emit_window(sec_of_day) {
        let bid = read_uint(line, &mut pos);
        skip_comma(line, &mut pos);
        let ask = read_uint(line, &mut pos);
        skip_comma(line, &mut pos);
        (bid, ask)
    } else {
        skip_fields(line, &mut pos, 2);
        (0, 0)
    };

    skip_fields(line, &mut pos, 3);

    let mut bp = [0i64; LEVELS];
    let mut bv = [0i64; LEVELS];
    let mut ap = [0i64; LEVELS];
    let mut av = [0i64; LEVELS];
    for i in 0..LEVELS {
        bp[i] = read_uint(line, &mut pos);
        skip_comma(line, &mut pos);
        bv[i] = read_uint(line, &mut pos);
        skip_comma(line, &mut pos);
        ap[i] = read_uint(line, &mut pos);
        skip_comma(line, &mut pos);
        av[i] = read_uint(line, &mut pos);
        skip_comma(line, &mut pos);
    }

    ParsedRow::Row(SnapshotRow {
        day_id,
        sec_of_day,
        t_bid_vol,
        t_ask_vol,
        bp,
        bv,
        ap,
        av,
    })
}

#[inline]
fn strip_trailing_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// Read exactly `width` decimal digits as a fixed-width field (no
/// comma-termination scan): used for the `HH`/`MM`/`SS` triplet packed
/// into field 1's single 6-digit `HHMMSS` value.
#[inline]
fn read_fixed_digits(line: &[u8], pos: &mut usize, width: usize) -> u32 {
    let mut val = 0u32;
    for _ in 0..width {
        val = val * 10 + (line[*pos] - b'0') as u32;
        *pos += 1;
    }
    val
}

#[inline]
fn read_uint(line: &[u8], pos: &mut usize) -> i64 {
    let mut val: i64 = 0;
    while *pos < line.len() {
        let b = line[*pos];
        if !b.is_ascii_digit() {
            break;
        }
        val = val * 10 + (b - b'0') as i64;
        *pos += 1;
    }
    val
}

#[inline]
fn skip_comma(line: &[u8], pos: &mut usize) {
    if *pos < line.len() && line[*pos] == b',' {
        *pos += 1;
    }
}

#[inline]
fn skip_fields(line: &[u8], pos: &mut usize, n: usize) {
    for _ in 0..n {
        while *pos < line.len() && line[*pos] != b',' {
            *pos += 1;
        }
        if *pos < line.len() {
            *pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_line() -> String {
        // tradingDay, tradeTime, 10 ignored, tBidVol, tAskVol, 3 ignored,
        // then 10 levels of (bp,bv,ap,av); only levels 1..5 matter.
        let mut fields: Vec<String> = vec![
            "20240104".to_string(),
            "093000".to_string(),
        ];
        for _ in 0..10 {
            fields.push("0".to_string());
        }
        fields.push("1957500".to_string()); // tBidVol
        fields.push("5143750".to_string()); // tAskVol
        for _ in 0..3 {
            fields.push("0".to_string());
        }
        let bids = [
            (254100, 200),
            (254000, 51500),
            (253900, 1000),
            (253800, 1100),
            (253600, 15500),
        ];
        let asks = [
            (254200, 12700),
            (254300, 8300),
            (254400, 15600),
            (254500, 40300),
            (254600, 40200),
        ];
        for i in 0..10 {
            if i < 5 {
                fields.push(bids[i].0.to_string());
                fields.push(bids[i].1.to_string());
                fields.push(asks[i].0.to_string());
                fields.push(asks[i].1.to_string());
            } else {
                fields.push("0".to_string());
                fields.push("0".to_string());
                fields.push("0".to_string());
                fields.push("0".to_string());
            }
        }
        fields.join(",")
    }

    #[test]
    fn header_line_is_skipped() {
        let header = b"tradingDay,tradeTime,...";
        assert_eq!(parse_line(header, |_| true), ParsedRow::Skip);
    }

    #[test]
    fn empty_line_is_skipped() {
        assert_eq!(parse_line(b"", |_| true), ParsedRow::Skip);
    }

    #[test]
    fn parses_day_time_and_levels() {
        let line = sample_line();
        let row = match parse_line(line.as_bytes(), |_| true) {
            ParsedRow::Row(r) => r,
            ParsedRow::Skip => panic!("expected a row"),
        };
        assert_eq!(row.day_id, 104); // month=01, day=04 -> 1*100+4
        assert_eq!(row.sec_of_day, 9 * 3600 + 30 * 60);
        assert_eq!(row.t_bid_vol, 1957500);
        assert_eq!(row.t_ask_vol, 5143750);
        assert_eq!(row.bp, [254100, 254000, 253900, 253800, 253600]);
        assert_eq!(row.bv, [200, 51500, 1000, 1100, 15500]);
        assert_eq!(row.ap, [254200, 254300, 254400, 254500, 254600]);
        assert_eq!(row.av, [12700, 8300, 15600, 40300, 40200]);
    }

    #[test]
    fn out_of_window_skips_trade_volumes_unread() {
        let line = sample_line();
        let row = match parse_line(line.as_bytes(), |_| false) {
            ParsedRow::Row(r) => r,
            ParsedRow::Skip => panic!("expected a row"),
        };
        assert_eq!(row.t_bid_vol, 0);
        assert_eq!(row.t_ask_vol, 0);
        // Levels are still populated even though the row is out-of-window,
        // since lag state needs them.
        assert_eq!(row.ap[0], 254200);
        assert_eq!(row.bp[0], 254100);
    }

    #[test]
    fn strips_one_trailing_cr() {
        let line = format!("{}\r", sample_line());
        let row = match parse_line(line.as_bytes(), |_| true) {
            ParsedRow::Row(r) => r,
            ParsedRow::Skip => panic!("expected a row"),
        };
        assert_eq!(row.sec_of_day, 9 * 3600 + 30 * 60);
    }

    proptest! {
        #[test]
        fn byte_offset_fuzz_never_panics(
            month in 1u32..=12,
            day in 1u32..=28,
            hh in 0u32..=23,
            mm in 0u32..=59,
            ss in 0u32..=59,
            bid_vol in 0i64..10_000_000,
            ask_vol in 0i64..10_000_000,
            levels in proptest::collection::vec((0i64..1_000_000, 0i64..1_000_000, 0i64..1_000_000, 0i64..1_000_000), 10),
        ) {
            let mut fields: Vec<String> = vec![
                format!("2024{:02}{:02}", month, day),
                format!("{:02}{:02}{:02}", hh, mm, ss),
            ];
            for _ in 0..10 { fields.push("0".to_string()); }
            fields.push(bid_vol.to_string());
            fields.push(ask_vol.to_string());
            for _ in 0..3 { fields.push("0".to_string()); }
            for (bp, bv, ap, av) in &levels {
                fields.push(bp.to_string());
                fields.push(bv.to_string());
                fields.push(ap.to_string());
                fields.push(av.to_string());
            }
            let line = fields.join(",");
            let row = match parse_line(line.as_bytes(), |_| true) {
                ParsedRow::Row(r) => r,
                ParsedRow::Skip => panic!("digit-led line must parse"),
            };
            prop_assert_eq!(row.day_id, month * 100 + day);
            prop_assert_eq!(row.sec_of_day, hh * 3600 + mm * 60 + ss);
            prop_assert_eq!(row.t_bid_vol, bid_vol);
            prop_assert_eq!(row.t_ask_vol, ask_vol);
            for i in 0..LEVELS {
                prop_assert_eq!(row.bp[i], levels[i].0);
                prop_assert_eq!(row.bv[i], levels[i].1);
                prop_assert_eq!(row.ap[i], levels[i].2);
                prop_assert_eq!(row.av[i], levels[i].3);
            }
        }
    }
}
