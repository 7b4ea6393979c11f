/// NOAA CPC Niño 3.4 anomaly table client.
///
/// Retrieves the detrended Niño 3.4 monthly table published by the Climate
/// Prediction Center as whitespace-delimited text:
///
/// ```text
///  YR   MON  TOTAL ClimAdjust   ANOM
/// 1950    1  24.56  26.18  -1.62
/// 1950    2  25.07  26.39  -1.32
/// ...
/// ```
///
/// Raw data: https://www.cpc.ncep.noaa.gov/products/analysis_monitoring/ensostuff/detrend.nino34.ascii.txt

use chrono::NaiveDate;

use crate::model::{EnsoError, Observation};

/// Columns expected in each data row.
const FIELDS_PER_ROW: usize = 5;

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Fetch and parse the full anomaly series.
///
/// Returns observations sorted ascending by month. Duplicate months in the
/// source are rejected rather than repaired.
pub fn fetch_series(
    client: &reqwest::blocking::Client,
    base_url: &str,
) -> Result<Vec<Observation>, EnsoError> {
    let response = client
        .get(base_url)
        .send()
        .map_err(|e| EnsoError::ParseError(format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(EnsoError::HttpError(response.status().as_u16()));
    }

    let text = response
        .text()
        .map_err(|e| EnsoError::ParseError(format!("body read failed: {}", e)))?;

    parse_series(&text)
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Parse the whitespace-delimited table into a sorted series.
///
/// The first line is the column header and is skipped. Blank lines are
/// tolerated anywhere; any other malformed row aborts the parse with a
/// `ParseError` naming the line.
pub fn parse_series(text: &str) -> Result<Vec<Observation>, EnsoError> {
    let mut observations = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if i == 0 || line.trim().is_empty() {
            continue; // Skip header or empty lines
        }
        observations.push(parse_row(i + 1, line)?);
    }

    observations.sort_by_key(|obs| obs.date);

    for pair in observations.windows(2) {
        if pair[0].date == pair[1].date {
            return Err(EnsoError::InvalidSeries(format!(
                "duplicate month {} in source table",
                pair[0].date
            )));
        }
    }

    Ok(observations)
}

/// Parse one data row: YR MON TOTAL ClimAdjust ANOM.
fn parse_row(line_number: usize, line: &str) -> Result<Observation, EnsoError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELDS_PER_ROW {
        return Err(EnsoError::ParseError(format!(
            "row {}: expected {} fields, found {}",
            line_number,
            FIELDS_PER_ROW,
            fields.len()
        )));
    }

    let year: i32 = fields[0]
        .parse()
        .map_err(|_| EnsoError::ParseError(format!("row {}: bad year {:?}", line_number, fields[0])))?;
    let month: u32 = fields[1]
        .parse()
        .map_err(|_| EnsoError::ParseError(format!("row {}: bad month {:?}", line_number, fields[1])))?;

    let parse_value = |name: &str, raw: &str| -> Result<f64, EnsoError> {
        raw.parse().map_err(|_| {
            EnsoError::ParseError(format!("row {}: bad {} {:?}", line_number, name, raw))
        })
    };

    let total = parse_value("TOTAL", fields[2])?;
    let climate_adjustment = parse_value("ClimAdjust", fields[3])?;
    let anomaly = parse_value("ANOM", fields[4])?;

    let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        EnsoError::ParseError(format!(
            "row {}: {}-{} is not a calendar month",
            line_number, year, month
        ))
    })?;

    Ok(Observation {
        date,
        total,
        climate_adjustment,
        anomaly,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
 YR   MON  TOTAL ClimAdjust   ANOM
1950     1  24.56  26.18  -1.62
1950     2  25.07  26.39  -1.32
1950     3  25.87  26.94  -1.07
";

    #[test]
    fn test_parse_skips_header_and_reads_rows() {
        let series = parse_series(SAMPLE).expect("sample should parse");
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(1950, 1, 1).unwrap());
        assert_eq!(series[0].total, 24.56);
        assert_eq!(series[0].climate_adjustment, 26.18);
        assert_eq!(series[0].anomaly, -1.62);
    }

    #[test]
    fn test_parse_tolerates_blank_lines() {
        let with_blanks = format!("{}\n\n", SAMPLE);
        let series = parse_series(&with_blanks).expect("trailing blanks should be ignored");
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_out_of_order_rows_are_sorted_by_month() {
        let shuffled = "\
 YR   MON  TOTAL ClimAdjust   ANOM
1950     3  25.87  26.94  -1.07
1950     1  24.56  26.18  -1.62
1950     2  25.07  26.39  -1.32
";
        let series = parse_series(shuffled).expect("shuffled rows should parse");
        let months: Vec<u32> = series
            .iter()
            .map(|o| o.date.format("%m").to_string().parse().unwrap())
            .collect();
        assert_eq!(months, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_month_is_rejected() {
        let duplicated = "\
 YR   MON  TOTAL ClimAdjust   ANOM
1950     1  24.56  26.18  -1.62
1950     1  24.56  26.18  -1.62
";
        let result = parse_series(duplicated);
        assert!(matches!(result, Err(EnsoError::InvalidSeries(_))), "got {:?}", result);
    }

    #[test]
    fn test_non_numeric_anomaly_is_a_parse_error() {
        let bad = "\
 YR   MON  TOTAL ClimAdjust   ANOM
1950     1  24.56  26.18  oops
";
        let result = parse_series(bad);
        match result {
            Err(EnsoError::ParseError(msg)) => {
                assert!(msg.contains("ANOM"), "message should name the column: {}", msg)
            }
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_impossible_month_is_a_parse_error() {
        let bad = "\
 YR   MON  TOTAL ClimAdjust   ANOM
1950    13  24.56  26.18  -1.62
";
        assert!(matches!(parse_series(bad), Err(EnsoError::ParseError(_))));
    }

    #[test]
    fn test_short_row_names_the_line() {
        let bad = "\
 YR   MON  TOTAL ClimAdjust   ANOM
1950     1  24.56
";
        match parse_series(bad) {
            Err(EnsoError::ParseError(msg)) => {
                assert!(msg.contains("row 2"), "message should name the row: {}", msg)
            }
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_input_is_an_empty_series() {
        let series = parse_series(" YR   MON  TOTAL ClimAdjust   ANOM\n").unwrap();
        assert!(series.is_empty());
    }
}
