//! Result-file text format (spec §6): leading `#` metadata lines, one
//! header row naming every column in the fixed order `{Ntrades, AvgTicks,
//! WinPerc, PftFactor, NP/MDD, Expectancy, Z-score, ...parameters}`, then
//! one comma-separated row per strategy.

use std::collections::BTreeSet;

use btfast_core::params::Parameters;
use btfast_core::performance::Metrics;

use crate::error::{Result, SearchError};
use crate::result::{StrategyResult, METRIC_COLUMNS};

/// Union of every parameter name appearing across `results`, sorted for a
/// stable column order.
fn param_names(results: &[StrategyResult]) -> Vec<String> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    for r in results {
        names.extend(r.parameters.keys().cloned());
    }
    names.into_iter().collect()
}

/// Build the `(header, rows)` table a result file holds, before rendering.
pub fn to_table(results: &[StrategyResult]) -> (Vec<String>, Vec<Vec<String>>) {
    let params = param_names(results);
    let header: Vec<String> = METRIC_COLUMNS.iter().map(|s| s.to_string()).chain(params.iter().cloned()).collect();

    let rows = results
        .iter()
        .map(|r| {
            let mut row: Vec<String> = r.header_row().iter().map(|v| v.to_string()).collect();
            for name in &params {
                row.push(r.parameters.get(name).map(|v| v.to_string()).unwrap_or_default());
            }
            row
        })
        .collect();

    (header, rows)
}

/// Inverse of [`to_table`]: every result is stamped with `ndays` since the
/// table itself carries no per-row day count.
pub fn from_table(header: &[String], rows: &[Vec<String>], ndays: i64) -> Result<Vec<StrategyResult>> {
    let columns_match = header.len() >= METRIC_COLUMNS.len()
        && header.iter().zip(METRIC_COLUMNS.iter()).all(|(a, b)| a == b);
    if !columns_match {
        return Err(SearchError::ResultIo(format!(
            "header does not start with the fixed metric columns: {header:?}"
        )));
    }
    let params = &header[METRIC_COLUMNS.len()..];

    rows.iter()
        .map(|row| {
            if row.len() != header.len() {
                return Err(SearchError::ResultIo(format!(
                    "row has {} fields, header has {}",
                    row.len(),
                    header.len()
                )));
            }
            let parse_f64 = |s: &str| -> Result<f64> {
                s.parse().map_err(|_| SearchError::ResultIo(format!("invalid number: {s}")))
            };

            let mut m = Metrics::default();
            m.ntrades = parse_f64(&row[0])? as i64;
            m.avg_ticks = parse_f64(&row[1])?;
            m.win_perc = parse_f64(&row[2])?;
            m.profit_factor = parse_f64(&row[3])?;
            m.netpl_maxdd = parse_f64(&row[4])?;
            m.expectancy = parse_f64(&row[5])?;
            m.zscore = parse_f64(&row[6])?;

            let mut parameters = Parameters::new();
            for (i, name) in params.iter().enumerate() {
                let value: i64 = row[METRIC_COLUMNS.len() + i]
                    .parse()
                    .map_err(|_| SearchError::ResultIo(format!("invalid parameter value: {}", row[METRIC_COLUMNS.len() + i])))?;
                parameters.insert(name.clone(), value);
            }

            Ok(StrategyResult::new(m, parameters, ndays))
        })
        .collect()
}

/// Render `metadata` as leading `# key: value` lines, then the header row
/// and one comma-separated row per entry.
pub fn write_strategies(header: &[String], rows: &[Vec<String>], metadata: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in metadata {
        out.push_str(&format!("# {key}: {value}\n"));
    }
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Parse a file written by [`write_strategies`] back into its `(header,
/// rows)` table, skipping leading `#` metadata lines. The identity law
/// (spec §8) holds for the `(header, rows)` pair, not for `metadata`, which
/// is not round-tripped structurally.
pub fn read_strategies(text: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).skip_while(|l| l.trim_start().starts_with('#'));

    let header_line = lines
        .next()
        .ok_or_else(|| SearchError::ResultIo("result file has no header row".to_string()))?;
    let header: Vec<String> = header_line.split(',').map(|s| s.to_string()).collect();

    let rows: Vec<Vec<String>> = lines.map(|line| line.split(',').map(|s| s.to_string()).collect()).collect();

    Ok((header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use btfast_core::performance::Metrics;

    fn sample_results() -> Vec<StrategyResult> {
        let mut m1 = Metrics::default();
        m1.ntrades = 100;
        m1.avg_ticks = 12.5;
        m1.win_perc = 55.0;
        m1.profit_factor = 1.4;
        m1.netpl_maxdd = 5.0;
        m1.expectancy = 0.15;
        m1.zscore = 2.2;
        let mut p1 = Parameters::new();
        p1.insert("fractN".to_string(), 3);
        p1.insert("stop_ticks".to_string(), 200);

        let mut m2 = Metrics::default();
        m2.ntrades = 200;
        m2.avg_ticks = 20.0;
        let mut p2 = Parameters::new();
        p2.insert("fractN".to_string(), 4);
        p2.insert("stop_ticks".to_string(), 150);

        vec![
            StrategyResult::new(m1, p1, 252),
            StrategyResult::new(m2, p2, 252),
        ]
    }

    #[test]
    fn write_then_read_is_identity_on_header_and_rows() {
        let results = sample_results();
        let (header, rows) = to_table(&results);
        let text = write_strategies(&header, &rows, &[("generated_by".to_string(), "test".to_string())]);
        let (parsed_header, parsed_rows) = read_strategies(&text).unwrap();
        assert_eq!(parsed_header, header);
        assert_eq!(parsed_rows, rows);
    }

    #[test]
    fn from_table_recovers_metrics_and_parameters() {
        let results = sample_results();
        let (header, rows) = to_table(&results);
        let recovered = from_table(&header, &rows, 252).unwrap();
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].metrics.ntrades, 100);
        assert_eq!(recovered[0].parameters.get("fractN"), Some(&3));
        assert_eq!(recovered[1].metrics.avg_ticks, 20.0);
    }

    #[test]
    fn from_table_rejects_mismatched_header() {
        let bad_header = vec!["Wrong".to_string()];
        assert!(from_table(&bad_header, &[], 252).is_err());
    }
}
