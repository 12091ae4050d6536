//! Parameter ranges and the Cartesian-product grid built from them.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// One named parameter and its list of candidate integer values.
pub type ParamRange = (String, Vec<i64>);

/// The full set of parameter ranges for a strategy, in declaration order.
/// Order matters: [`cartesian_product`] varies the *last* entry fastest.
pub type ParamRanges = Vec<ParamRange>;

/// A single concrete assignment of parameter name -> value.
pub type Parameters = BTreeMap<String, i64>;

/// Enumerate every combination of the given parameter ranges.
///
/// Row-major order with the last range varying fastest, matching
/// `utils_params::cartesian_product` in the original engine (confirmed by
/// its reverse-indexed `div_t` walk: the loop consumes ranges from the last
/// index backward, so incrementing the running index `n` by one always
/// advances the last parameter first).
pub fn cartesian_product(ranges: &ParamRanges) -> Vec<Parameters> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let total: usize = ranges.iter().map(|(_, vals)| vals.len()).product();
    let mut result = Vec::with_capacity(total);

    for n in 0..total {
        let mut quot = n;
        let mut row: Vec<(String, i64)> = Vec::with_capacity(ranges.len());

        for (name, values) in ranges.iter().rev() {
            let len = values.len();
            let rem = quot % len;
            quot /= len;
            row.push((name.clone(), values[rem]));
        }
        row.reverse();

        result.push(row.into_iter().collect());
    }

    result
}

/// Parse the parameter document of spec §6: one `Input name value` or
/// `OptRange name start stop step` line per parameter, all values integers
/// (blank lines ignored). Grounded on `original_source/include/utils_params.h`
/// + `utils_fileio.cpp`'s `read_param_file`, which builds exactly this
/// fixed-value-vs-start/stop/step distinction from the original's XML
/// document; a full XML parser is out of scope; this is the line-oriented
/// textual form spec.md itself describes the document as.
pub fn parse_param_doc(text: &str) -> Result<ParamRanges> {
    let mut ranges = ParamRanges::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["Input", name, value] => {
                let value = parse_i64(value)?;
                ranges.push((name.to_string(), vec![value]));
            }
            ["OptRange", name, start, stop, step] => {
                let start = parse_i64(start)?;
                let stop = parse_i64(stop)?;
                let step = parse_i64(step)?;
                if step <= 0 {
                    return Err(Error::Configuration(format!(
                        "OptRange {name}: step must be positive, got {step}"
                    )));
                }
                let mut values = Vec::new();
                let mut v = start;
                while v <= stop {
                    values.push(v);
                    v += step;
                }
                ranges.push((name.to_string(), values));
            }
            _ => return Err(Error::Configuration(format!("malformed parameter document line: {line}"))),
        }
    }

    Ok(ranges)
}

fn parse_i64(s: &str) -> Result<i64> {
    s.parse().map_err(|_| Error::Configuration(format!("invalid integer: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ranges_yield_no_rows() {
        assert!(cartesian_product(&vec![]).is_empty());
    }

    #[test]
    fn single_range_enumerates_each_value() {
        let ranges = vec![("a".to_string(), vec![1, 2, 3])];
        let rows = cartesian_product(&ranges);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["a"], 1);
        assert_eq!(rows[2]["a"], 3);
    }

    #[test]
    fn last_parameter_varies_fastest() {
        let ranges = vec![
            ("a".to_string(), vec![1, 2]),
            ("b".to_string(), vec![10, 20, 30]),
        ];
        let rows = cartesian_product(&ranges);
        assert_eq!(rows.len(), 6);
        let bs: Vec<i64> = rows.iter().map(|r| r["b"]).collect();
        assert_eq!(bs, vec![10, 20, 30, 10, 20, 30]);
        let as_: Vec<i64> = rows.iter().map(|r| r["a"]).collect();
        assert_eq!(as_, vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn total_size_is_product_of_range_lengths() {
        let ranges = vec![
            ("a".to_string(), vec![1, 2]),
            ("b".to_string(), vec![1, 2, 3]),
            ("c".to_string(), vec![1, 2, 3, 4]),
        ];
        assert_eq!(cartesian_product(&ranges).len(), 2 * 3 * 4);
    }

    #[test]
    fn parses_fixed_and_optimized_parameters() {
        let doc = "Input fractN 3\nOptRange stop_ticks 100 300 100\n";
        let ranges = parse_param_doc(doc).unwrap();
        assert_eq!(ranges, vec![
            ("fractN".to_string(), vec![3]),
            ("stop_ticks".to_string(), vec![100, 200, 300]),
        ]);
    }

    #[test]
    fn rejects_non_divisible_step_ranges_by_stopping_at_the_last_value_at_or_below_stop() {
        let ranges = parse_param_doc("OptRange a 1 10 4\n").unwrap();
        assert_eq!(ranges[0].1, vec![1, 5, 9]);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_param_doc("Bogus a b\n").is_err());
    }

    #[test]
    fn rejects_zero_step() {
        assert!(parse_param_doc("OptRange a 1 10 0\n").is_err());
    }
}
