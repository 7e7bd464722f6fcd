//! Reader for the plain-text QHA input file.
//!
//! ```text
//! # comment
//! 6 3 9 2                      <- volumes, q-points, modes per q-point, formula units
//! P= 0.00 V= 320.50 E= -10.0   <- one header per volume
//! 0.0 0.0 0.0                  <- q-point coordinates
//! 120.5                        <- one frequency (cm⁻¹) per mode
//! ...
//! weight                       <- starts the weight block
//! 0.0 0.0 0.0 1.0              <- qx qy qz w, only w is used
//! ```

use crate::error::{QhaError, Result};
use crate::frequencies::FrequencyArray;
use crate::multi_config::Configuration;
use std::fs;
use std::path::Path;

/// Everything an input file describes.
#[derive(Debug, Clone)]
pub struct InputData {
    pub formula_unit_number: usize,
    pub volumes: Vec<f64>,
    pub static_energies: Vec<f64>,
    pub frequencies: FrequencyArray,
    pub q_weights: Vec<f64>,
}

impl InputData {
    pub fn into_configuration(self, degeneracy: f64) -> Configuration {
        Configuration {
            volumes: self.volumes,
            static_energies: self.static_energies,
            frequencies: self.frequencies,
            q_weights: self.q_weights,
            degeneracy,
        }
    }
}

pub fn read_input(path: &Path) -> Result<InputData> {
    let text = fs::read_to_string(path)?;
    parse_input(&text)
}

fn parse_error(line: usize, message: impl Into<String>) -> QhaError {
    QhaError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_number(token: &str, line: usize) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| parse_error(line, format!("'{token}' is not a number")))
}

fn metadata(line: &str) -> Option<[usize; 4]> {
    let numbers: Vec<usize> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match numbers.as_slice() {
        [nv, nq, np, nm, ..] => Some([*nv, *nq, *np, *nm]),
        _ => None,
    }
}

/// Value following `key =` on a header such as `P= 0.0 V= 320.5 E= -10.0`.
fn header_value(line: &str, key: &str, number: usize) -> Result<f64> {
    let spaced = line.replace('=', " = ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    tokens
        .windows(3)
        .find(|w| w[0].eq_ignore_ascii_case(key) && w[1] == "=")
        .ok_or_else(|| parse_error(number, format!("missing '{key}=' in volume header")))
        .and_then(|w| parse_number(w[2], number))
}

pub fn parse_input(text: &str) -> Result<InputData> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let [nv, nq, np, nm] = lines
        .by_ref()
        .find_map(|(_, l)| metadata(l))
        .ok_or_else(|| parse_error(0, "metadata line 'nv nq np nm' not found"))?;

    let mut volumes = Vec::with_capacity(nv);
    let mut static_energies = Vec::with_capacity(nv);
    let mut data = vec![0.0; nv * nq * np];
    let mut q_points_seen = vec![0usize; nv];

    while let Some((number, line)) = lines.next() {
        if line.to_ascii_lowercase().contains("weight") {
            break;
        }
        if line.contains('=') {
            if volumes.len() == nv {
                return Err(parse_error(
                    number,
                    format!("more than the {nv} declared volumes"),
                ));
            }
            volumes.push(header_value(line, "V", number)?);
            static_energies.push(header_value(line, "E", number)?);
            continue;
        }
        if line.split_whitespace().count() != 3 {
            return Err(parse_error(number, format!("unexpected line '{line}'")));
        }

        let v = volumes
            .len()
            .checked_sub(1)
            .ok_or_else(|| parse_error(number, "q-point found before any volume header"))?;
        let q = q_points_seen[v];
        if q == nq {
            return Err(parse_error(
                number,
                format!("more than the {nq} declared q-points"),
            ));
        }
        for m in 0..np {
            let (number, line) = lines
                .next()
                .ok_or_else(|| parse_error(number, "file ended inside a frequency block"))?;
            let token = line.split_whitespace().next().unwrap_or_default();
            data[(v * nq + q) * np + m] = parse_number(token, number)?;
        }
        q_points_seen[v] += 1;
    }

    let mut q_weights = Vec::with_capacity(nq);
    for (number, line) in lines {
        let token = line.split_whitespace().last().unwrap_or_default();
        q_weights.push(parse_number(token, number)?);
    }

    if volumes.len() != nv {
        return Err(parse_error(
            0,
            format!(
                "found {} volumes but the header declares {nv}",
                volumes.len()
            ),
        ));
    }
    if let Some(v) = q_points_seen.iter().position(|&q| q != nq) {
        return Err(parse_error(
            0,
            format!("volume {v} has {} q-points, expected {nq}", q_points_seen[v]),
        ));
    }
    if q_weights.len() != nq {
        return Err(parse_error(
            0,
            format!("found {} q-point weights, expected {nq}", q_weights.len()),
        ));
    }

    Ok(InputData {
        formula_unit_number: nm,
        volumes,
        static_energies,
        frequencies: FrequencyArray::new(nv, nq, np, data)?,
        q_weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# two volumes, two q-points, two modes, one formula unit
2 2 2 1
P= 0.00 V= 320.50 E= -10.00
0.0 0.0 0.0
0.0
110.0
0.5 0.0 0.0
150.0
210.0

P= 5.00 V=  311.50 E= -9.80
0.0 0.0 0.0
0.0
120.0
0.5 0.0 0.0
# a comment inside the block
160.0
220.0
weight
0.0 0.0 0.0 1.0
0.5 0.0 0.0 3.0
";

    #[test]
    fn test_parse_sample() {
        let data = parse_input(SAMPLE).unwrap();
        assert_eq!(data.formula_unit_number, 1);
        assert_eq!(data.volumes, vec![320.5, 311.5]);
        assert_eq!(data.static_energies, vec![-10.0, -9.8]);
        assert_eq!(data.q_weights, vec![1.0, 3.0]);
        assert_eq!(data.frequencies.shape(), (2, 2, 2));
        assert_eq!(data.frequencies.get(1, 1, 0), 160.0);
        assert_eq!(data.frequencies.modes_at(0, 0), &[0.0, 110.0]);
    }

    #[test]
    fn test_missing_metadata() {
        assert!(matches!(
            parse_input("# nothing here\n"),
            Err(QhaError::Parse { .. })
        ));
    }

    #[test]
    fn test_volume_count_mismatch() {
        let text = SAMPLE.replacen("2 2 2 1", "3 2 2 1", 1);
        assert!(matches!(parse_input(&text), Err(QhaError::Parse { .. })));
    }

    #[test]
    fn test_malformed_header() {
        let text = SAMPLE.replacen("E= -9.80", "E= abc", 1);
        match parse_input(&text) {
            Err(QhaError::Parse { line, .. }) => assert_eq!(line, 11),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
