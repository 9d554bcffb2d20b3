//! Flat CSV export.
//!
//! One row per sample, targets in execution order, columns in the order of
//! [`CSV_HEADER`].

use lwcbench_core::ResultSet;
use std::borrow::Cow;
use std::fmt::Write;

/// Column header of the exported CSV.
pub const CSV_HEADER: [&str; 7] = [
    "Algorithm",
    "Timestamp",
    "CPU Usage (%)",
    "RAM Usage (MB)",
    "Voltage (V)",
    "Current (mA)",
    "Power (mW)",
];

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render every sample of every record as CSV.
pub fn generate_csv(results: &ResultSet) -> String {
    let mut output = String::new();
    let _ = write_csv(&mut output, results);
    output
}

fn write_csv(output: &mut String, results: &ResultSet) -> std::fmt::Result {
    writeln!(output, "{}", CSV_HEADER.join(","))?;
    for record in results {
        let name = escape(record.target_name());
        for sample in record.samples() {
            writeln!(
                output,
                "{},{},{},{},{},{},{}",
                name,
                sample.timestamp,
                sample.cpu_percent,
                sample.ram_mb,
                sample.voltage,
                sample.current_ma,
                sample.power_mw
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwcbench_core::{RunRecorder, Sample};

    fn record(name: &str, samples: usize) -> lwcbench_core::RunRecord {
        let mut recorder = RunRecorder::new(name);
        for i in 0..samples {
            recorder
                .push(Sample {
                    timestamp: i as f64 * 0.5,
                    cpu_percent: 12.5,
                    ram_mb: 812.0,
                    voltage: 5.1,
                    current_ma: 420.0,
                    power_mw: 2142.0,
                })
                .unwrap();
        }
        recorder.seal(samples as f64 * 0.5, Some(0))
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_sample() {
        let mut results = ResultSet::new();
        results.insert(record("Ascon", 2)).unwrap();
        results.insert(record("Xoodyak", 1)).unwrap();

        let csv = generate_csv(&results);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Algorithm,Timestamp,CPU Usage (%),RAM Usage (MB),Voltage (V),Current (mA),Power (mW)"
        );
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "Ascon,0,12.5,812,5.1,420,2142");
        assert_eq!(lines[2], "Ascon,0.5,12.5,812,5.1,420,2142");
        assert!(lines[3].starts_with("Xoodyak,0,"));
    }

    #[test]
    fn test_csv_quotes_names_with_separators() {
        let mut results = ResultSet::new();
        results.insert(record("GIFT,COFB", 1)).unwrap();
        let csv = generate_csv(&results);
        assert!(csv.lines().nth(1).unwrap().starts_with("\"GIFT,COFB\",0,"));
    }

    #[test]
    fn test_empty_records_contribute_no_rows() {
        let mut results = ResultSet::new();
        results.insert(record("Elephant", 0)).unwrap();
        assert_eq!(generate_csv(&results).lines().count(), 1);
    }
}
