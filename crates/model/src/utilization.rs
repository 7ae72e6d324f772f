use std::collections::BTreeMap;

use crate::fiscal::FiscalQuarter;

/// Canonical storage is a 0-1 fraction; historical records hold 0-100
/// percentages. Normalized once here, at the read boundary: `0.85` and
/// `85` both come out as `85.0`.
pub fn normalize_percent(raw: f64) -> f64 {
    if raw <= 1.0 {
        raw * 100.0
    } else {
        raw
    }
}

/// Billability percentage of one ledger entry. Old records without a
/// `utilization_value` stored the percentage in the points field.
pub fn entry_percent(utilization_value: Option<f64>, points: i64) -> Option<f64> {
    let raw = match utilization_value {
        Some(value) if value > 0.0 => value,
        _ => {
            if points > 0 && points <= 100 {
                points as f64 / 100.0
            } else {
                return None;
            }
        }
    };
    Some(normalize_percent(raw))
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year}-{month:02}")
}

/// Average billability across a quarter. Every month of the quarter
/// participates; months without a record count as zero.
pub fn quarter_average(monthly: &BTreeMap<String, f64>, quarter: &FiscalQuarter) -> f64 {
    let months = quarter.months();
    let total: f64 = months
        .iter()
        .map(|(year, month)| monthly.get(&month_key(*year, *month)).copied().unwrap_or(0.0))
        .sum();
    round2(total / months.len() as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_and_percentages_normalize_alike() {
        assert_eq!(normalize_percent(0.85), 85.0);
        assert_eq!(normalize_percent(85.0), 85.0);
        assert_eq!(normalize_percent(1.0), 100.0);
    }

    #[test]
    fn old_records_fall_back_to_the_points_field() {
        assert_eq!(entry_percent(Some(0.9), 0), Some(90.0));
        assert_eq!(entry_percent(None, 85), Some(85.0));
        assert_eq!(entry_percent(None, 0), None);
        assert_eq!(entry_percent(None, 250), None);
    }

    #[test]
    fn missing_months_drag_the_quarter_average_down() {
        let quarter = FiscalQuarter::new(1, 2025).unwrap();
        let monthly: BTreeMap<String, f64> = [
            (month_key(2025, 4), 90.0),
            (month_key(2025, 5), 60.0),
        ]
        .into_iter()
        .collect();
        // June is missing and counts as 0.
        assert_eq!(quarter_average(&monthly, &quarter), 50.0);
    }
}
