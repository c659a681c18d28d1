use crate::error::{EngineError, Result};
use crate::models::{Direction, Frequency};

/// Infers the frequency of a series from one of its labels.
///
/// "2020Q1" -> Quarterly, "2020M05" -> Monthly, anything else -> Yearly.
/// Series are assumed to be homogeneous, so one sample is enough.
pub fn detect_frequency(sample_key: &str) -> Frequency {
    if sample_key.contains('Q') {
        Frequency::Quarterly
    } else if sample_key.contains('M') {
        Frequency::Monthly
    } else {
        Frequency::Yearly
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Year parts are always written as four digits ("YYYY").
fn is_year(s: &str) -> bool {
    s.len() == 4 && is_digits(s)
}

/// Encodes a period label as an ordinal that sorts chronologically.
///
/// Yearly labels map to the year itself. Quarterly and monthly labels map to
/// `year * 100 + sub_period` ("2024Q1" -> 202401, "2020M05" -> 202005).
pub fn encode(key: &str, frequency: Frequency) -> Result<i64> {
    let Some(letter) = frequency.letter() else {
        if !is_year(key) {
            return Err(EngineError::format(key, frequency));
        }
        return key.parse::<i64>().map_err(|_| EngineError::format(key, frequency));
    };

    let (year, sub) = key
        .split_once(letter)
        .ok_or_else(|| EngineError::format(key, frequency))?;
    if !is_year(year) || !is_digits(sub) {
        return Err(EngineError::format(key, frequency));
    }

    let year: i64 = year.parse().map_err(|_| EngineError::format(key, frequency))?;
    let sub: i64 = sub.parse().map_err(|_| EngineError::format(key, frequency))?;
    if sub < 1 || sub > i64::from(frequency.periods_per_year()) {
        return Err(EngineError::format(key, frequency));
    }

    year.checked_mul(100)
        .and_then(|y| y.checked_add(sub))
        .ok_or_else(|| EngineError::format(key, frequency))
}

/// Inverse of [`encode`]. Months are zero-padded to match World Bank labels.
pub fn decode(ordinal: i64, frequency: Frequency) -> String {
    let year = ordinal.div_euclid(100);
    let sub = ordinal.rem_euclid(100);
    match frequency {
        Frequency::Yearly => ordinal.to_string(),
        Frequency::Quarterly => format!("{}Q{}", year, sub),
        Frequency::Monthly => format!("{}M{:02}", year, sub),
    }
}

/// Moves an ordinal by `delta` whole periods.
///
/// Sub-periods wrap across year boundaries in both directions:
/// 2023Q4 + 1 -> 2024Q1 and 2024Q1 - 1 -> 2023Q4.
pub fn shift(ordinal: i64, delta: u32, frequency: Frequency, direction: Direction) -> i64 {
    let delta = match direction {
        Direction::Forward => i64::from(delta),
        Direction::Backward => -i64::from(delta),
    };

    let per_year = i64::from(frequency.periods_per_year());
    if per_year == 1 {
        return ordinal + delta;
    }

    // Walk on a flat period index so both wrap directions share one rule.
    let index = period_index(ordinal, frequency) + delta;
    index.div_euclid(per_year) * 100 + index.rem_euclid(per_year) + 1
}

/// Number of whole periods from `begin` to `end` (negative if `end` is earlier).
pub fn periods_between(begin: i64, end: i64, frequency: Frequency) -> i64 {
    period_index(end, frequency) - period_index(begin, frequency)
}

fn period_index(ordinal: i64, frequency: Frequency) -> i64 {
    let per_year = i64::from(frequency.periods_per_year());
    if per_year == 1 {
        return ordinal;
    }
    ordinal.div_euclid(100) * per_year + ordinal.rem_euclid(100) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_frequency() {
        assert_eq!(detect_frequency("2020"), Frequency::Yearly);
        assert_eq!(detect_frequency("2020Q3"), Frequency::Quarterly);
        assert_eq!(detect_frequency("2020M11"), Frequency::Monthly);
    }

    #[test]
    fn test_yearly_round_trip() {
        for label in ["1960", "2000", "2023"] {
            let ordinal = encode(label, Frequency::Yearly).unwrap();
            assert_eq!(decode(ordinal, Frequency::Yearly), label);
        }
    }

    #[test]
    fn test_encode_sub_yearly() {
        assert_eq!(encode("2024Q1", Frequency::Quarterly).unwrap(), 202401);
        assert_eq!(encode("2020M05", Frequency::Monthly).unwrap(), 202005);
        assert_eq!(encode("2020M12", Frequency::Monthly).unwrap(), 202012);
        assert_eq!(encode("2020M5", Frequency::Monthly).unwrap(), 202005);
    }

    #[test]
    fn test_encode_rejects_malformed_labels() {
        assert!(matches!(
            encode("2020Q5", Frequency::Quarterly),
            Err(EngineError::Format { .. })
        ));
        assert!(encode("2020Q0", Frequency::Quarterly).is_err());
        assert!(encode("2020M13", Frequency::Monthly).is_err());
        assert!(encode("2020", Frequency::Quarterly).is_err());
        assert!(encode("2020Q1", Frequency::Yearly).is_err());
        assert!(encode("", Frequency::Yearly).is_err());
        assert!(encode("Q1", Frequency::Quarterly).is_err());
        assert!(encode("20x0", Frequency::Yearly).is_err());
    }

    #[test]
    fn test_encode_requires_four_digit_years() {
        assert!(matches!(encode("1", Frequency::Yearly), Err(EngineError::Format { .. })));
        assert!(encode("4294967297", Frequency::Yearly).is_err());
        assert!(encode("020", Frequency::Yearly).is_err());
        assert!(encode("20201Q1", Frequency::Quarterly).is_err());
        assert!(encode("99M01", Frequency::Monthly).is_err());
    }

    #[test]
    fn test_quarter_full_cycle() {
        for q in 1..=4 {
            let label = format!("2019Q{}", q);
            let ordinal = encode(&label, Frequency::Quarterly).unwrap();
            let next = shift(ordinal, 4, Frequency::Quarterly, Direction::Forward);
            assert_eq!(decode(next, Frequency::Quarterly), format!("2020Q{}", q));
        }
    }

    #[test]
    fn test_shift_wraps_at_boundaries() {
        let q4 = encode("2023Q4", Frequency::Quarterly).unwrap();
        assert_eq!(
            decode(shift(q4, 1, Frequency::Quarterly, Direction::Forward), Frequency::Quarterly),
            "2024Q1"
        );

        let q1 = encode("2024Q1", Frequency::Quarterly).unwrap();
        assert_eq!(
            decode(shift(q1, 1, Frequency::Quarterly, Direction::Backward), Frequency::Quarterly),
            "2023Q4"
        );

        let jan = encode("2021M01", Frequency::Monthly).unwrap();
        assert_eq!(
            decode(shift(jan, 14, Frequency::Monthly, Direction::Backward), Frequency::Monthly),
            "2019M11"
        );
    }

    #[test]
    fn test_yearly_shift_is_plain_addition() {
        assert_eq!(shift(2020, 3, Frequency::Yearly, Direction::Forward), 2023);
        assert_eq!(shift(2020, 3, Frequency::Yearly, Direction::Backward), 2017);
    }

    #[test]
    fn test_periods_between() {
        let a = encode("2020Q3", Frequency::Quarterly).unwrap();
        let b = encode("2021Q2", Frequency::Quarterly).unwrap();
        assert_eq!(periods_between(a, b, Frequency::Quarterly), 3);
        assert_eq!(periods_between(b, a, Frequency::Quarterly), -3);
        assert_eq!(periods_between(2010, 2015, Frequency::Yearly), 5);
    }
}
