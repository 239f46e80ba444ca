//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

const MS_PER_DAY: i64 = 86_400_000;

/// Current time as Unix epoch milliseconds.
///
/// A clock set before 1970 reads as `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Current UTC calendar year.
pub fn current_year() -> i32 {
    year_from_epoch_ms(now_epoch_ms())
}

/// UTC calendar year containing `epoch_ms` (proleptic Gregorian).
pub fn year_from_epoch_ms(epoch_ms: i64) -> i32 {
    // days-from-civil inverse, shifted so eras start on March 1st
    let z = epoch_ms.div_euclid(MS_PER_DAY) + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    i32::try_from(year).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{current_year, year_from_epoch_ms};

    #[test]
    fn year_boundaries_resolve_in_utc() {
        assert_eq!(year_from_epoch_ms(0), 1970);
        assert_eq!(year_from_epoch_ms(951_782_400_000), 2000); // 2000-02-29
        assert_eq!(year_from_epoch_ms(1_704_067_199_000), 2023); // 2023-12-31T23:59:59Z
        assert_eq!(year_from_epoch_ms(1_704_067_200_000), 2024); // 2024-01-01T00:00:00Z
        assert_eq!(year_from_epoch_ms(-1), 1969);
    }

    #[test]
    fn current_year_is_plausible() {
        assert!(current_year() >= 2024);
    }
}
