//! Calendar month windows for report queries.
//!
//! All report windows are whole calendar months derived from a
//! caller-supplied `today`, so the functions here stay deterministic and
//! testable.

use time::{Date, Month};

/// A calendar month: its first day, its last day and a display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
    /// The first day of the month.
    pub start: Date,
    /// The last day of the month.
    pub end: Date,
    /// The month's full English name, e.g. "January".
    pub label: String,
}

/// The first and last day of the month containing `today`.
pub fn current_month_range(today: Date) -> (Date, Date) {
    let start = today.replace_day(1).unwrap();
    let end = today
        .replace_day(today.month().length(today.year()))
        .unwrap();

    (start, end)
}

/// The `n` trailing calendar months up to and including the month of
/// `today`, oldest first.
pub fn last_n_months(n: u32, today: Date) -> Vec<MonthWindow> {
    (0..n)
        .rev()
        .map(|offset| month_window(today, offset))
        .collect()
}

fn month_window(today: Date, months_back: u32) -> MonthWindow {
    let mut year = today.year();
    let mut month = today.month();

    for _ in 0..months_back {
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }

    let start = Date::from_calendar_date(year, month, 1).unwrap();
    let end = Date::from_calendar_date(year, month, month.length(year)).unwrap();

    MonthWindow {
        start,
        end,
        label: month_name(month).to_owned(),
    }
}

/// The full English month name.
pub(crate) fn month_name(month: Month) -> &'static str {
    match month {
        Month::January => "January",
        Month::February => "February",
        Month::March => "March",
        Month::April => "April",
        Month::May => "May",
        Month::June => "June",
        Month::July => "July",
        Month::August => "August",
        Month::September => "September",
        Month::October => "October",
        Month::November => "November",
        Month::December => "December",
    }
}

/// The three-letter abbreviation used for chart axis labels, e.g. "Jan".
pub(crate) fn month_abbreviation(month: Month) -> &'static str {
    &month_name(month)[..3]
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{current_month_range, last_n_months, month_abbreviation};

    #[test]
    fn current_month_range_covers_whole_month() {
        let (start, end) = current_month_range(date!(2025 - 06 - 17));

        assert_eq!(start, date!(2025 - 06 - 01));
        assert_eq!(end, date!(2025 - 06 - 30));
    }

    #[test]
    fn current_month_range_handles_december() {
        let (start, end) = current_month_range(date!(2024 - 12 - 25));

        assert_eq!(start, date!(2024 - 12 - 01));
        assert_eq!(end, date!(2024 - 12 - 31));
    }

    #[test]
    fn current_month_range_handles_leap_february() {
        let (_, end) = current_month_range(date!(2024 - 02 - 10));

        assert_eq!(end, date!(2024 - 02 - 29));
    }

    #[test]
    fn last_n_months_is_oldest_first_and_crosses_year_boundary() {
        let months = last_n_months(6, date!(2025 - 02 - 15));

        let labels: Vec<&str> = months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "September",
                "October",
                "November",
                "December",
                "January",
                "February"
            ]
        );
        assert_eq!(months[0].start, date!(2024 - 09 - 01));
        assert_eq!(months[0].end, date!(2024 - 09 - 30));
        assert_eq!(months[5].start, date!(2025 - 02 - 01));
        assert_eq!(months[5].end, date!(2025 - 02 - 28));
    }

    #[test]
    fn last_n_months_includes_current_month_last() {
        let months = last_n_months(1, date!(2025 - 07 - 04));

        assert_eq!(months.len(), 1);
        assert_eq!(months[0].start, date!(2025 - 07 - 01));
        assert_eq!(months[0].label, "July");
    }

    #[test]
    fn month_abbreviations_are_three_letters() {
        assert_eq!(month_abbreviation(time::Month::January), "Jan");
        assert_eq!(month_abbreviation(time::Month::September), "Sep");
        assert_eq!(month_abbreviation(time::Month::December), "Dec");
    }
}
