//! Human-readable document numbers: `<PREFIX>-<YYYYMMDD>-<NNNN>`.
//!
//! The sequence comes from a [`SequenceStore`](crate::store::SequenceStore)
//! counter per prefix and day. Uniqueness is still enforced by the insert that
//! uses the number, so a clash (e.g. a counter reset) is retried with the next
//! value.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Reception,
    Order,
    Route,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Reception => "REC",
            DocumentKind::Order => "ORD",
            DocumentKind::Route => "RTE",
        }
    }

    pub fn format(&self, date: NaiveDate, sequence: u32) -> String {
        format!("{}-{}-{:04}", self.prefix(), date.format("%Y%m%d"), sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_padded_daily_numbers() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(DocumentKind::Reception.format(date, 7), "REC-20260105-0007");
        assert_eq!(DocumentKind::Order.format(date, 1234), "ORD-20260105-1234");
        assert_eq!(DocumentKind::Route.format(date, 12345), "RTE-20260105-12345");
    }
}
