use chrono::{Months, NaiveDate, Utc};

use crate::entities::sea_orm_active_enums::PaymentFrequency;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn period_months(frequency: PaymentFrequency) -> u32 {
    match frequency {
        PaymentFrequency::Monthly => 1,
        PaymentFrequency::Quarterly => 3,
        PaymentFrequency::Annually => 12,
    }
}

/// Adds one payment period, clamping to the last day of shorter months.
pub fn next_payment_date(from: NaiveDate, frequency: PaymentFrequency) -> Option<NaiveDate> {
    from.checked_add_months(Months::new(period_months(frequency)))
}

/// Whole years between `dob` and `on`, zero for future birth dates.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> u32 {
    on.years_since(dob).unwrap_or(0)
}

/// Latest birth date for someone at least `years` old on `on`.
pub fn born_on_or_before(years: u32, on: NaiveDate) -> Option<NaiveDate> {
    on.checked_sub_months(Months::new(years.checked_mul(12)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn advances_by_frequency() {
        let start = date(2024, 1, 1);
        assert_eq!(
            next_payment_date(start, PaymentFrequency::Monthly),
            Some(date(2024, 2, 1))
        );
        assert_eq!(
            next_payment_date(start, PaymentFrequency::Quarterly),
            Some(date(2024, 4, 1))
        );
        assert_eq!(
            next_payment_date(start, PaymentFrequency::Annually),
            Some(date(2025, 1, 1))
        );
    }

    #[test]
    fn month_end_clamps() {
        assert_eq!(
            next_payment_date(date(2024, 1, 31), PaymentFrequency::Monthly),
            Some(date(2024, 2, 29))
        );
    }

    #[test]
    fn computes_age() {
        assert_eq!(age_on(date(2015, 6, 15), date(2024, 6, 14)), 8);
        assert_eq!(age_on(date(2015, 6, 15), date(2024, 6, 15)), 9);
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 1, 1)), 0);
        assert_eq!(born_on_or_before(10, date(2024, 3, 1)), Some(date(2014, 3, 1)));
    }
}
