use crate::record::{DayRecord, NumberedDay};

/// Derives day numbers from a full set of records.
///
/// Day numbers are the 1-based rank of each date in ascending order. They are
/// a function of the whole date set, so any insert or removal can shift every
/// later number and the full sequence has to be rebuilt.
pub struct DerivedSequencer;

impl DerivedSequencer {
    /// Sort by date and number the result `1..=n`.
    ///
    /// ISO `YYYY-MM-DD` dates sort correctly as plain strings.
    pub fn number(mut records: Vec<DayRecord>) -> Vec<NumberedDay> {
        records.sort_by(|a, b| a.date.cmp(&b.date));
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| NumberedDay {
                day_number: i + 1,
                record,
            })
            .collect()
    }
}
