use dayx_core::{weekday_for, InMemoryMedium, RecordStore};

pub fn store() -> RecordStore<InMemoryMedium> {
    RecordStore::new(InMemoryMedium::new())
}

/// Add one word to `date`, deriving the weekday from the date.
pub fn add(store: &RecordStore<InMemoryMedium>, date: &str, word: &str) {
    let weekday = weekday_for(date).unwrap_or_else(|| "Mon".to_string());
    store.add_word(date, &weekday, word).unwrap();
}

/// A store with one word on each of `dates`, inserted in the order given.
pub fn store_with_days(dates: &[&str]) -> RecordStore<InMemoryMedium> {
    let store = store();
    for (i, date) in dates.iter().enumerate() {
        add(&store, date, &format!("word-{}", i));
    }
    store
}

pub fn numbered_dates(store: &RecordStore<InMemoryMedium>) -> Vec<(usize, String)> {
    store
        .view()
        .unwrap()
        .into_iter()
        .map(|d| (d.day_number, d.record.date))
        .collect()
}
