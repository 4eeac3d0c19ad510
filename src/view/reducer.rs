use std::cmp::Ordering;
use std::fmt::Debug;

/// Rows with a stable identity, used to replace or remove them.
pub trait Keyed {
    type Key: PartialEq + Clone + Debug;

    fn key(&self) -> Self::Key;
}

pub trait ListFilter<T>: Clone + Default {
    fn matches(&self, item: &T) -> bool;

    /// Ordering of the visible rows. Equal rows keep their source order.
    fn compare(&self, _a: &T, _b: &T) -> Ordering {
        Ordering::Equal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListAction<T: Keyed, F> {
    /// Replace every row with a fresh server result.
    Loaded(Vec<T>),
    /// Insert a row, or replace the row with the same key in place.
    Upserted(T),
    Removed(T::Key),
    FiltersChanged(F),
    FiltersReset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T, F> {
    pub source: Vec<T>,
    pub filters: F,
}

impl<T, F: Default> Default for ListState<T, F> {
    fn default() -> Self {
        Self {
            source: Vec::new(),
            filters: F::default(),
        }
    }
}

impl<T: Keyed, F: ListFilter<T>> ListState<T, F> {
    pub fn new(source: Vec<T>) -> Self {
        Self {
            source,
            filters: F::default(),
        }
    }

    pub fn reduce(self, action: ListAction<T, F>) -> Self {
        reduce(self, action)
    }

    /// Rows passing the filters, sorted stably.
    pub fn view(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self
            .source
            .iter()
            .filter(|item| self.filters.matches(item))
            .collect();
        rows.sort_by(|a, b| self.filters.compare(a, b));
        rows
    }

    pub fn visible_len(&self) -> usize {
        self.source
            .iter()
            .filter(|item| self.filters.matches(item))
            .count()
    }

    pub fn find(&self, key: &T::Key) -> Option<&T> {
        self.source.iter().find(|item| &item.key() == key)
    }
}

pub fn reduce<T: Keyed, F: ListFilter<T>>(
    mut state: ListState<T, F>,
    action: ListAction<T, F>,
) -> ListState<T, F> {
    match action {
        ListAction::Loaded(rows) => state.source = rows,
        ListAction::Upserted(row) => {
            let key = row.key();
            match state.source.iter_mut().find(|item| item.key() == key) {
                Some(existing) => *existing = row,
                None => state.source.push(row),
            }
        }
        ListAction::Removed(key) => state.source.retain(|item| item.key() != key),
        ListAction::FiltersChanged(filters) => state.filters = filters,
        ListAction::FiltersReset => state.filters = F::default(),
    }
    state
}
