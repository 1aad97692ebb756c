use crate::model::{FilteredTable, RawTable, SalesRecord, Selection};
use std::collections::BTreeSet;
use tracing::debug;

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn available_states(table: &RawTable) -> Vec<String> {
    distinct(table.records().iter().map(|r| r.state.as_str()))
}

pub fn available_stores(table: &RawTable, state: &str) -> Vec<String> {
    distinct(
        table
            .records()
            .iter()
            .filter(|r| r.state == state)
            .map(|r| r.store_id.as_str()),
    )
}

pub fn available_products(table: &RawTable, state: &str, store_id: &str) -> Vec<String> {
    distinct(
        table
            .records()
            .iter()
            .filter(|r| r.state == state && r.store_id == store_id)
            .map(|r| r.product_id.as_str()),
    )
}

fn matches(record: &SalesRecord, selection: &Selection) -> bool {
    record.state == selection.state
        && record.store_id == selection.store_id
        && record.product_id == selection.product_id
}

/// Rows matching all three dimensions exactly. An empty result is not an error.
pub fn filter<'a>(table: &'a RawTable, selection: &Selection) -> FilteredTable<'a> {
    FilteredTable::new(
        table
            .records()
            .iter()
            .filter(|r| matches(r, selection))
            .collect(),
    )
}

/// The user's hierarchical choice of state, then store, then product.
///
/// Each level is only meaningful inside its parent, so `reconcile` must run
/// after any change: a choice that is no longer offered falls back to the
/// first available option (or `None` when there is nothing to choose).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub state: Option<String>,
    pub store_id: Option<String>,
    pub product_id: Option<String>,
    pub states: Vec<String>,
    pub stores: Vec<String>,
    pub products: Vec<String>,
}

impl SelectionState {
    pub fn new(table: &RawTable) -> Self {
        let mut selection = SelectionState::default();
        selection.reconcile(table);
        selection
    }

    pub fn set_state(&mut self, table: &RawTable, state: String) {
        self.state = Some(state);
        self.reconcile(table);
    }

    pub fn set_store(&mut self, table: &RawTable, store_id: String) {
        self.store_id = Some(store_id);
        self.reconcile(table);
    }

    pub fn set_product(&mut self, table: &RawTable, product_id: String) {
        self.product_id = Some(product_id);
        self.reconcile(table);
    }

    pub fn reconcile(&mut self, table: &RawTable) {
        self.states = available_states(table);
        self.state = keep_or_first(self.state.take(), &self.states);

        self.stores = match &self.state {
            Some(state) => available_stores(table, state),
            None => Vec::new(),
        };
        self.store_id = keep_or_first(self.store_id.take(), &self.stores);

        self.products = match (&self.state, &self.store_id) {
            (Some(state), Some(store)) => available_products(table, state, store),
            _ => Vec::new(),
        };
        self.product_id = keep_or_first(self.product_id.take(), &self.products);

        debug!(
            state = ?self.state,
            store = ?self.store_id,
            product = ?self.product_id,
            "selection reconciled"
        );
    }

    pub fn selection(&self) -> Option<Selection> {
        match (&self.state, &self.store_id, &self.product_id) {
            (Some(state), Some(store), Some(product)) => {
                Some(Selection::new(state.clone(), store.clone(), product.clone()))
            }
            _ => None,
        }
    }
}

fn keep_or_first(current: Option<String>, options: &[String]) -> Option<String> {
    match current {
        Some(value) if options.contains(&value) => Some(value),
        _ => options.first().cloned(),
    }
}
