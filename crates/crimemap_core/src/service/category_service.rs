//! Category catalog for the observation window.

use super::aggregation_service::ALL_CATEGORIES;
use crate::store::RecordRepository;
use log::debug;
use std::collections::BTreeSet;

/// Derives the distinct categories present inside the window.
#[derive(Debug, Clone)]
pub struct CategoryService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> CategoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns `All` followed by sorted, distinct in-window categories.
    ///
    /// Returns just `["All"]` when the store has no category data.
    pub fn categories(&self) -> Vec<String> {
        let mut catalog = vec![ALL_CATEGORIES.to_string()];
        if !self.repo.crime_fields().has_category() {
            debug!("event=categories module=catalog status=skip reason=category_field_missing");
            return catalog;
        }

        let window = self.repo.window();
        let distinct = self
            .repo
            .crime_records()
            .iter()
            .filter(|record| window.contains(record.occurred_at))
            .map(|record| record.category.as_str())
            .filter(|category| !category.is_empty() && *category != ALL_CATEGORIES)
            .collect::<BTreeSet<_>>();

        catalog.extend(distinct.into_iter().map(str::to_string));
        debug!(
            "event=categories module=catalog status=ok categories={}",
            catalog.len() - 1
        );
        catalog
    }
}
