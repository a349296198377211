//! Catalog deduplication.
//!
//! The same identifier routinely appears under several storefronts; scanning
//! it once per storefront would waste quota. Deduplication collapses rows
//! sharing an identifier into one unit of work while retaining every
//! originating source group.

use flipscope_core::{ProductRow, ProductUnit};
use std::collections::HashMap;

/// Collapse raw catalog rows into deduplicated product units.
///
/// The first occurrence of an identifier establishes the unit's display
/// metadata (falling back to the identifier itself when no display name was
/// stored); every occurrence's source group is appended to the unit's group
/// list without duplicates. Output preserves first-occurrence insertion
/// order and no row is dropped; rows with a missing source group are kept
/// and logged as anomalous.
#[must_use]
pub fn dedupe(rows: &[ProductRow]) -> Vec<ProductUnit> {
    let mut units: Vec<ProductUnit> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        if row.source_group_id.is_none() {
            tracing::warn!(
                identifier = %row.identifier,
                "Catalog row has no source group"
            );
        }

        if let Some(&position) = index.get(&row.identifier) {
            if let Some(group) = &row.source_group_id {
                let groups = &mut units[position].source_groups;
                if !groups.contains(group) {
                    groups.push(group.clone());
                }
            }
        } else {
            index.insert(row.identifier.clone(), units.len());
            units.push(ProductUnit {
                identifier: row.identifier.clone(),
                display_name: row
                    .display_name
                    .clone()
                    .unwrap_or_else(|| row.identifier.clone()),
                image_ref: row.image_ref.clone(),
                sales_rank: row.sales_rank,
                source_groups: row.source_group_id.iter().cloned().collect(),
            });
        }
    }

    tracing::debug!(
        rows = rows.len(),
        units = units.len(),
        "Catalog deduplicated"
    );
    units
}
