//! Per-product price aggregation across marketplaces.

use flipscope_core::{MarketplaceCode, MarketplacePriceMap, PriceObservation};
use std::collections::HashMap;

/// Merge per-marketplace pricing responses into per-identifier price maps.
///
/// For each marketplace response the buy-box observation is selected when
/// present, otherwise the first observation for the identifier in response
/// order. An identifier absent from a marketplace's response yields no entry
/// for that marketplace (a valid state, not an error). Marketplaces are
/// merged independently: a failed marketplace call is represented by the
/// caller as an empty response and leaves the other marketplaces' entries
/// intact.
#[must_use]
pub fn aggregate(
    responses: &[(MarketplaceCode, Vec<PriceObservation>)],
) -> HashMap<String, MarketplacePriceMap> {
    let mut result: HashMap<String, MarketplacePriceMap> = HashMap::new();

    for (marketplace, observations) in responses {
        let mut selected: HashMap<&str, &PriceObservation> = HashMap::new();
        for observation in observations {
            let replace = match selected.get(observation.identifier.as_str()) {
                None => true,
                Some(current) => !current.buy_box && observation.buy_box,
            };
            if replace {
                selected.insert(&observation.identifier, observation);
            }
        }

        for (identifier, observation) in selected {
            result
                .entry(identifier.to_string())
                .or_default()
                .insert(marketplace.clone(), observation.clone());
        }
    }

    result
}
