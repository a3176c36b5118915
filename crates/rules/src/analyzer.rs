//! Turns raw price samples into a ranked snapshot.
//!
//! For each group the latest sample (maximum timestamp, first occurrence on
//! ties) supplies the current prices. Volatility is the root-mean-square
//! deviation of every sample's spot price from a baseline of one tenth of
//! that sample's list price.

use tracing::{debug, warn};

use spot_core::{ComputeError, InstancePrice, PriceGroup, PriceSample};

/// Baseline fraction of the list price used by [`volatility`].
const VOLATILITY_BASELINE: f64 = 0.1;

/// Price every group and rank the result by price per core, cheapest first.
///
/// Groups without samples are omitted. Groups that fail validation are
/// skipped with a warning; the rest of the batch is unaffected. The sort is
/// stable, so equal prices keep source order.
pub fn analyze(groups: &[PriceGroup]) -> Vec<InstancePrice> {
    let mut prices: Vec<InstancePrice> = groups
        .iter()
        .filter_map(|group| match analyze_group(group) {
            Ok(Some(price)) => Some(price),
            Ok(None) => {
                debug!(key = %group.key(), "no samples; omitted");
                None
            }
            Err(e) => {
                warn!(error = %e, "skipping malformed price group");
                None
            }
        })
        .collect();

    prices.sort_by(|a, b| a.price_per_core.total_cmp(&b.price_per_core));
    prices
}

/// Price a single group. `Ok(None)` when it has no samples.
pub fn analyze_group(group: &PriceGroup) -> Result<Option<InstancePrice>, ComputeError> {
    let Some(latest) = latest_sample(&group.samples) else {
        return Ok(None);
    };

    if group.core_count == 0 {
        return Err(ComputeError::ZeroCoreCount { key: group.key() });
    }
    for sample in &group.samples {
        check_price(group, "spot_price", sample.spot_price)?;
        check_price(group, "origin_price", sample.origin_price)?;
    }
    if latest.origin_price == 0.0 {
        return Err(ComputeError::ZeroOriginPrice { key: group.key() });
    }

    Ok(Some(InstancePrice {
        instance_type_id: group.instance_type_id.clone(),
        zone_id: group.zone_id.clone(),
        core_count: group.core_count,
        memory_gib: group.memory_gib,
        price_per_core: latest.spot_price / f64::from(group.core_count),
        spot_price: latest.spot_price,
        origin_price: latest.origin_price,
        discount: 10.0 * latest.spot_price / latest.origin_price,
        volatility: volatility(&group.samples),
    }))
}

fn check_price(group: &PriceGroup, field: &'static str, value: f64) -> Result<(), ComputeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ComputeError::InvalidPrice {
            key: group.key(),
            field,
            value,
        })
    }
}

/// Sample with the greatest timestamp; a later sample only wins when
/// strictly newer.
fn latest_sample(samples: &[PriceSample]) -> Option<&PriceSample> {
    let mut iter = samples.iter();
    let mut latest = iter.next()?;
    for sample in iter {
        if sample.timestamp > latest.timestamp {
            latest = sample;
        }
    }
    Some(latest)
}

/// `sqrt(mean((spot - 0.1 * origin)^2))` over all samples.
fn volatility(samples: &[PriceSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|s| {
            let deviation = s.spot_price - VOLATILITY_BASELINE * s.origin_price;
            deviation * deviation
        })
        .sum();
    (sum / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(minute: u32, spot: f64, origin: f64) -> PriceSample {
        PriceSample {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
            spot_price: spot,
            origin_price: origin,
        }
    }

    fn group(type_id: &str, cores: u32, samples: Vec<PriceSample>) -> PriceGroup {
        PriceGroup {
            instance_type_id: type_id.to_string(),
            zone_id: "cn-hangzhou-b".to_string(),
            core_count: cores,
            memory_gib: 8.0,
            samples,
        }
    }

    #[test]
    fn price_per_core_from_latest_sample() {
        let g = group("ecs.c6.xlarge", 4, vec![sample(0, 0.8, 2.0), sample(5, 0.4, 2.0)]);
        let price = analyze_group(&g).unwrap().unwrap();
        assert_eq!(price.spot_price, 0.4);
        assert_eq!(price.price_per_core, 0.1);
        assert_eq!(price.discount, 2.0);
    }

    #[test]
    fn timestamp_tie_keeps_first_occurrence() {
        let g = group("ecs.c6.xlarge", 2, vec![sample(5, 0.3, 3.0), sample(5, 0.9, 3.0), sample(1, 0.1, 3.0)]);
        let price = analyze_group(&g).unwrap().unwrap();
        assert_eq!(price.spot_price, 0.3);

        // Same input, same answer.
        assert_eq!(analyze_group(&g).unwrap().unwrap(), price);
    }

    #[test]
    fn volatility_matches_formula() {
        // deviations: 0.5 - 0.2 = 0.3, 0.1 - 0.2 = -0.1
        let g = group("ecs.c6.xlarge", 1, vec![sample(0, 0.5, 2.0), sample(1, 0.1, 2.0)]);
        let price = analyze_group(&g).unwrap().unwrap();
        let expected = ((0.09 + 0.01) / 2.0f64).sqrt();
        assert!((price.volatility - expected).abs() < 1e-12);
        assert!(price.volatility >= 0.0);
    }

    #[test]
    fn zero_cores_is_excluded_not_fatal() {
        let groups = vec![
            group("ecs.broken", 0, vec![sample(0, 0.5, 2.0)]),
            group("ecs.c6.large", 2, vec![sample(0, 0.5, 2.0)]),
        ];
        assert!(matches!(
            analyze_group(&groups[0]),
            Err(ComputeError::ZeroCoreCount { .. })
        ));
        let prices = analyze(&groups);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].instance_type_id, "ecs.c6.large");
    }

    #[test]
    fn malformed_prices_are_skipped() {
        let groups = vec![
            group("ecs.neg", 2, vec![sample(0, -0.5, 2.0)]),
            group("ecs.nan", 2, vec![sample(0, f64::NAN, 2.0)]),
            group("ecs.zero-origin", 2, vec![sample(0, 0.5, 0.0)]),
            group("ecs.ok", 2, vec![sample(0, 0.5, 2.0)]),
        ];
        assert!(matches!(
            analyze_group(&groups[0]),
            Err(ComputeError::InvalidPrice { field: "spot_price", .. })
        ));
        assert!(matches!(
            analyze_group(&groups[2]),
            Err(ComputeError::ZeroOriginPrice { .. })
        ));
        let prices = analyze(&groups);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].instance_type_id, "ecs.ok");
    }

    #[test]
    fn empty_groups_are_omitted() {
        let g = group("ecs.c6.large", 2, vec![]);
        assert_eq!(analyze_group(&g).unwrap(), None);
        assert!(analyze(&[g]).is_empty());
    }

    #[test]
    fn sorted_ascending_and_stable() {
        let groups = vec![
            group("ecs.c", 1, vec![sample(0, 0.3, 2.0)]),
            group("ecs.a", 1, vec![sample(0, 0.1, 2.0)]),
            group("ecs.b1", 1, vec![sample(0, 0.2, 2.0)]),
            group("ecs.b2", 2, vec![sample(0, 0.4, 2.0)]),
        ];
        let order: Vec<_> = analyze(&groups)
            .into_iter()
            .map(|p| p.instance_type_id)
            .collect();
        assert_eq!(order, vec!["ecs.a", "ecs.b1", "ecs.b2", "ecs.c"]);
    }
}
