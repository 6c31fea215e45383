use recon_types::{AmazonChannel, DayKey, ShopifyChannel, WeeklyRecord};
use serde_json::Value;
use std::collections::BTreeMap;

/// Picks `derived` when `trust_derived` accepts it, `stored` otherwise.
pub fn prefer<T>(stored: T, derived: T, trust_derived: impl FnOnce(&T) -> bool) -> T {
    if trust_derived(&derived) {
        derived
    } else {
        stored
    }
}

pub fn prefer_non_empty<T>(stored: Vec<T>, derived: Vec<T>) -> Vec<T> {
    prefer(stored, derived, |d| !d.is_empty())
}

fn overlay(mut stored: BTreeMap<String, Value>, derived: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    stored.extend(derived);
    stored
}

fn merge_amazon(stored: AmazonChannel, derived: AmazonChannel) -> AmazonChannel {
    AmazonChannel {
        sku_data: prefer_non_empty(stored.sku_data, derived.sku_data),
        extra: overlay(stored.extra, derived.extra),
        ..derived
    }
}

fn merge_shopify(stored: ShopifyChannel, derived: ShopifyChannel) -> ShopifyChannel {
    ShopifyChannel {
        sku_data: prefer_non_empty(stored.sku_data, derived.sku_data),
        ads_metrics: prefer(stored.ads_metrics, derived.ads_metrics, |d| d.has_signal()),
        extra: overlay(stored.extra, derived.extra),
        ..derived
    }
}

pub fn merge_week_data(
    stored: Option<WeeklyRecord>,
    derived: Option<WeeklyRecord>,
) -> Option<WeeklyRecord> {
    let mut week = match (stored, derived) {
        (None, None) => return None,
        (Some(week), None) | (None, Some(week)) => week,
        (Some(stored), Some(derived)) => WeeklyRecord {
            days: prefer_non_empty(stored.days, derived.days),
            meta: prefer(stored.meta, derived.meta, |d| d.days_present > 0),
            amazon: merge_amazon(stored.amazon, derived.amazon),
            shopify: merge_shopify(stored.shopify, derived.shopify),
            total: Default::default(),
        },
    };
    week.refresh();
    Some(week)
}

pub fn merge_all(
    mut stored: BTreeMap<DayKey, WeeklyRecord>,
    derived: BTreeMap<DayKey, WeeklyRecord>,
) -> BTreeMap<DayKey, WeeklyRecord> {
    let mut merged = BTreeMap::new();
    for (key, derived) in derived {
        if let Some(week) = merge_week_data(stored.remove(&key), Some(derived)) {
            merged.insert(key, week);
        }
    }
    for (key, stored) in stored {
        if let Some(week) = merge_week_data(Some(stored), None) {
            merged.insert(key, week);
        }
    }
    merged
}
