use itertools::Itertools;
use recon_types::{de_lenient_list, de_num, de_string, normalize_sku, safe_div, DayKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::LeadTimeSettings;
use crate::velocity::VelocityEstimate;

/// Stockout and reorder dates are not projected past this many days.
const HORIZON_DAYS: f64 = 3650.0;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockRow {
    #[serde(default, deserialize_with = "de_string")]
    pub sku: String,
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_num")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub inbound: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockSources {
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub amazon: Vec<StockRow>,
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub threepl: Vec<StockRow>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StockStatus {
    OutOfStock,
    NoSales,
    Critical,
    Reorder,
    Overstock,
    Healthy,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    pub amazon_quantity: f64,
    pub threepl_quantity: f64,
    pub inbound: f64,
    pub total_quantity: f64,
    pub velocity: VelocityEstimate,
    pub daily_velocity: f64,
    pub days_of_supply: Option<f64>,
    pub lead_time_days: u32,
    pub reorder_point: f64,
    pub stockout_date: Option<DayKey>,
    pub reorder_by: Option<DayKey>,
    pub status: StockStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub as_of: DayKey,
    pub items: Vec<InventoryItem>,
    pub total_units: f64,
    pub critical_count: usize,
    pub reorder_count: usize,
}

#[derive(Default)]
struct StockLevels {
    name: String,
    amazon: f64,
    threepl: f64,
    inbound: f64,
}

fn collect_rows(
    levels: &mut BTreeMap<String, StockLevels>,
    rows: &[StockRow],
    pick: impl Fn(&mut StockLevels) -> &mut f64,
) {
    for row in rows {
        let key = normalize_sku(&row.sku);
        if key.is_empty() {
            log::debug!("Stock row without SKU left out: {row:?}");
            continue;
        }
        let entry = levels.entry(key).or_default();
        if entry.name.is_empty() {
            entry.name = row.name.clone();
        }
        *pick(entry) += row.quantity;
        entry.inbound += row.inbound;
    }
}

fn date_after(as_of: DayKey, days: f64) -> Option<DayKey> {
    if !(0.0..=HORIZON_DAYS).contains(&days) {
        return None;
    }
    as_of.add_days(days.floor() as i64)
}

fn classify(
    total_quantity: f64,
    days_of_supply: Option<f64>,
    lead_time: f64,
    buffer: f64,
    overstock: f64,
) -> StockStatus {
    match days_of_supply {
        None => StockStatus::NoSales,
        Some(_) if total_quantity <= 0.0 => StockStatus::OutOfStock,
        Some(dos) if dos < lead_time => StockStatus::Critical,
        Some(dos) if dos < lead_time + buffer => StockStatus::Reorder,
        Some(dos) if dos > overstock => StockStatus::Overstock,
        Some(_) => StockStatus::Healthy,
    }
}

pub fn build_snapshot(
    sources: &StockSources,
    velocity: &BTreeMap<String, VelocityEstimate>,
    settings: &LeadTimeSettings,
    as_of: DayKey,
) -> InventorySnapshot {
    let mut levels = BTreeMap::new();
    collect_rows(&mut levels, &sources.amazon, |l| &mut l.amazon);
    collect_rows(&mut levels, &sources.threepl, |l| &mut l.threepl);

    let buffer = settings.reorder_buffer_days as f64;
    let items = levels
        .into_iter()
        .map(|(sku, l)| {
            let estimate = velocity.get(&sku).cloned().unwrap_or_default();
            let daily_velocity = estimate.corrected.max(0.0) / 7.0;
            let total_quantity = l.amazon + l.threepl + l.inbound;
            let days_of_supply =
                (daily_velocity > 0.0).then(|| safe_div(total_quantity, daily_velocity));
            let lead_time_days = settings.lead_time_for(&sku);
            let lead_time = lead_time_days as f64;
            let status = classify(
                total_quantity,
                days_of_supply,
                lead_time,
                buffer,
                settings.overstock_days as f64,
            );
            InventoryItem {
                name: l.name,
                amazon_quantity: l.amazon,
                threepl_quantity: l.threepl,
                inbound: l.inbound,
                total_quantity,
                velocity: estimate,
                daily_velocity,
                days_of_supply,
                lead_time_days,
                reorder_point: daily_velocity * (lead_time + buffer),
                stockout_date: days_of_supply.and_then(|d| date_after(as_of, d)),
                reorder_by: days_of_supply
                    .and_then(|d| date_after(as_of, (d - lead_time - buffer).max(0.0))),
                status,
                sku,
            }
        })
        .sorted_by(|a, b| match (a.days_of_supply, b.days_of_supply) {
            (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.sku.cmp(&b.sku)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.sku.cmp(&b.sku),
        })
        .collect::<Vec<_>>();

    let count = |status: StockStatus| items.iter().filter(|i| i.status == status).count();
    let critical_count = count(StockStatus::Critical) + count(StockStatus::OutOfStock);
    let reorder_count = count(StockStatus::Reorder);
    if critical_count > 0 {
        log::warn!("{critical_count} SKUs are critical or out of stock");
    }
    InventorySnapshot {
        as_of,
        total_units: items.iter().map(|i| i.total_quantity).sum(),
        critical_count,
        reorder_count,
        items,
    }
}
