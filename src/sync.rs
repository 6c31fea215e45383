use recon_types::{DailyRecord, DayKey, WeeklyRecord};
use std::collections::BTreeMap;

use crate::config::ReconConfig;
use crate::inventory::{self, InventorySnapshot, StockSources};
use crate::kpi::{self, KpiDelta, PeriodSummary};
use crate::merge;
use crate::velocity::{ForecastCorrections, VelocityEstimate, VelocityEstimator};
use crate::weekly::{DerivationReport, WeekDeriver};

pub const KPI_WEEKS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct SyncInput {
    pub days: BTreeMap<DayKey, DailyRecord>,
    pub stored_weeks: BTreeMap<DayKey, WeeklyRecord>,
    pub stock: StockSources,
    pub corrections: ForecastCorrections,
}

#[derive(Debug, Clone)]
pub struct SyncOutput {
    pub weeks: BTreeMap<DayKey, WeeklyRecord>,
    pub report: DerivationReport,
    pub velocity: BTreeMap<String, VelocityEstimate>,
    pub snapshot: InventorySnapshot,
    pub kpi: Option<(PeriodSummary, Option<KpiDelta>)>,
}

/// Day the cycle is computed for: the latest daily record, or `fallback`
/// when there are none.
pub fn as_of(days: &BTreeMap<DayKey, DailyRecord>, fallback: DayKey) -> DayKey {
    days.keys().next_back().copied().unwrap_or(fallback)
}

pub fn run(input: &SyncInput, config: &ReconConfig, as_of: DayKey) -> SyncOutput {
    let derivation = WeekDeriver::new(config.reconcile_tolerance).derive(&input.days);
    let weeks = merge::merge_all(input.stored_weeks.clone(), derivation.weeks);
    log::info!(
        "{} weeks after merge ({} stored)",
        weeks.len(),
        input.stored_weeks.len()
    );

    let velocity = VelocityEstimator::new(&config.velocity, &input.corrections).estimate(
        &input.days,
        &weeks,
        Some(as_of),
    );
    let snapshot = inventory::build_snapshot(&input.stock, &velocity, &config.lead_time, as_of);

    let kpi = kpi::latest_weeks(&weeks, KPI_WEEKS).map(|(current, previous)| {
        let current = kpi::summarize(&weeks, current);
        let delta = previous.map(|p| kpi::compare(&current, &kpi::summarize(&weeks, p)));
        (current, delta)
    });

    SyncOutput {
        weeks,
        report: derivation.report,
        velocity,
        snapshot,
        kpi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    fn input() -> SyncInput {
        SyncInput {
            days: serde_json::from_value(json!({
                "2024-06-03": {"amazon": {"revenue": 100, "units": 10, "skuData": [
                    {"sku": "A", "netSales": 100, "unitsSold": 10}
                ]}},
                "2024-06-11": {"shopify": {"revenue": 40, "units": 2, "skuData": [
                    {"sku": "AShop", "netSales": 40, "unitsSold": 2}
                ]}}
            }))
            .unwrap(),
            stored_weeks: serde_json::from_value(json!({
                "2024-05-26": {"amazon": {"revenue": 70, "units": 7}},
                "2024-06-09": {"amazon": {"revenue": 1}, "total": {"revenue": 999}}
            }))
            .unwrap(),
            stock: serde_json::from_value(json!({
                "amazon": [{"sku": "A", "quantity": 12}]
            }))
            .unwrap(),
            corrections: ForecastCorrections::default(),
        }
    }

    #[test]
    fn derives_merges_and_projects() {
        let input = input();
        let as_of = as_of(&input.days, key("2030-01-01"));
        assert_eq!(as_of, key("2024-06-11"));
        let out = run(&input, &ReconConfig::default(), as_of);

        assert_eq!(
            out.weeks.keys().copied().collect::<Vec<_>>(),
            vec![key("2024-05-26"), key("2024-06-09"), key("2024-06-16")]
        );
        assert_eq!(out.weeks[&key("2024-06-09")].total.revenue, 100.0);

        // 12 units inside the recent window: (12 * 2) / 6 per week
        let v = &out.velocity["A"];
        assert!((v.total - 4.0).abs() < 1e-9);

        let item = &out.snapshot.items[0];
        assert_eq!(item.sku, "A");
        assert!((item.days_of_supply.unwrap() - 21.0).abs() < 1e-9);

        let (summary, delta) = out.kpi.unwrap();
        assert_eq!(summary.weeks, 3);
        assert_eq!(summary.total.revenue, 210.0);
        assert_eq!(delta, None);
    }

    #[test]
    fn empty_input_is_quiet() {
        let out = run(&SyncInput::default(), &ReconConfig::default(), key("2024-06-11"));
        assert!(out.weeks.is_empty());
        assert!(out.velocity.is_empty());
        assert!(out.snapshot.items.is_empty());
        assert!(out.kpi.is_none());
    }
}
