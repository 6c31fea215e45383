use itertools::Itertools;
use recon_types::{
    AmazonChannel, DailyRecord, DayKey, ShopifyChannel, SkuLineItem, WeeklyRecord,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::reconcile::{self, ChannelHeader, DEFAULT_TOLERANCE};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivationReport {
    pub days_seen: usize,
    pub days_skipped: usize,
    pub sku_rows_skipped: usize,
    pub zero_basis_weeks: Vec<DayKey>,
    pub missing_sku_weeks: Vec<DayKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derivation {
    pub weeks: BTreeMap<DayKey, WeeklyRecord>,
    pub report: DerivationReport,
}

#[derive(Default)]
struct WeekAccumulator {
    days: Vec<DayKey>,
    amazon: AmazonChannel,
    shopify: ShopifyChannel,
    amazon_skus: BTreeMap<String, SkuLineItem>,
    shopify_skus: BTreeMap<String, SkuLineItem>,
}

impl WeekAccumulator {
    fn add_day(&mut self, key: DayKey, day: &DailyRecord) -> usize {
        self.days.push(key);
        self.amazon.accumulate(&day.amazon);
        self.shopify.accumulate(&day.shopify);
        roll_up(&mut self.amazon_skus, &day.amazon.sku_data)
            + roll_up(&mut self.shopify_skus, &day.shopify.sku_data)
    }

    fn finish(self, week: DayKey, tolerance: f64, report: &mut DerivationReport) -> WeeklyRecord {
        let Self {
            days,
            mut amazon,
            mut shopify,
            amazon_skus,
            shopify_skus,
        } = self;

        let header = ChannelHeader::from(&amazon);
        let amazon_rows = by_net_sales(amazon_skus);
        if amazon_rows.is_empty() && amazon.revenue > 0.0 {
            log::warn!("Week {week}: Amazon revenue {:.2} without SKU rows", amazon.revenue);
            report.missing_sku_weeks.push(week);
        }
        // Shopify rows are taken as exported; only Amazon headers drift.
        let reconciliation = reconcile::reconcile(&header, amazon_rows, tolerance);
        if reconciliation.has_zero_basis() {
            log::warn!(
                "Week {week}: Amazon SKU rows sum to zero against header (revenue {:?}, units {:?}, profit {:?})",
                reconciliation.revenue,
                reconciliation.units,
                reconciliation.profit
            );
            report.zero_basis_weeks.push(week);
        }
        amazon.sku_data = reconciliation.items;
        shopify.sku_data = by_net_sales(shopify_skus);

        WeeklyRecord::new(days, amazon, shopify)
    }
}

/// Adds keyed rows into `map`, returning how many rows had no SKU.
fn roll_up(map: &mut BTreeMap<String, SkuLineItem>, rows: &[SkuLineItem]) -> usize {
    let mut skipped = 0;
    for row in rows {
        let Some(key) = row.key() else {
            skipped += 1;
            continue;
        };
        map.entry(key.to_string())
            .or_insert_with(|| SkuLineItem {
                sku: key.to_string(),
                ..Default::default()
            })
            .absorb(row);
    }
    skipped
}

fn by_net_sales(map: BTreeMap<String, SkuLineItem>) -> Vec<SkuLineItem> {
    map.into_values()
        .sorted_by(|a, b| {
            b.net_sales
                .total_cmp(&a.net_sales)
                .then_with(|| a.sku.cmp(&b.sku))
        })
        .collect()
}

pub struct WeekDeriver {
    tolerance: f64,
}

impl Default for WeekDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl WeekDeriver {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn derive(&self, days: &BTreeMap<DayKey, DailyRecord>) -> Derivation {
        let mut report = DerivationReport::default();
        let mut accumulators: BTreeMap<DayKey, WeekAccumulator> = BTreeMap::new();

        for (key, day) in days {
            report.days_seen += 1;
            if !day.has_signal() {
                log::debug!("Skipping {key}: no revenue or ad spend");
                report.days_skipped += 1;
                continue;
            }
            let skipped = accumulators
                .entry(key.week_ending_sunday())
                .or_default()
                .add_day(*key, day);
            if skipped > 0 {
                log::debug!("{key}: {skipped} SKU rows without identifier left out of SKU rollup");
                report.sku_rows_skipped += skipped;
            }
        }

        let weeks = accumulators
            .into_iter()
            .map(|(week, acc)| (week, acc.finish(week, self.tolerance, &mut report)))
            .collect::<BTreeMap<_, _>>();

        log::info!(
            "Derived {} weeks from {} days ({} skipped, {} SKU rows without identifier)",
            weeks.len(),
            report.days_seen,
            report.days_skipped,
            report.sku_rows_skipped
        );
        Derivation { weeks, report }
    }
}

pub fn derive_weeks_from_days(
    days: &BTreeMap<DayKey, DailyRecord>,
) -> BTreeMap<DayKey, WeeklyRecord> {
    WeekDeriver::default().derive(days).weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn key(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    fn days(value: serde_json::Value) -> BTreeMap<DayKey, DailyRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn assert_consistent(week: &WeeklyRecord) {
        let (a, s, t) = (&week.amazon, &week.shopify, &week.total);
        assert!(approx(t.revenue, a.revenue + s.revenue));
        assert!(approx(t.units, a.units + s.units));
        assert!(approx(t.cogs, a.cogs + s.cogs));
        assert!(approx(t.ad_spend, a.ad_spend + s.ad_spend));
        assert!(approx(t.net_profit, a.net_profit + s.net_profit));
    }

    #[test]
    fn two_days_make_one_week_in_progress() {
        let weeks = derive_weeks_from_days(&days(json!({
            "2024-06-03": {"amazon": {"revenue": 100, "units": 5}},
            "2024-06-04": {"shopify": {"revenue": 50, "units": 2}}
        })));
        assert_eq!(weeks.len(), 1);
        let week = &weeks[&key("2024-06-09")];
        assert!(approx(week.total.revenue, 150.0));
        assert!(approx(week.total.units, 7.0));
        assert!(week.meta.is_in_progress);
        assert_eq!(week.meta.days_present, 2);
        assert_eq!(week.days, vec![key("2024-06-03"), key("2024-06-04")]);
        assert_consistent(week);
    }

    #[test]
    fn silent_day_opens_no_week() {
        let derivation = WeekDeriver::default().derive(&days(json!({
            "2024-06-03": {"amazon": {"revenue": 0, "units": 0}, "shopify": {"revenue": 0}},
            "2024-06-10": {"amazon": {"revenue": 10, "units": 1}}
        })));
        assert_eq!(derivation.weeks.len(), 1);
        assert!(!derivation.weeks.contains_key(&key("2024-06-09")));
        assert_eq!(derivation.report.days_seen, 2);
        assert_eq!(derivation.report.days_skipped, 1);
    }

    #[test]
    fn ads_only_day_still_counts() {
        let weeks = derive_weeks_from_days(&days(json!({
            "2024-06-05": {"shopify": {"metaSpend": 40, "adsMetrics": {"metaImpressions": 1000, "metaClicks": 20}}}
        })));
        let week = &weeks[&key("2024-06-09")];
        let ads = &week.shopify.ads_metrics;
        assert!(approx(ads.meta_ctr, 2.0));
        assert!(approx(ads.meta_cpc, 2.0));
        assert!(approx(ads.meta_cpm, 40.0));
        assert!(approx(week.total.ad_spend, 40.0));
    }

    #[test]
    fn rates_come_from_summed_counters() {
        let weeks = derive_weeks_from_days(&days(json!({
            "2024-06-03": {"shopify": {"revenue": 1, "metaSpend": 10, "adsMetrics": {"metaImpressions": 100, "metaClicks": 10}}},
            "2024-06-04": {"shopify": {"revenue": 1, "metaSpend": 30, "adsMetrics": {"metaImpressions": 900, "metaClicks": 10}}}
        })));
        let ads = &weeks[&key("2024-06-09")].shopify.ads_metrics;
        assert!(approx(ads.meta_impressions, 1000.0));
        assert!(approx(ads.meta_ctr, 2.0));
        assert!(approx(ads.meta_cpc, 2.0));
    }

    #[test]
    fn skus_roll_up_sorted_and_reconciled() {
        let derivation = WeekDeriver::default().derive(&days(json!({
            "2024-06-03": {"amazon": {"revenue": 60, "units": 5, "skuData": [
                {"sku": "A", "netSales": 20, "unitsSold": 2},
                {"sku": "B ", "netSales": 30, "unitsSold": 3}
            ]}},
            "2024-06-04": {"amazon": {"revenue": 50, "units": 5, "skuData": [
                {"sku": " A", "netSales": 30, "unitsSold": 3},
                {"sku": "", "netSales": 10, "unitsSold": 2}
            ]}}
        })));
        let week = &derivation.weeks[&key("2024-06-09")];
        let rows = &week.amazon.sku_data;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sku, "A");
        // header 110 against rows 80 -> scaled by 1.375
        assert!(approx(rows[0].net_sales, 50.0 * 1.375));
        assert!(approx(rows[1].net_sales, 30.0 * 1.375));
        // units: header 10, rows 8 -> scaled by 1.25
        assert!(approx(rows[0].units_sold, 5.0 * 1.25));
        assert!(approx(week.amazon.revenue, 110.0));
        assert_eq!(derivation.report.sku_rows_skipped, 1);
        assert_consistent(week);
    }

    #[test]
    fn shopify_skus_are_not_reconciled() {
        let weeks = derive_weeks_from_days(&days(json!({
            "2024-06-03": {"shopify": {"revenue": 200, "units": 4, "skuData": [
                {"sku": "S1", "netSales": 50, "unitsSold": 1}
            ]}}
        })));
        let rows = &weeks[&key("2024-06-09")].shopify.sku_data;
        assert!(approx(rows[0].net_sales, 50.0));
    }

    #[test]
    fn zero_basis_and_missing_rows_are_reported() {
        let derivation = WeekDeriver::default().derive(&days(json!({
            "2024-06-03": {"amazon": {"revenue": 100, "units": 2, "skuData": [
                {"sku": "A", "netSales": 0, "unitsSold": 2}
            ]}},
            "2024-06-12": {"amazon": {"revenue": 40, "units": 1}}
        })));
        assert_eq!(derivation.report.zero_basis_weeks, vec![key("2024-06-09")]);
        assert_eq!(derivation.report.missing_sku_weeks, vec![key("2024-06-16")]);
    }

    #[test]
    fn derivation_is_deterministic() {
        let input = days(json!({
            "2024-06-02": {"amazon": {"revenue": 12.5, "units": 1, "skuData": [{"sku": "Z", "netSales": 12}]}},
            "2024-06-03": {"amazon": {"revenue": 100, "units": 5}},
            "2024-06-04": {"shopify": {"revenue": 50, "units": 2, "googleSpend": 4}},
            "2024-06-11": {"shopify": {"revenue": 7, "units": 1}}
        }));
        let first = serde_json::to_string(&derive_weeks_from_days(&input)).unwrap();
        let second = serde_json::to_string(&derive_weeks_from_days(&input)).unwrap();
        assert_eq!(first, second);
        for week in derive_weeks_from_days(&input).values() {
            assert_consistent(week);
        }
    }
}
