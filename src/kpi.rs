use recon_types::{safe_div, AmazonChannel, DayKey, ShopifyChannel, Totals, WeeklyRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub from: DayKey,
    pub to: DayKey,
    pub weeks: usize,
    pub amazon: AmazonChannel,
    pub shopify: ShopifyChannel,
    pub total: Totals,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiDelta {
    pub revenue: f64,
    pub units: f64,
    pub ad_spend: f64,
    pub net_profit: f64,
    pub net_margin: f64,
    pub roas: f64,
    pub tacos: f64,
}

pub fn summarize(
    weeks: &BTreeMap<DayKey, WeeklyRecord>,
    range: RangeInclusive<DayKey>,
) -> PeriodSummary {
    let mut amazon = AmazonChannel::default();
    let mut shopify = ShopifyChannel::default();
    let mut count = 0;
    if range.start() <= range.end() {
        for week in weeks.range(range.clone()).map(|(_, w)| w) {
            amazon.accumulate(&week.amazon);
            shopify.accumulate(&week.shopify);
            count += 1;
        }
    }
    shopify.refresh_ad_rates();
    PeriodSummary {
        from: *range.start(),
        to: *range.end(),
        weeks: count,
        total: Totals::from_channels(&amazon, &shopify),
        amazon,
        shopify,
    }
}

/// Range covering the last `count` weeks, together with the range of the
/// `count` weeks before them when there are enough.
pub fn latest_weeks(
    weeks: &BTreeMap<DayKey, WeeklyRecord>,
    count: usize,
) -> Option<(RangeInclusive<DayKey>, Option<RangeInclusive<DayKey>>)> {
    let keys: Vec<DayKey> = weeks.keys().rev().copied().collect();
    let current = keys.get(..count.min(keys.len())).filter(|k| !k.is_empty())?;
    let range_of = |chunk: &[DayKey]| Some(*chunk.last()?..=*chunk.first()?);
    let previous = keys
        .get(count..(count * 2).min(keys.len()))
        .filter(|k| k.len() == count)
        .and_then(range_of);
    Some((range_of(current)?, previous))
}

fn change(current: f64, previous: f64) -> f64 {
    safe_div(current - previous, previous.abs()) * 100.0
}

pub fn compare(current: &PeriodSummary, previous: &PeriodSummary) -> KpiDelta {
    let (c, p) = (&current.total, &previous.total);
    KpiDelta {
        revenue: change(c.revenue, p.revenue),
        units: change(c.units, p.units),
        ad_spend: change(c.ad_spend, p.ad_spend),
        net_profit: change(c.net_profit, p.net_profit),
        net_margin: change(c.net_margin, p.net_margin),
        roas: change(c.roas, p.roas),
        tacos: change(c.tacos, p.tacos),
    }
}
