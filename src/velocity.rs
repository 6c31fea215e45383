use derive_more::Display;
use recon_types::{de_num, normalize_sku, safe_div, DailyRecord, DayKey, SkuLineItem, WeeklyRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::VelocityConfig;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[display("accelerating")]
    Accelerating,
    #[display("decelerating")]
    Decelerating,
    #[default]
    #[display("stable")]
    Stable,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VelocitySource {
    Daily,
    Weekly,
    #[default]
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VelocityEstimate {
    pub amazon: f64,
    pub shopify: f64,
    pub total: f64,
    pub corrected: f64,
    pub correction_applied: bool,
    pub trend: f64,
    pub trend_label: Trend,
    pub source: VelocitySource,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionFactor {
    #[serde(default, deserialize_with = "de_num")]
    pub factor: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub samples_used: f64,
}

impl CorrectionFactor {
    fn usable(&self, config: &VelocityConfig) -> bool {
        self.factor > 0.0
            && self.confidence >= config.min_confidence
            && self.samples_used >= config.min_samples as f64
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastCorrections {
    #[serde(default)]
    pub global: Option<CorrectionFactor>,
    #[serde(default)]
    pub by_sku: BTreeMap<String, CorrectionFactor>,
}

impl ForecastCorrections {
    pub fn factor_for(&self, sku: &str, config: &VelocityConfig) -> Option<f64> {
        let key = normalize_sku(sku);
        self.by_sku
            .iter()
            .filter(|(k, _)| normalize_sku(k) == key)
            .map(|(_, c)| c)
            .chain(self.global.iter())
            .find(|c| c.usable(config))
            .map(|c| c.factor)
    }
}

#[derive(Default, Clone, Copy)]
struct WindowUnits {
    recent: f64,
    prior: f64,
}

#[derive(Default)]
struct SkuHistory {
    amazon: WindowUnits,
    shopify: WindowUnits,
    weekly_amazon: f64,
    weekly_shopify: f64,
}

enum Period {
    Recent,
    Prior,
}

fn add_units(
    map: &mut BTreeMap<String, SkuHistory>,
    rows: &[SkuLineItem],
    pick: impl Fn(&mut SkuHistory) -> &mut f64,
) {
    for row in rows {
        let Some(sku) = row.key() else { continue };
        let key = normalize_sku(sku);
        if key.is_empty() {
            continue;
        }
        *pick(map.entry(key).or_default()) += row.units_sold;
    }
}

pub struct VelocityEstimator<'a> {
    config: &'a VelocityConfig,
    corrections: &'a ForecastCorrections,
}

impl<'a> VelocityEstimator<'a> {
    pub fn new(config: &'a VelocityConfig, corrections: &'a ForecastCorrections) -> Self {
        Self {
            config,
            corrections,
        }
    }

    /// `as_of` defaults to the latest daily record, which keeps the result
    /// independent of the wall clock.
    pub fn estimate(
        &self,
        days: &BTreeMap<DayKey, DailyRecord>,
        weeks: &BTreeMap<DayKey, WeeklyRecord>,
        as_of: Option<DayKey>,
    ) -> BTreeMap<String, VelocityEstimate> {
        let mut history: BTreeMap<String, SkuHistory> = BTreeMap::new();
        let recent_days = self.config.recent_days.max(1) as i64;

        if let Some(as_of) = as_of.or_else(|| days.keys().next_back().copied()) {
            for (key, day) in days {
                let age = as_of.days_since(*key);
                let period = match age {
                    a if a < 0 => continue,
                    a if a < recent_days => Period::Recent,
                    a if a < recent_days * 2 => Period::Prior,
                    _ => continue,
                };
                match period {
                    Period::Recent => {
                        add_units(&mut history, &day.amazon.sku_data, |h| &mut h.amazon.recent);
                        add_units(&mut history, &day.shopify.sku_data, |h| &mut h.shopify.recent);
                    }
                    Period::Prior => {
                        add_units(&mut history, &day.amazon.sku_data, |h| &mut h.amazon.prior);
                        add_units(&mut history, &day.shopify.sku_data, |h| &mut h.shopify.prior);
                    }
                }
            }
        }
        for week in weeks.values() {
            add_units(&mut history, &week.amazon.sku_data, |h| &mut h.weekly_amazon);
            add_units(&mut history, &week.shopify.sku_data, |h| &mut h.weekly_shopify);
        }

        let weeks_per_period = recent_days as f64 / 7.0;
        let weeks_seen = weeks.len() as f64;
        history
            .into_iter()
            .map(|(sku, h)| {
                let estimate = self.estimate_one(&sku, &h, weeks_per_period, weeks_seen);
                (sku, estimate)
            })
            .collect()
    }

    fn estimate_one(
        &self,
        sku: &str,
        h: &SkuHistory,
        weeks_per_period: f64,
        weeks_seen: f64,
    ) -> VelocityEstimate {
        let weighted = |w: WindowUnits| safe_div(w.recent * 2.0 + w.prior, 3.0 * weeks_per_period);
        let mut amazon = weighted(h.amazon);
        let mut shopify = weighted(h.shopify);
        let mut source = VelocitySource::Daily;

        let recent_avg = safe_div(h.amazon.recent + h.shopify.recent, weeks_per_period);
        let prior_avg = safe_div(h.amazon.prior + h.shopify.prior, weeks_per_period);
        let mut trend = safe_div(recent_avg - prior_avg, prior_avg);

        if amazon + shopify == 0.0 {
            amazon = safe_div(h.weekly_amazon, weeks_seen);
            shopify = safe_div(h.weekly_shopify, weeks_seen);
            trend = 0.0;
            source = if amazon + shopify > 0.0 {
                VelocitySource::Weekly
            } else {
                VelocitySource::None
            };
        }
        let total = amazon + shopify;

        let trend_label = if trend > self.config.trend_threshold {
            Trend::Accelerating
        } else if trend < -self.config.trend_threshold {
            Trend::Decelerating
        } else {
            Trend::Stable
        };

        let factor = self.corrections.factor_for(sku, self.config);
        let mut corrected = total * factor.unwrap_or(1.0);
        if trend.abs() > self.config.trend_adjust_threshold {
            let adjustment = self.config.trend_adjustment * trend.signum();
            corrected *= 1.0 + adjustment;
        }

        VelocityEstimate {
            amazon,
            shopify,
            total,
            corrected,
            correction_applied: factor.is_some(),
            trend,
            trend_label,
            source,
        }
    }
}
