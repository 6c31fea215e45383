use crate::{de_num, safe_div};
use serde::{Deserialize, Serialize};

/// Advertising counters with the rates derived from them.
///
/// Rates are never summed: after any accumulation or merge they are
/// recomputed from the counters with [`AdsMetrics::recompute_rates`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdsMetrics {
    #[serde(default, deserialize_with = "de_num")]
    pub meta_impressions: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub meta_clicks: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub meta_purchases: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub meta_purchase_value: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub google_impressions: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub google_clicks: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub google_conversions: f64,

    #[serde(default, rename = "metaCTR", deserialize_with = "de_num")]
    pub meta_ctr: f64,
    #[serde(default, rename = "metaCPC", deserialize_with = "de_num")]
    pub meta_cpc: f64,
    #[serde(default, rename = "metaCPM", deserialize_with = "de_num")]
    pub meta_cpm: f64,
    #[serde(default, rename = "metaROAS", deserialize_with = "de_num")]
    pub meta_roas: f64,
    #[serde(default, rename = "googleCTR", deserialize_with = "de_num")]
    pub google_ctr: f64,
    #[serde(default, rename = "googleCPC", deserialize_with = "de_num")]
    pub google_cpc: f64,
    #[serde(default, rename = "googleCostPerConv", deserialize_with = "de_num")]
    pub google_cost_per_conv: f64,
}

impl AdsMetrics {
    pub fn has_signal(&self) -> bool {
        [
            self.meta_impressions,
            self.meta_clicks,
            self.meta_purchases,
            self.google_impressions,
            self.google_clicks,
            self.google_conversions,
        ]
        .iter()
        .any(|v| *v != 0.0)
    }

    pub fn accumulate(&mut self, other: &AdsMetrics) {
        self.meta_impressions += other.meta_impressions;
        self.meta_clicks += other.meta_clicks;
        self.meta_purchases += other.meta_purchases;
        self.meta_purchase_value += other.meta_purchase_value;
        self.google_impressions += other.google_impressions;
        self.google_clicks += other.google_clicks;
        self.google_conversions += other.google_conversions;
    }

    pub fn recompute_rates(&mut self, meta_spend: f64, google_spend: f64) {
        self.meta_ctr = safe_div(self.meta_clicks, self.meta_impressions) * 100.0;
        self.meta_cpc = safe_div(meta_spend, self.meta_clicks);
        self.meta_cpm = safe_div(meta_spend, self.meta_impressions) * 1000.0;
        self.meta_roas = safe_div(self.meta_purchase_value, meta_spend);
        self.google_ctr = safe_div(self.google_clicks, self.google_impressions) * 100.0;
        self.google_cpc = safe_div(google_spend, self.google_clicks);
        self.google_cost_per_conv = safe_div(google_spend, self.google_conversions);
    }

    pub fn with_rates(mut self, meta_spend: f64, google_spend: f64) -> Self {
        self.recompute_rates(meta_spend, google_spend);
        self
    }
}
