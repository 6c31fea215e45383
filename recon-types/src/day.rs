use crate::ads::AdsMetrics;
use crate::channel::{AmazonChannel, ShopifyChannel};
use crate::{de_opt_num, de_or_default};
use serde::{Deserialize, Serialize};

/// One calendar day of sales for both channels, in canonical shape.
///
/// Deserialization goes through `RawDailyRecord`, which also accepts the
/// older flat layout where ad counters live at the root of the record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawDailyRecord")]
pub struct DailyRecord {
    pub amazon: AmazonChannel,
    pub shopify: ShopifyChannel,
}

impl DailyRecord {
    pub fn has_signal(&self) -> bool {
        self.amazon.revenue > 0.0
            || self.shopify.revenue > 0.0
            || self.shopify.meta_spend > 0.0
            || self.shopify.google_spend > 0.0
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawDailyRecord {
    #[serde(default, deserialize_with = "de_or_default")]
    amazon: AmazonChannel,
    #[serde(default, deserialize_with = "de_or_default")]
    shopify: ShopifyChannel,
    #[serde(flatten)]
    legacy: LegacyAdFields,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LegacyAdFields {
    #[serde(default, deserialize_with = "de_opt_num")]
    meta_spend: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    google_spend: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    meta_impressions: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    meta_clicks: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    meta_purchases: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    meta_purchase_value: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    google_impressions: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    google_clicks: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    google_conversions: Option<f64>,
}

fn nested_or_flat(nested: f64, flat: Option<f64>) -> f64 {
    if nested != 0.0 {
        nested
    } else {
        flat.unwrap_or(0.0)
    }
}

impl From<RawDailyRecord> for DailyRecord {
    fn from(raw: RawDailyRecord) -> Self {
        let RawDailyRecord {
            mut amazon,
            mut shopify,
            legacy,
        } = raw;
        amazon.fill_aliases();

        shopify.meta_spend = nested_or_flat(shopify.meta_spend, legacy.meta_spend);
        shopify.google_spend = nested_or_flat(shopify.google_spend, legacy.google_spend);
        if shopify.ad_spend == 0.0 {
            shopify.ad_spend = shopify.meta_spend + shopify.google_spend;
        }

        let nested = &shopify.ads_metrics;
        let ads_metrics = AdsMetrics {
            meta_impressions: nested_or_flat(nested.meta_impressions, legacy.meta_impressions),
            meta_clicks: nested_or_flat(nested.meta_clicks, legacy.meta_clicks),
            meta_purchases: nested_or_flat(nested.meta_purchases, legacy.meta_purchases),
            meta_purchase_value: nested_or_flat(
                nested.meta_purchase_value,
                legacy.meta_purchase_value,
            ),
            google_impressions: nested_or_flat(
                nested.google_impressions,
                legacy.google_impressions,
            ),
            google_clicks: nested_or_flat(nested.google_clicks, legacy.google_clicks),
            google_conversions: nested_or_flat(
                nested.google_conversions,
                legacy.google_conversions,
            ),
            ..Default::default()
        };
        shopify.ads_metrics = ads_metrics.with_rates(shopify.meta_spend, shopify.google_spend);

        Self { amazon, shopify }
    }
}
