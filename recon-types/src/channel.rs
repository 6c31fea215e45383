use crate::ads::AdsMetrics;
use crate::{de_lenient_list, de_num, de_opt_num, de_or_default, de_string, num};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawSkuLineItem")]
pub struct SkuLineItem {
    pub sku: String,
    pub name: String,
    pub units_sold: f64,
    pub net_sales: f64,
    pub net_proceeds: f64,
    pub returns: f64,
    pub ad_spend: f64,
    pub cogs: f64,
    pub discounts: f64,
}

/// Wire shape of a SKU row. Exports disagree on naming, so both the
/// `unitsSold`/`netSales`/`netProceeds` and the `units`/`revenue`/`netProfit`
/// spellings are accepted, the former winning when both are present.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawSkuLineItem {
    #[serde(default, deserialize_with = "de_string")]
    sku: String,
    #[serde(default, deserialize_with = "de_string")]
    name: String,
    #[serde(default, deserialize_with = "de_opt_num")]
    units_sold: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    units: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    net_sales: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    revenue: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    net_proceeds: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_num")]
    net_profit: Option<f64>,
    #[serde(default, deserialize_with = "de_num")]
    returns: f64,
    #[serde(default, deserialize_with = "de_num")]
    ad_spend: f64,
    #[serde(default, deserialize_with = "de_num")]
    cogs: f64,
    #[serde(default, deserialize_with = "de_num")]
    discounts: f64,
}

impl From<RawSkuLineItem> for SkuLineItem {
    fn from(raw: RawSkuLineItem) -> Self {
        Self {
            sku: raw.sku,
            name: raw.name,
            units_sold: raw.units_sold.or(raw.units).unwrap_or(0.0),
            net_sales: raw.net_sales.or(raw.revenue).unwrap_or(0.0),
            net_proceeds: raw.net_proceeds.or(raw.net_profit).unwrap_or(0.0),
            returns: raw.returns,
            ad_spend: raw.ad_spend,
            cogs: raw.cogs,
            discounts: raw.discounts,
        }
    }
}

impl SkuLineItem {
    pub fn key(&self) -> Option<&str> {
        let sku = self.sku.trim();
        if sku.is_empty() {
            None
        } else {
            Some(sku)
        }
    }

    pub fn absorb(&mut self, other: &SkuLineItem) {
        if self.name.is_empty() && !other.name.is_empty() {
            self.name = other.name.clone();
        }
        self.units_sold += other.units_sold;
        self.net_sales += other.net_sales;
        self.net_proceeds += other.net_proceeds;
        self.returns += other.returns;
        self.ad_spend += other.ad_spend;
        self.cogs += other.cogs;
        self.discounts += other.discounts;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AmazonChannel {
    #[serde(default, deserialize_with = "de_num")]
    pub revenue: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub units: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub returns: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub cogs: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub fees: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub ad_spend: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub net_profit: f64,
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub sku_data: Vec<SkuLineItem>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AmazonChannel {
    pub fn fill_aliases(&mut self) {
        if self.revenue == 0.0 {
            self.revenue = self.extra.get("netSales").map(num).unwrap_or(0.0);
        }
        if self.net_profit == 0.0 {
            self.net_profit = self.extra.get("netProceeds").map(num).unwrap_or(0.0);
        }
    }

    pub fn accumulate(&mut self, other: &AmazonChannel) {
        self.revenue += other.revenue;
        self.units += other.units;
        self.returns += other.returns;
        self.cogs += other.cogs;
        self.fees += other.fees;
        self.ad_spend += other.ad_spend;
        self.net_profit += other.net_profit;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyChannel {
    #[serde(default, deserialize_with = "de_num")]
    pub revenue: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub units: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub cogs: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub discounts: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub ad_spend: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub meta_spend: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub google_spend: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub net_profit: f64,
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub sku_data: Vec<SkuLineItem>,
    #[serde(default, deserialize_with = "de_or_default")]
    pub ads_metrics: AdsMetrics,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ShopifyChannel {
    pub fn accumulate(&mut self, other: &ShopifyChannel) {
        self.revenue += other.revenue;
        self.units += other.units;
        self.cogs += other.cogs;
        self.discounts += other.discounts;
        self.ad_spend += other.ad_spend;
        self.meta_spend += other.meta_spend;
        self.google_spend += other.google_spend;
        self.net_profit += other.net_profit;
        self.ads_metrics.accumulate(&other.ads_metrics);
    }

    pub fn refresh_ad_rates(&mut self) {
        self.ads_metrics
            .recompute_rates(self.meta_spend, self.google_spend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_keeps_unknown_keys() {
        let amazon: AmazonChannel = serde_json::from_value(json!({
            "revenue": "120.5",
            "netProceeds": 40,
            "storageFees": 3.2,
            "skuData": [{"sku": " A1 ", "unitsSold": 2}, "broken"]
        }))
        .unwrap();
        let mut amazon = amazon;
        amazon.fill_aliases();
        assert_eq!(amazon.revenue, 120.5);
        assert_eq!(amazon.net_profit, 40.0);
        assert_eq!(amazon.extra.get("storageFees"), Some(&json!(3.2)));
        assert_eq!(amazon.sku_data.len(), 1);
        assert_eq!(amazon.sku_data[0].key(), Some("A1"));

        let back = serde_json::to_value(&amazon).unwrap();
        assert_eq!(back["storageFees"], json!(3.2));
        assert_eq!(back["netProfit"], json!(40.0));
    }

    #[test]
    fn sku_row_accepts_both_spellings() {
        let item: SkuLineItem = serde_json::from_value(json!({
            "sku": "B2",
            "units": 4,
            "revenue": "80",
            "unitsSold": 5
        }))
        .unwrap();
        assert_eq!(item.units_sold, 5.0);
        assert_eq!(item.net_sales, 80.0);
        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["unitsSold"], json!(5.0));
        assert_eq!(back["netSales"], json!(80.0));
    }

    #[test]
    fn null_collections_become_empty() {
        let shopify: ShopifyChannel =
            serde_json::from_value(json!({"skuData": null, "adsMetrics": null, "units": null}))
                .unwrap();
        assert!(shopify.sku_data.is_empty());
        assert_eq!(shopify.ads_metrics, AdsMetrics::default());
        assert_eq!(shopify.units, 0.0);
    }

    #[test]
    fn sku_without_identifier_has_no_key() {
        let item = SkuLineItem {
            sku: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(item.key(), None);
    }

    #[test]
    fn absorb_sums_and_keeps_first_name() {
        let mut a = SkuLineItem {
            sku: "A".to_string(),
            units_sold: 1.0,
            net_sales: 10.0,
            ..Default::default()
        };
        a.absorb(&SkuLineItem {
            sku: "A".to_string(),
            name: "Widget".to_string(),
            units_sold: 2.0,
            net_sales: 5.0,
            cogs: 1.5,
            ..Default::default()
        });
        assert_eq!(a.name, "Widget");
        assert_eq!(a.units_sold, 3.0);
        assert_eq!(a.net_sales, 15.0);
        assert_eq!(a.cogs, 1.5);
    }
}
