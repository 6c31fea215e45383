use crate::channel::{AmazonChannel, ShopifyChannel};
use crate::{de_num, de_or_default, safe_div, DayKey};
use serde::{Deserialize, Deserializer, Serialize};

pub const DAYS_IN_WEEK: usize = 7;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekMeta {
    #[serde(default)]
    pub is_in_progress: bool,
    #[serde(default)]
    pub days_present: usize,
}

impl WeekMeta {
    pub fn from_days(days: &[DayKey]) -> Self {
        Self {
            is_in_progress: days.len() < DAYS_IN_WEEK,
            days_present: days.len(),
        }
    }
}

/// Cross-channel figures. Always computed from the channel parts with
/// [`Totals::from_channels`], never stored on their own.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[serde(default, deserialize_with = "de_num")]
    pub revenue: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub units: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub cogs: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub ad_spend: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub net_profit: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub net_margin: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub roas: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub tacos: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub amazon_share: f64,
    #[serde(default, deserialize_with = "de_num")]
    pub shopify_share: f64,
}

impl Totals {
    pub fn from_channels(amazon: &AmazonChannel, shopify: &ShopifyChannel) -> Self {
        let revenue = amazon.revenue + shopify.revenue;
        let ad_spend = amazon.ad_spend + shopify.ad_spend;
        let net_profit = amazon.net_profit + shopify.net_profit;
        Self {
            revenue,
            units: amazon.units + shopify.units,
            cogs: amazon.cogs + shopify.cogs,
            ad_spend,
            net_profit,
            net_margin: safe_div(net_profit, revenue) * 100.0,
            roas: safe_div(revenue, ad_spend),
            tacos: safe_div(ad_spend, revenue) * 100.0,
            amazon_share: safe_div(amazon.revenue, revenue) * 100.0,
            shopify_share: safe_div(shopify.revenue, revenue) * 100.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRecord {
    #[serde(default, deserialize_with = "de_day_keys")]
    pub days: Vec<DayKey>,
    #[serde(default, deserialize_with = "de_or_default")]
    pub meta: WeekMeta,
    #[serde(default, deserialize_with = "de_or_default")]
    pub amazon: AmazonChannel,
    #[serde(default, deserialize_with = "de_or_default")]
    pub shopify: ShopifyChannel,
    #[serde(default, deserialize_with = "de_or_default")]
    pub total: Totals,
}

impl WeeklyRecord {
    pub fn new(days: Vec<DayKey>, amazon: AmazonChannel, shopify: ShopifyChannel) -> Self {
        let mut week = Self {
            days,
            amazon,
            shopify,
            ..Default::default()
        };
        week.refresh();
        week
    }

    pub fn refresh(&mut self) {
        self.days.sort();
        self.days.dedup();
        if !self.days.is_empty() {
            self.meta = WeekMeta::from_days(&self.days);
        }
        self.shopify.refresh_ad_rates();
        self.total = Totals::from_channels(&self.amazon, &self.shopify);
    }
}

fn de_day_keys<'de, D>(deserializer: D) -> Result<Vec<DayKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|d| match d.parse() {
            Ok(key) => Some(key),
            Err(err) => {
                log::warn!("Dropping day from stored week: {err}");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn totals_sum_channels() {
        let amazon = AmazonChannel {
            revenue: 300.0,
            units: 10.0,
            cogs: 90.0,
            ad_spend: 30.0,
            net_profit: 60.0,
            ..Default::default()
        };
        let shopify = ShopifyChannel {
            revenue: 100.0,
            units: 4.0,
            cogs: 20.0,
            ad_spend: 20.0,
            net_profit: 20.0,
            ..Default::default()
        };
        let total = Totals::from_channels(&amazon, &shopify);
        assert!(approx(total.revenue, 400.0));
        assert!(approx(total.units, 14.0));
        assert!(approx(total.cogs, 110.0));
        assert!(approx(total.ad_spend, 50.0));
        assert!(approx(total.net_profit, 80.0));
        assert!(approx(total.net_margin, 20.0));
        assert!(approx(total.roas, 8.0));
        assert!(approx(total.tacos, 12.5));
        assert!(approx(total.amazon_share, 75.0));
        assert!(approx(total.shopify_share, 25.0));
    }

    #[test]
    fn totals_of_empty_week_are_zero() {
        let total = Totals::from_channels(&AmazonChannel::default(), &ShopifyChannel::default());
        assert_eq!(total, Totals::default());
    }

    #[test]
    fn stored_week_total_is_not_trusted() {
        let mut week: WeeklyRecord = serde_json::from_value(json!({
            "days": ["2024-06-03", "bogus", "2024-06-04"],
            "amazon": {"revenue": 10},
            "shopify": {"revenue": 5},
            "total": {"revenue": 999}
        }))
        .unwrap();
        assert_eq!(week.days.len(), 2);
        week.refresh();
        assert!(approx(week.total.revenue, 15.0));
        assert!(week.meta.is_in_progress);
        assert_eq!(week.meta.days_present, 2);
    }

    #[test]
    fn full_week_is_not_in_progress() {
        let start: DayKey = "2024-06-03".parse().unwrap();
        let days = (0..7).filter_map(|i| start.add_days(i)).collect::<Vec<_>>();
        let week = WeeklyRecord::new(days, AmazonChannel::default(), ShopifyChannel::default());
        assert!(!week.meta.is_in_progress);
        assert_eq!(week.meta.days_present, 7);
    }
}
