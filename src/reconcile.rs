use recon_types::{AmazonChannel, SkuLineItem};
use serde::Serialize;

pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelHeader {
    pub revenue: f64,
    pub units: f64,
    pub net_profit: f64,
}

impl From<&AmazonChannel> for ChannelHeader {
    fn from(amazon: &AmazonChannel) -> Self {
        Self {
            revenue: amazon.revenue,
            units: amazon.units,
            net_profit: amazon.net_profit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Unchanged,
    Scaled(f64),
    /// Header reports a positive value while the rows sum to zero. Rows stay
    /// at zero, so the SKU table undercounts the header.
    ZeroBasis,
}

impl Scale {
    pub fn between(target: f64, sum: f64, tolerance: f64) -> Self {
        if target <= 0.0 {
            return Self::Unchanged;
        }
        if sum <= 0.0 {
            return Self::ZeroBasis;
        }
        if (sum - target).abs() / target > tolerance {
            Self::Scaled(target / sum)
        } else {
            Self::Unchanged
        }
    }

    pub fn factor(&self) -> f64 {
        match self {
            Self::Scaled(f) => *f,
            Self::Unchanged | Self::ZeroBasis => 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub items: Vec<SkuLineItem>,
    pub revenue: Scale,
    pub units: Scale,
    pub profit: Scale,
}

impl Reconciliation {
    pub fn has_zero_basis(&self) -> bool {
        [self.revenue, self.units, self.profit]
            .iter()
            .any(|s| matches!(s, Scale::ZeroBasis))
    }
}

pub fn reconcile(header: &ChannelHeader, items: Vec<SkuLineItem>, tolerance: f64) -> Reconciliation {
    if items.is_empty() {
        return Reconciliation::default();
    }
    let (sum_revenue, sum_units, sum_profit) = items.iter().fold((0.0, 0.0, 0.0), |acc, i| {
        (
            acc.0 + i.net_sales,
            acc.1 + i.units_sold,
            acc.2 + i.net_proceeds,
        )
    });
    let revenue = Scale::between(header.revenue, sum_revenue, tolerance);
    let units = Scale::between(header.units, sum_units, tolerance);
    let profit = Scale::between(header.net_profit, sum_profit, tolerance);

    let items = items
        .into_iter()
        .map(|mut item| {
            item.net_sales *= revenue.factor();
            item.net_proceeds *= profit.factor();
            item.units_sold *= units.factor();
            item
        })
        .collect();
    Reconciliation {
        items,
        revenue,
        units,
        profit,
    }
}

pub fn reconcile_amazon_skus(header: &ChannelHeader, items: Vec<SkuLineItem>) -> Vec<SkuLineItem> {
    reconcile(header, items, DEFAULT_TOLERANCE).items
}
