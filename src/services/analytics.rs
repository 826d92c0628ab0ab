use crate::{
    db::DbPool,
    entities::{
        dsr::Entity as DsrEntity,
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        order_item_return::{self, Entity as ItemReturnEntity},
        route::Entity as RouteEntity,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesBucket {
    /// `YYYY-MM-DD`, `YYYY-Www` or `YYYY-MM` depending on the bucket.
    pub label: String,
    pub gross: Decimal,
    pub returns: Decimal,
    pub net: Decimal,
    pub order_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSales {
    pub id: Uuid,
    pub name: Option<String>,
    pub gross: Decimal,
    pub returns: Decimal,
    pub net: Decimal,
    pub order_count: u64,
}

/// Read-only rollups over orders and their settlement trail. Figures are
/// recomputed per call; returns and adjustment discounts both count
/// against gross.
#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Time-series sales in `[start, end]` inclusive. Every bucket the
    /// range touches appears in the output, zero-filled when no order
    /// landed in it, so chart series stay contiguous.
    #[instrument(skip(self))]
    pub async fn sales_summary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        bucket: TimeBucket,
    ) -> Result<Vec<SalesBucket>, ServiceError> {
        validate_range(start, end)?;
        let rows = self.order_figures(start, end).await?;
        Ok(build_buckets(start, end, bucket, &rows))
    }

    #[instrument(skip(self))]
    pub async fn sales_by_dsr(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DimensionSales>, ServiceError> {
        validate_range(start, end)?;
        let rows = self.order_figures(start, end).await?;
        let mut grouped = group_by_dimension(&rows, |row| row.dsr_id);

        let db = self.db_pool.as_ref();
        let dsrs = DsrEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let names: HashMap<Uuid, String> = dsrs.into_iter().map(|d| (d.id, d.name)).collect();
        for row in &mut grouped {
            row.name = names.get(&row.id).cloned();
        }
        Ok(grouped)
    }

    #[instrument(skip(self))]
    pub async fn sales_by_route(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DimensionSales>, ServiceError> {
        validate_range(start, end)?;
        let rows = self.order_figures(start, end).await?;
        let mut grouped = group_by_dimension(&rows, |row| row.route_id);

        let db = self.db_pool.as_ref();
        let routes = RouteEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let names: HashMap<Uuid, String> = routes.into_iter().map(|r| (r.id, r.name)).collect();
        for row in &mut grouped {
            row.name = names.get(&row.id).cloned();
        }
        Ok(grouped)
    }

    /// Per-product rollup over order lines: gross is the line net at
    /// creation, returns are attributed through the line they were
    /// recorded against.
    #[instrument(skip(self))]
    pub async fn sales_by_product(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DimensionSales>, ServiceError> {
        validate_range(start, end)?;
        let db = self.db_pool.as_ref();

        let orders = self.orders_in_range(start, end).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids.clone()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let returns = ItemReturnEntity::find()
            .filter(order_item_return::Column::OrderId.is_in(order_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut returned_by_item: HashMap<Uuid, Decimal> = HashMap::new();
        for ret in &returns {
            *returned_by_item.entry(ret.order_item_id).or_default() +=
                ret.return_amount + ret.adjustment_discount;
        }

        let mut by_product: BTreeMap<Uuid, DimensionSales> = BTreeMap::new();
        for item in &items {
            let entry = by_product.entry(item.product_id).or_insert(DimensionSales {
                id: item.product_id,
                name: None,
                gross: Decimal::ZERO,
                returns: Decimal::ZERO,
                net: Decimal::ZERO,
                order_count: 0,
            });
            let returned = returned_by_item
                .get(&item.id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            entry.gross += item.net;
            entry.returns += returned;
            entry.net += item.net - returned;
            entry.order_count += 1;
        }

        Ok(by_product.into_values().collect())
    }

    async fn orders_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        OrderEntity::find()
            .filter(order::Column::OrderDate.gte(range_start(start)))
            .filter(order::Column::OrderDate.lt(range_end_exclusive(end)))
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// One row per order: date, gross total, and the return + adjustment
    /// value recorded against it.
    async fn order_figures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OrderFigures>, ServiceError> {
        let db = self.db_pool.as_ref();
        let orders = self.orders_in_range(start, end).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

        let returns = ItemReturnEntity::find()
            .filter(order_item_return::Column::OrderId.is_in(order_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut returned_by_order: HashMap<Uuid, Decimal> = HashMap::new();
        for ret in &returns {
            *returned_by_order.entry(ret.order_id).or_default() +=
                ret.return_amount + ret.adjustment_discount;
        }

        Ok(orders
            .into_iter()
            .map(|o| OrderFigures {
                date: o.order_date.date_naive(),
                dsr_id: o.dsr_id,
                route_id: o.route_id,
                gross: o.total,
                returns: returned_by_order
                    .get(&o.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
struct OrderFigures {
    date: NaiveDate,
    dsr_id: Uuid,
    route_id: Uuid,
    gross: Decimal,
    returns: Decimal,
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if start > end {
        return Err(ServiceError::ValidationError(format!(
            "Range start {} is after end {}",
            start, end
        )));
    }
    Ok(())
}

fn range_start(start: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap_or_default())
}

fn range_end_exclusive(end: NaiveDate) -> DateTime<Utc> {
    let next = end.succ_opt().unwrap_or(end);
    Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Week numbering is day-of-year based, `(ordinal - 1) / 7 + 1`, so week 1
/// is always Jan 1-7 regardless of weekday.
fn bucket_label(date: NaiveDate, bucket: TimeBucket) -> String {
    match bucket {
        TimeBucket::Daily => date.format("%Y-%m-%d").to_string(),
        TimeBucket::Weekly => {
            let week = (date.ordinal() - 1) / 7 + 1;
            format!("{}-W{:02}", date.year(), week)
        }
        TimeBucket::Monthly => date.format("%Y-%m").to_string(),
    }
}

fn build_buckets(
    start: NaiveDate,
    end: NaiveDate,
    bucket: TimeBucket,
    rows: &[OrderFigures],
) -> Vec<SalesBucket> {
    // Seed every bucket the range touches; walking days and keying into a
    // BTreeMap both zero-fills gaps and collapses duplicate keys.
    let mut buckets: BTreeMap<String, SalesBucket> = BTreeMap::new();
    let mut day = start;
    while day <= end {
        let label = bucket_label(day, bucket);
        buckets.entry(label.clone()).or_insert(SalesBucket {
            label,
            gross: Decimal::ZERO,
            returns: Decimal::ZERO,
            net: Decimal::ZERO,
            order_count: 0,
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    for row in rows {
        let label = bucket_label(row.date, bucket);
        let entry = buckets.entry(label.clone()).or_insert(SalesBucket {
            label,
            gross: Decimal::ZERO,
            returns: Decimal::ZERO,
            net: Decimal::ZERO,
            order_count: 0,
        });
        entry.gross += row.gross;
        entry.returns += row.returns;
        entry.net += row.gross - row.returns;
        entry.order_count += 1;
    }

    buckets.into_values().collect()
}

fn group_by_dimension<F>(rows: &[OrderFigures], key: F) -> Vec<DimensionSales>
where
    F: Fn(&OrderFigures) -> Uuid,
{
    let mut grouped: BTreeMap<Uuid, DimensionSales> = BTreeMap::new();
    for row in rows {
        let id = key(row);
        let entry = grouped.entry(id).or_insert(DimensionSales {
            id,
            name: None,
            gross: Decimal::ZERO,
            returns: Decimal::ZERO,
            net: Decimal::ZERO,
            order_count: 0,
        });
        entry.gross += row.gross;
        entry.returns += row.returns;
        entry.net += row.gross - row.returns;
        entry.order_count += 1;
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn figures(date: NaiveDate, gross: Decimal, returns: Decimal) -> OrderFigures {
        OrderFigures {
            date,
            dsr_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            gross,
            returns,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_buckets_zero_fill_the_range() {
        let rows = vec![figures(day(2024, 3, 5), dec!(1000.00), dec!(0))];
        let buckets = build_buckets(day(2024, 3, 1), day(2024, 3, 7), TimeBucket::Daily, &rows);

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].label, "2024-03-01");
        assert_eq!(buckets[6].label, "2024-03-07");
        assert_eq!(buckets[4].label, "2024-03-05");
        assert_eq!(buckets[4].gross, dec!(1000.00));
        assert_eq!(buckets[4].order_count, 1);
        let zero_filled = buckets.iter().filter(|b| b.order_count == 0).count();
        assert_eq!(zero_filled, 6);
        for empty in buckets.iter().filter(|b| b.order_count == 0) {
            assert_eq!(empty.gross, Decimal::ZERO);
            assert_eq!(empty.net, Decimal::ZERO);
        }
    }

    #[test]
    fn returns_count_against_net() {
        let rows = vec![figures(day(2024, 3, 5), dec!(500.00), dec!(60.00))];
        let buckets = build_buckets(day(2024, 3, 5), day(2024, 3, 5), TimeBucket::Daily, &rows);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].gross, dec!(500.00));
        assert_eq!(buckets[0].returns, dec!(60.00));
        assert_eq!(buckets[0].net, dec!(440.00));
    }

    #[test]
    fn weekly_numbering_is_ordinal_based() {
        assert_eq!(bucket_label(day(2024, 1, 1), TimeBucket::Weekly), "2024-W01");
        assert_eq!(bucket_label(day(2024, 1, 7), TimeBucket::Weekly), "2024-W01");
        assert_eq!(bucket_label(day(2024, 1, 8), TimeBucket::Weekly), "2024-W02");
        // 2024-03-05 is day 65, week 10.
        assert_eq!(bucket_label(day(2024, 3, 5), TimeBucket::Weekly), "2024-W10");
    }

    #[test]
    fn monthly_buckets_collapse_days() {
        let rows = vec![
            figures(day(2024, 1, 3), dec!(100.00), dec!(0)),
            figures(day(2024, 1, 28), dec!(250.00), dec!(0)),
            figures(day(2024, 2, 2), dec!(75.00), dec!(0)),
        ];
        let buckets = build_buckets(day(2024, 1, 1), day(2024, 2, 29), TimeBucket::Monthly, &rows);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "2024-01");
        assert_eq!(buckets[0].gross, dec!(350.00));
        assert_eq!(buckets[0].order_count, 2);
        assert_eq!(buckets[1].label, "2024-02");
        assert_eq!(buckets[1].gross, dec!(75.00));
    }

    #[test]
    fn dimension_grouping_sums_per_key() {
        let dsr = Uuid::new_v4();
        let mut a = figures(day(2024, 3, 1), dec!(100.00), dec!(10.00));
        a.dsr_id = dsr;
        let mut b = figures(day(2024, 3, 2), dec!(200.00), dec!(0));
        b.dsr_id = dsr;
        let c = figures(day(2024, 3, 2), dec!(50.00), dec!(0));

        let grouped = group_by_dimension(&[a, b, c], |r| r.dsr_id);
        assert_eq!(grouped.len(), 2);
        let row = grouped.iter().find(|g| g.id == dsr).unwrap();
        assert_eq!(row.gross, dec!(300.00));
        assert_eq!(row.returns, dec!(10.00));
        assert_eq!(row.net, dec!(290.00));
        assert_eq!(row.order_count, 2);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(validate_range(day(2024, 3, 7), day(2024, 3, 1)).is_err());
    }
}
