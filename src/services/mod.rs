pub mod analytics;
pub mod damage_returns;
pub mod orders;
pub mod settlement;
pub mod stock_adjustments;
pub mod stock_batches;
pub mod units;
