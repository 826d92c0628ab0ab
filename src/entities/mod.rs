pub mod audit_log;
pub mod damage_return;
pub mod damage_return_item;
pub mod dsr;
pub mod order;
pub mod order_customer_due;
pub mod order_dsr_due;
pub mod order_expense;
pub mod order_item;
pub mod order_item_return;
pub mod order_payment;
pub mod product_variant;
pub mod route;
pub mod stock_adjustment;
pub mod stock_batch;
pub mod supplier_purchase;
pub mod unit;
