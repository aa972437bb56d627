pub mod column_change;
pub mod cost;
pub mod create_table;
pub mod plan;
pub mod reconciler;
