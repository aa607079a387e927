pub mod acquire;
pub mod chain;
pub mod expiries;
pub mod logging;
pub mod market_hours;
pub mod offline;
pub mod plan;
pub mod run;
pub mod sink;
