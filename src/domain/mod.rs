pub mod aggregation;
pub mod approval;
pub mod hierarchy;
pub mod navigation;
pub mod punch;
