pub mod audit;
pub mod incentive;
pub mod sources;
