pub mod catalog_lookup;
pub mod localization;
pub mod orchestrator;
pub mod pricing;
pub mod queue;
pub mod rates;
pub mod tracker;
pub mod translation;
pub mod worker;
