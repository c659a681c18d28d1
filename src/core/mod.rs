pub mod period;
pub mod timeseries;
pub mod orchestrator;
