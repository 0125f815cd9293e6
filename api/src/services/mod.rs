pub mod aggregator;
pub mod aqi;
pub mod dashboard;
pub mod locations;
pub mod summary;
pub mod upstream;
pub mod view_state;
