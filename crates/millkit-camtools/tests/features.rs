#[path = "features/config.rs"]
mod config;
#[path = "features/connector.rs"]
mod connector;
#[path = "features/inverse.rs"]
mod inverse;
#[path = "features/round_trip.rs"]
mod round_trip;
#[path = "features/sorting.rs"]
mod sorting;
