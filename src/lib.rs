pub mod data_loader;
pub mod detector;
pub mod flight_log;
pub mod io;
pub mod pyramid;
pub mod tracker;
pub mod types;
