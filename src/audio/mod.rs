pub mod device;
pub mod engine;
pub mod jack;
pub mod params;
pub mod ports;
pub mod processor;
pub mod status;
