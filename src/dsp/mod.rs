pub mod chain;
pub mod format;
pub mod stages;
