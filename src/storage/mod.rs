pub mod device;
pub mod fileio;
pub mod swap;
