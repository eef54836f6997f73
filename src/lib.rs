// Spooltier write-behind cache library

pub mod cache;
pub mod config;
pub mod logging;
