pub mod config;
pub mod free_positions;
pub mod motif;
pub mod running_stats;
