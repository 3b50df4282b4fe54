pub mod common;
pub mod match_gen;
pub mod motif_set;
pub mod tpm;
