//! Normalization of RNA-seq count data

mod counts;

pub use counts::cpm;
