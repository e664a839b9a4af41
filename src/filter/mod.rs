//! Gene filtering: low-count removal before testing, significance tiers after

mod low_count;
mod significance;

pub use low_count::{filter_low_counts, DEFAULT_MIN_SAMPLES};
pub use significance::{significance_tiers, SignificanceTiers};
