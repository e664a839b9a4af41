//! Input/Output for DGE runs

mod csv;
mod results;
mod writer;

pub use self::csv::{
    format_optional_f64, parse_optional_f64, read_contrasts, read_count_matrix,
    read_matrix, read_sample_sheet, write_count_matrix, DelimitedTable, GENE_ID_COLUMN, MISSING_VALUE,
};
pub use results::{DeRecord, DeTable, ResultsSummary};
pub use writer::{tier_tags, ContrastOutput, RESULT_COLUMNS};
