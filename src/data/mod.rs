//! Input data structures shared by every contrast of a run

mod contrast;
mod count_matrix;
mod sample_sheet;
mod subset;

pub use contrast::Contrast;
pub use count_matrix::CountMatrix;
pub use sample_sheet::SampleSheet;
pub use subset::{subset_for_contrast, ContrastSubset};
