//! Treatment-vs-control group comparisons

use std::fmt;

use serde::{Deserialize, Serialize};

/// One treatment-vs-control comparison between two sample groups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contrast {
    /// Treatment group (numerator of the fold change)
    pub treatment: String,
    /// Control group (denominator of the fold change)
    pub control: String,
}

impl Contrast {
    pub fn new(treatment: impl Into<String>, control: impl Into<String>) -> Self {
        Self {
            treatment: treatment.into(),
            control: control.into(),
        }
    }

    /// Directory name for this contrast: `{treatment}__vs__{control}`
    pub fn label(&self) -> String {
        format!("{}__vs__{}", self.treatment, self.control)
    }
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.treatment, self.control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let contrast = Contrast::new("drug", "placebo");
        assert_eq!(contrast.label(), "drug__vs__placebo");
        assert_eq!(contrast.to_string(), "drug vs placebo");
    }
}
