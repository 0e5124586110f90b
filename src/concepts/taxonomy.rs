//! Transformation taxonomy used to bias concept diversity.

use serde::{Deserialize, Serialize};

/// Families of grid transformations a puzzle concept can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformationCategory {
    Geometric,
    Color,
    Spatial,
    Pattern,
    Logical,
    ObjectManipulation,
}

impl TransformationCategory {
    /// Returns all categories in prompt order.
    pub fn all() -> Vec<TransformationCategory> {
        vec![
            TransformationCategory::Geometric,
            TransformationCategory::Color,
            TransformationCategory::Spatial,
            TransformationCategory::Pattern,
            TransformationCategory::Logical,
            TransformationCategory::ObjectManipulation,
        ]
    }

    /// Returns the display name used in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            TransformationCategory::Geometric => "Geometric transformations",
            TransformationCategory::Color => "Color operations",
            TransformationCategory::Spatial => "Spatial reasoning",
            TransformationCategory::Pattern => "Pattern recognition",
            TransformationCategory::Logical => "Logical rules",
            TransformationCategory::ObjectManipulation => "Object manipulation",
        }
    }

    /// Returns the example operations listed next to the category in prompts.
    pub fn examples(&self) -> &'static str {
        match self {
            TransformationCategory::Geometric => "rotation, reflection, scaling",
            TransformationCategory::Color => "inversion, swapping, patterns",
            TransformationCategory::Spatial => "gravity, connectivity, symmetry",
            TransformationCategory::Pattern => "repeating, tiling, fractals",
            TransformationCategory::Logical => "if-then, counting, comparison",
            TransformationCategory::ObjectManipulation => "moving, copying, deleting",
        }
    }

    /// Renders the category as a prompt bullet.
    pub fn prompt_line(&self) -> String {
        format!("- {} ({})", self.display_name(), self.examples())
    }
}

impl std::fmt::Display for TransformationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
