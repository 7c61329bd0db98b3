use crate::constants::*;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Page-manager configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageManagerOptions {
    // Thumbnails
    pub thumbnail_scale: f32,
    pub drag_threshold_px: f32,

    // Reconstruction
    /// Size of a blank page with no preceding page, in points
    pub default_page_size_pt: (f32, f32),

    // Output naming
    pub export_file_prefix: String,
    pub form_file_name: String,
}

impl Default for PageManagerOptions {
    fn default() -> Self {
        Self {
            thumbnail_scale: THUMBNAIL_SCALE,
            drag_threshold_px: DRAG_ACTIVATION_DISTANCE,
            default_page_size_pt: DEFAULT_PAGE_DIMENSIONS,
            export_file_prefix: EXPORT_FILE_PREFIX.to_string(),
            form_file_name: FORM_FILE_NAME.to_string(),
        }
    }
}

impl PageManagerOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)
            .map_err(|e| PagesError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PagesError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !(self.thumbnail_scale > 0.0 && self.thumbnail_scale.is_finite()) {
            return Err(PagesError::Config(format!(
                "Thumbnail scale must be positive, got {}",
                self.thumbnail_scale
            )));
        }

        if !(self.drag_threshold_px >= 0.0 && self.drag_threshold_px.is_finite()) {
            return Err(PagesError::Config(format!(
                "Drag threshold must be non-negative, got {}",
                self.drag_threshold_px
            )));
        }

        let (width, height) = self.default_page_size_pt;
        if !(width > 0.0 && height > 0.0) {
            return Err(PagesError::Config(format!(
                "Default page size must be positive, got {}x{}",
                width, height
            )));
        }

        if self.export_file_prefix.trim().is_empty() {
            return Err(PagesError::Config(
                "Export file prefix must not be empty".to_string(),
            ));
        }

        if self.form_file_name.trim().is_empty() {
            return Err(PagesError::Config(
                "Form file name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
