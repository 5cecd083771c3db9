use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Window planning configuration.
///
/// The window duration is the only lever the caller has to keep per-window record
/// volume below `page_size * max_offset_pages`; intervals that exceed that product
/// are silently truncated by the source's pagination ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WindowConfig {
    /// Duration of each extraction window, in hours.
    #[serde(default = "default_window_hours")]
    pub hours: u32,
}

impl WindowConfig {
    /// Default window duration in hours.
    pub const DEFAULT_HOURS: u32 = 6;

    /// Validates window planning settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hours == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "window.hours".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            hours: default_window_hours(),
        }
    }
}

fn default_window_hours() -> u32 {
    WindowConfig::DEFAULT_HOURS
}

/// Offset pagination limits imposed by the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageConfig {
    /// Maximum number of records returned per call.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Maximum number of offset pages the source will honor per query shape.
    #[serde(default = "default_max_offset_pages")]
    pub max_offset_pages: usize,
}

impl PageConfig {
    /// Default per-call result cap.
    pub const DEFAULT_PAGE_SIZE: usize = 1000;

    /// Default pagination ceiling, in pages.
    pub const DEFAULT_MAX_OFFSET_PAGES: usize = 5;

    /// Maximum number of records retrievable from a single window.
    pub fn max_records_per_window(&self) -> usize {
        self.page_size.saturating_mul(self.max_offset_pages)
    }

    /// Validates pagination settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "page.page_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.max_offset_pages == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "page.max_offset_pages".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_offset_pages: default_max_offset_pages(),
        }
    }
}

fn default_page_size() -> usize {
    PageConfig::DEFAULT_PAGE_SIZE
}

fn default_max_offset_pages() -> usize {
    PageConfig::DEFAULT_MAX_OFFSET_PAGES
}
