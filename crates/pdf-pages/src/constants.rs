//! Shared constants for page management
//!
//! This module centralizes magic numbers used by the page model, the
//! reconstructor and the thumbnail controller.

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

/// Default page dimensions as tuple (width, height)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Thumbnails
// =============================================================================

/// Scale applied to a page's natural size when rendering a thumbnail
pub const THUMBNAIL_SCALE: f32 = 0.3;

/// Pointer travel (pixels) before a press on a thumbnail becomes a drag
pub const DRAG_ACTIVATION_DISTANCE: f32 = 8.0;

// =============================================================================
// Forms
// =============================================================================

/// Number of leading pages inspected when probing for form widgets
pub const FORM_PROBE_PAGES: u32 = 10;

// Field flag bits (PDF 32000-1, 12.7.3.1 and 12.7.4)
pub const FIELD_FLAG_READ_ONLY: i64 = 1 << 0;
pub const FIELD_FLAG_REQUIRED: i64 = 1 << 1;
pub const FIELD_FLAG_MULTILINE: i64 = 1 << 12;
pub const FIELD_FLAG_RADIO: i64 = 1 << 15;
pub const FIELD_FLAG_PUSHBUTTON: i64 = 1 << 16;
pub const FIELD_FLAG_MULTI_SELECT: i64 = 1 << 21;

// =============================================================================
// Export
// =============================================================================

/// File name prefix suggested for exported documents
pub const EXPORT_FILE_PREFIX: &str = "modified-document";

/// File name suggested for filled forms
pub const FORM_FILE_NAME: &str = "filled-form.pdf";
