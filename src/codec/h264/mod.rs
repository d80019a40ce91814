//! # H.264 NAL classification
//!
//! Decodes the single header byte every NAL unit starts with, tells header
//! units (SEI, SPS, PPS) apart from frame content, and exposes an
//! [`Observer`] hook for diagnostics.
//!
//! ```rust
//! use nalrelay::codec::h264::classify;
//!
//! let header = classify(0x67);
//! assert_eq!(header.nal_type, 7); // SPS
//! assert_eq!(header.nal_ref_idc, 3);
//! assert!(header.is_header());
//! ```

/// Classifier and diagnostic observers
pub mod classify;
/// NAL header and unit type definitions
pub mod types;

#[doc(inline)]
pub use classify::*;
#[doc(inline)]
pub use types::*;
