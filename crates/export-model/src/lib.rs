//! Recast Export Model
//!
//! Defines the data contract between the editor's settings panels and the
//! export core:
//! - **Options:** Container, codecs, resolution, rate control, trim range,
//!   enhancement toggles
//! - **Watermark:** Image bytes plus an anchor/offset placement model
//! - **GIF:** Palette and looping parameters used only for GIF exports
//!
//! A [`ProcessingOptions`] value is built once per export and never mutated
//! by the core. Field names serialize in camelCase to match the UI's JSON.

pub mod gif;
pub mod options;
pub mod watermark;

pub use gif::*;
pub use options::*;
pub use watermark::*;
