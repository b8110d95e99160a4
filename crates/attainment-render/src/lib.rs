//! # attainment-render
//!
//! Attainment (达成度) workbook synthesis.
//!
//! This crate provides:
//! - The fixed column contract and formula builders (`layout`)
//! - Per-row cell planning for graded and special students (`plan`)
//! - The XLSX writer with statistics table (`excel`)
//! - Line and column chart binding (`charts`)
//!
//! ## Example
//!
//! ```rust
//! use attainment_core::{AttainmentConfig, Renderer, Scores, StudentRecord};
//! use attainment_render::AttainmentWorkbook;
//!
//! let records = vec![StudentRecord::graded(
//!     "软件2301",
//!     "2023001",
//!     "张三",
//!     Scores { regular_score: 80.0, final_score: 90.0, total_score: 87.0 },
//! )];
//! let renderer = AttainmentWorkbook::new(AttainmentConfig::default());
//! let xlsx_bytes = renderer.render(&records).unwrap();
//! assert!(!xlsx_bytes.is_empty());
//! ```

pub mod charts;
pub mod excel;
pub mod layout;
pub mod plan;

pub use excel::AttainmentWorkbook;
pub use layout::{CALC_SHEET, STATS_SHEET};
