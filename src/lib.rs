//! PDF Templater Library
//!
//! Assembles one report PDF from three segments:
//! - a cover page whose form fields are filled and flattened
//! - body pages rendered from paragraphs, each overlaid with a template page
//! - an end page appended verbatim
//!
//! Segment boundaries are recorded as pages are appended, and a
//! page-completion hook decides per page whether the overlay applies.
//!
//! # Example
//!
//! ```no_run
//! use pdf_templater::assembler::DocumentInfo;
//! use pdf_templater::report::{build_report, ReportOptions};
//! use std::path::PathBuf;
//!
//! let options = ReportOptions::new(
//!     DocumentInfo::new("Quarterly report", "Ada"),
//!     PathBuf::from("Portada.pdf").into(),
//!     PathBuf::from("EndPage.pdf").into(),
//!     PathBuf::from("TemplateInfo.pdf").into(),
//! );
//!
//! let report = build_report(&options).expect("Failed to assemble report");
//! std::fs::write("GeneratedReport.pdf", &report.bytes).unwrap();
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod events;
pub mod layout;
pub mod pdf;
pub mod policy;
pub mod report;

// Re-export commonly used items
pub use error::{Error, Result};
pub use report::{build_report, Report, ReportOptions};
