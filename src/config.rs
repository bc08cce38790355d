//! TOML report configuration
//!
//! ```toml
//! [document]
//! title = "El título del PDF"
//! author = "Hernán"
//!
//! [segments]
//! cover = "Portada.pdf"
//! end = "EndPage.pdf"
//! overlay = "TemplateInfo.pdf"
//!
//! [cover_fields]
//! employeeName = "Hernán Darío"
//!
//! [body]
//! repeat = 150
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Deserialize;

use crate::assembler::DocumentInfo;
use crate::error::{Error, Result};
use crate::pdf::body::{BodyStyle, SAMPLE_PARAGRAPH, SAMPLE_REPEAT};
use crate::pdf::overlay::OverlayPlacement;
use crate::pdf::source::DocumentSource;
use crate::report::ReportOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub document: DocumentConfig,
    pub segments: SegmentsConfig,
    #[serde(default)]
    pub cover_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub body: BodyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub creator: Option<String>,
}

/// Paths of the three external documents
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentsConfig {
    pub cover: PathBuf,
    pub end: PathBuf,
    pub overlay: PathBuf,
    #[serde(default)]
    pub placement: OverlayPlacement,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BodyConfig {
    /// Explicit paragraphs; when empty `paragraph` is repeated instead
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default = "default_paragraph")]
    pub paragraph: String,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

fn default_paragraph() -> String {
    SAMPLE_PARAGRAPH.to_string()
}

fn default_repeat() -> usize {
    SAMPLE_REPEAT
}

fn default_font_size() -> f32 {
    12.0
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            paragraph: default_paragraph(),
            repeat: default_repeat(),
            font_size: default_font_size(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config = Self::parse(&content)?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        if !(config.body.font_size > 0.0) {
            return Err(Error::Config(format!(
                "body.font_size must be positive, got {}",
                config.body.font_size
            )));
        }
        Ok(config)
    }

    /// Build report options, resolving relative segment paths against
    /// `base_dir`
    pub fn into_options(self, base_dir: &Path) -> ReportOptions {
        let resolve = |path: PathBuf| -> DocumentSource {
            if path.is_absolute() {
                path.into()
            } else {
                base_dir.join(path).into()
            }
        };

        let paragraphs = if self.body.paragraphs.is_empty() {
            vec![self.body.paragraph; self.body.repeat]
        } else {
            self.body.paragraphs
        };

        ReportOptions {
            info: DocumentInfo {
                title: self.document.title,
                author: self.document.author,
                creator: self.document.creator,
            },
            cover: resolve(self.segments.cover),
            cover_fields: self.cover_fields,
            end: resolve(self.segments.end),
            overlay: resolve(self.segments.overlay),
            placement: self.segments.placement,
            paragraphs,
            body_style: BodyStyle::with_font_size(self.body.font_size),
        }
    }
}

/// Read a configuration file into report options
pub fn load_options(path: &Path) -> Result<ReportOptions> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(ReportConfig::from_file(path)?.into_options(base_dir))
}
