use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "koreader_converter.toml";

const DEFAULT_FILENAME_TEMPLATE: &str = "{timestamp}.md";
const DEFAULT_YAML_FRONTMATTER: &str = "---
tags: [buch, gelesen, highlights]
title: {title}
author: {lastname}, {firstname}
rating: {rating}
note: {note}
date_created: {date_created}
date_updated: {date_updated}
---

";
const DEFAULT_INTRO: &str = "Highlights für das Buch {title} von {firstname} {lastname}";
const DEFAULT_SUMMARY_NOTE: &str = "> {note}";
const DEFAULT_HIGHLIGHT: &str = "> {text}";
const DEFAULT_ANNOTATION: &str = "Eigener Gedanke{page}: {annotation}{time}";
const DEFAULT_SEPARATOR: &str = "---";

/// Output naming and section templates, shared by every file of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub output: OutputSettings,
    pub templates: Templates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub filename_template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    pub yaml_frontmatter: String,
    pub intro: String,
    pub summary_note: String,
    pub highlight: String,
    pub annotation: String,
    pub separator: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            output: OutputSettings {
                filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            },
            templates: Templates {
                yaml_frontmatter: DEFAULT_YAML_FRONTMATTER.to_string(),
                intro: DEFAULT_INTRO.to_string(),
                summary_note: DEFAULT_SUMMARY_NOTE.to_string(),
                highlight: DEFAULT_HIGHLIGHT.to_string(),
                annotation: DEFAULT_ANNOTATION.to_string(),
                separator: DEFAULT_SEPARATOR.to_string(),
            },
        }
    }
}

// Every key is optional so a file can override a single template.
#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    output: OutputOverrides,
    #[serde(default)]
    templates: TemplateOverrides,
}

#[derive(Deserialize, Default)]
struct OutputOverrides {
    filename_template: Option<String>,
}

#[derive(Deserialize, Default)]
struct TemplateOverrides {
    yaml_frontmatter: Option<String>,
    intro: Option<String>,
    summary_note: Option<String>,
    highlight: Option<String>,
    annotation: Option<String>,
    separator: Option<String>,
}

impl RenderConfig {
    /// Load overrides from `path`. A missing, unreadable or malformed file
    /// yields the built-in defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config file found at {}, using defaults", path.display());
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read config from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_toml(&content) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(content)?;
        Ok(Self::default().merge(file))
    }

    fn merge(mut self, file: FileConfig) -> Self {
        fn apply(target: &mut String, value: Option<String>) {
            if let Some(v) = value {
                *target = v;
            }
        }

        apply(&mut self.output.filename_template, file.output.filename_template);

        let t = file.templates;
        apply(&mut self.templates.yaml_frontmatter, t.yaml_frontmatter);
        apply(&mut self.templates.intro, t.intro);
        apply(&mut self.templates.summary_note, t.summary_note);
        apply(&mut self.templates.highlight, t.highlight);
        apply(&mut self.templates.annotation, t.annotation);
        apply(&mut self.templates.separator, t.separator);

        self
    }
}
