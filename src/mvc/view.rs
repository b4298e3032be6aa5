//! View rendering.
//!
//! # Responsibilities
//! - Load view files by name from the views directory
//! - Substitute `{{key}}` placeholders from params
//! - Wrap rendered views in a layout at `{{content}}`

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ViewConfig;
use crate::error::AppError;

/// Parameters substituted into a view.
pub type ViewParams = HashMap<String, String>;

const CONTENT_PLACEHOLDER: &str = "{{content}}";

/// Renders views and layouts from disk.
#[derive(Debug, Clone)]
pub struct ViewRenderer {
    views_path: PathBuf,
    layouts_path: PathBuf,
    default_layout: String,
    extension: String,
}

impl ViewRenderer {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            views_path: PathBuf::from(&config.views_path),
            layouts_path: PathBuf::from(&config.layouts_path),
            default_layout: config.default_layout.clone(),
            extension: config.extension.clone(),
        }
    }

    /// Render `view` inside `layout`, or the default layout when `layout`
    /// is `None` or empty.
    pub fn render(
        &self,
        view: &str,
        params: &ViewParams,
        layout: Option<&str>,
    ) -> Result<String, AppError> {
        let content = self.render_partial(view, params)?;

        let layout = layout
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_layout);
        let layout_file = self.file(&self.layouts_path, layout);
        let layout_source = read_template(&layout_file, layout, "Layout")?;

        Ok(layout_source.replace(CONTENT_PLACEHOLDER, &content))
    }

    /// Render `view` on its own, without a layout.
    pub fn render_partial(&self, view: &str, params: &ViewParams) -> Result<String, AppError> {
        let view_file = self.file(&self.views_path, view);
        let source = read_template(&view_file, view, "View")?;
        Ok(substitute(&source, params))
    }

    fn file(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{}", self.extension))
    }
}

fn read_template(path: &Path, name: &str, kind: &str) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => {
            AppError::NotFound(format!("{kind} file '{}' not found!", path.display()))
        }
        _ => AppError::View {
            view: name.to_string(),
            source,
        },
    })
}

/// Replace each `{{key}}` token found in `source` with its param.
///
/// Inserted values are never rescanned, and tokens without a param are kept.
fn substitute(source: &str, params: &ViewParams) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let token = &rest[start..];
        let Some(end) = token[2..].find("}}") else {
            rest = token;
            break;
        };
        let key = &token[2..2 + end];
        if key.contains("{{") {
            out.push_str("{{");
            rest = &token[2..];
            continue;
        }
        match params.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&token[..end + 4]),
        }
        rest = &token[end + 4..];
    }

    out.push_str(rest);
    out
}
