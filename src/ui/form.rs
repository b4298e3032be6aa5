//! Form and field rendering.

use std::fmt;

use crate::ui::escape_html;
use crate::validation::{Validate, ValidationErrors};

/// Opening and closing tags of an HTML form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    action: String,
    method: String,
    options: Vec<(String, String)>,
}

impl Form {
    pub fn new(action: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            options: Vec::new(),
        }
    }

    /// Extra attribute on the `<form>` tag, e.g. `("enctype", "multipart/form-data")`.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn begin(&self) -> String {
        let mut html = format!(
            "<form action=\"{}\" method=\"{}\"",
            escape_html(&self.action),
            escape_html(&self.method)
        );
        for (key, value) in &self.options {
            html.push_str(&format!(" {}=\"{}\"", escape_html(key), escape_html(value)));
        }
        html.push('>');
        html
    }

    pub fn end(&self) -> &'static str {
        "</form>"
    }

    pub fn field<'a, M: Validate + ?Sized>(
        &self,
        model: &'a M,
        errors: &'a ValidationErrors,
        attribute: &'a str,
    ) -> Field<'a, M> {
        Field::new(model, errors, attribute)
    }
}

/// How a [`Field`] renders its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    File,
    Textarea,
}

/// A labelled input bound to one model attribute.
///
/// Renders through `Display`: the label, the input (marked `is-invalid`
/// when the attribute has errors) and the first error message.
pub struct Field<'a, M: ?Sized> {
    model: &'a M,
    errors: &'a ValidationErrors,
    attribute: &'a str,
    kind: FieldKind,
}

impl<'a, M: Validate + ?Sized> Field<'a, M> {
    pub fn new(model: &'a M, errors: &'a ValidationErrors, attribute: &'a str) -> Self {
        Self {
            model,
            errors,
            attribute,
            kind: FieldKind::Text,
        }
    }

    pub fn password(mut self) -> Self {
        self.kind = FieldKind::Password;
        self
    }

    pub fn file(mut self) -> Self {
        self.kind = FieldKind::File;
        self
    }

    pub fn textarea(mut self) -> Self {
        self.kind = FieldKind::Textarea;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The input element alone.
    pub fn render_input(&self) -> String {
        let class = if self.errors.has_error(self.attribute) {
            "form-control is-invalid"
        } else {
            "form-control"
        };
        let name = escape_html(self.attribute);
        let value = escape_html(&self.model.value(self.attribute).unwrap_or_default());

        match self.kind {
            FieldKind::Textarea => {
                format!("<textarea class=\"{class}\" name=\"{name}\">{value}</textarea>")
            }
            kind => {
                let input_type = match kind {
                    FieldKind::Password => "password",
                    FieldKind::File => "file",
                    _ => "text",
                };
                format!("<input type=\"{input_type}\" class=\"{class}\" name=\"{name}\" value=\"{value}\">")
            }
        }
    }
}

impl<M: Validate + ?Sized> fmt::Display for Field<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let feedback = self.errors.first_error(self.attribute).unwrap_or_default();
        write!(
            f,
            "<div class=\"form-group\"><label>{}</label>{}<div class=\"invalid-feedback\">{}</div></div>",
            escape_html(&self.model.label(self.attribute)),
            self.render_input(),
            escape_html(feedback)
        )
    }
}
