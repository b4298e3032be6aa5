//! HTML helpers for views.
//!
//! # Data Flow
//! ```text
//! Form::new(action, method)
//!     → begin()                          <form ...>
//!     → field(model, errors, attribute)  label + input + invalid-feedback
//!     → end()                            </form>
//!
//! Table::new(columns).render(&records)   <table> header + one row per Record
//! ```
//!
//! # Design Decisions
//! - Helpers return strings; controllers pass them to views as params
//! - Field values come from `Validate::value`, feedback from `ValidationErrors`
//! - Output is escaped without double-escaping already sanitized input

pub mod form;
pub mod table;

pub use form::{Field, FieldKind, Form};
pub use table::Table;

/// Escape text for HTML content or a quoted attribute.
///
/// Numeric entities already present (request input is sanitized that way)
/// are kept as they are.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        match c {
            '&' if is_numeric_entity(&value[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn is_numeric_entity(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("&#") else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && rest.as_bytes().get(digits) == Some(&b';')
}
