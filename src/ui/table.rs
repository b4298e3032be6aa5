//! Table rendering from records.

use rusqlite::types::Value;

use crate::db::Record;
use crate::ui::escape_html;

/// An HTML table showing selected columns of a list of records.
///
/// Columns are looked up among `Record::attributes`; an unknown column
/// renders empty cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    attributes: Vec<(String, String)>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            attributes: Vec::new(),
        }
    }

    /// Extra attribute on the `<table>` tag.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn render<R: Record>(&self, rows: &[R]) -> String {
        let mut html = String::from("<table");
        for (key, value) in &self.attributes {
            html.push_str(&format!(" {}=\"{}\"", escape_html(key), escape_html(value)));
        }
        html.push('>');

        html.push_str("<thead><tr>");
        for column in &self.columns {
            html.push_str(&format!("<th>{}</th>", escape_html(&capitalize(column))));
        }
        html.push_str("</tr></thead><tbody>");

        let positions: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|column| R::attributes().iter().position(|a| *a == column.as_str()))
            .collect();
        for row in rows {
            let values = row.values();
            html.push_str("<tr>");
            for position in &positions {
                let cell = position
                    .and_then(|i| values.get(i))
                    .map(cell_text)
                    .unwrap_or_default();
                html.push_str(&format!("<td>{}</td>", escape_html(&cell)));
            }
            html.push_str("</tr>");
        }

        html.push_str("</tbody></table>");
        html
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Blob(_) => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Row;

    struct Product {
        name: String,
        price: f64,
        stock: Option<i64>,
    }

    impl Record for Product {
        fn table_name() -> &'static str {
            "products"
        }

        fn attributes() -> &'static [&'static str] {
            &["name", "price", "stock"]
        }

        fn values(&self) -> Vec<Value> {
            vec![
                Value::Text(self.name.clone()),
                Value::Real(self.price),
                self.stock.map_or(Value::Null, Value::Integer),
            ]
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                name: row.get("name")?,
                price: row.get("price")?,
                stock: row.get("stock")?,
            })
        }
    }

    #[test]
    fn test_render_rows() {
        let rows = vec![
            Product {
                name: "Tea & Co".into(),
                price: 2.5,
                stock: Some(10),
            },
            Product {
                name: "Mug".into(),
                price: 8.0,
                stock: None,
            },
        ];

        let html = Table::new(["name", "stock"])
            .attribute("class", "table")
            .render(&rows);
        assert_eq!(
            html,
            "<table class=\"table\"><thead><tr><th>Name</th><th>Stock</th></tr></thead>\
             <tbody><tr><td>Tea &amp; Co</td><td>10</td></tr><tr><td>Mug</td><td></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_unknown_column_and_no_rows() {
        let html = Table::new(["missing"]).render::<Product>(&[]);
        assert_eq!(
            html,
            "<table><thead><tr><th>Missing</th></tr></thead><tbody></tbody></table>"
        );

        let row = Product {
            name: "Mug".into(),
            price: 8.0,
            stock: None,
        };
        let html = Table::new(["price", "missing"]).render(&[row]);
        assert!(html.contains("<tr><td>8</td><td></td></tr>"));
    }
}
