//! Filter-formula builder for the Stackby list endpoint.
//!
//! Formulas are assembled as values and rendered to the API's textual syntax
//! in one place, so rendering is testable with no HTTP in the loop.

/// Pattern string handed to `DATETIME_PARSE`. Timestamps rendered into a
/// formula must be formatted to match it.
pub const DATETIME_PATTERN: &str = "YYYY-MM-DD HH:mm:ss";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// `IS_AFTER({field}, DATETIME_PARSE("timestamp", "pattern"))`
    IsAfter { field: String, timestamp: String },
    /// `AND(a, b, ...)`
    And(Vec<Formula>),
    /// A user-supplied formula, passed through verbatim.
    Raw(String),
}

impl Formula {
    pub fn is_after(field: &str, timestamp: &str) -> Self {
        Formula::IsAfter {
            field: field.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    pub fn raw(text: &str) -> Self {
        Formula::Raw(text.to_string())
    }

    /// Combine with another formula under `AND`. Flattens nested ANDs.
    pub fn and(self, other: Formula) -> Formula {
        match self {
            Formula::And(mut parts) => {
                parts.push(other);
                Formula::And(parts)
            }
            f => Formula::And(vec![f, other]),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Formula::IsAfter { field, timestamp } => format!(
                "IS_AFTER({{{}}}, DATETIME_PARSE(\"{}\", \"{}\"))",
                field, timestamp, DATETIME_PATTERN
            ),
            Formula::And(parts) => {
                let inner: Vec<String> = parts.iter().map(Formula::render).collect();
                format!("AND({})", inner.join(", "))
            }
            Formula::Raw(text) => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_after() {
        let f = Formula::is_after("Created", "2024-05-01 12:00:00");
        assert_eq!(
            f.render(),
            "IS_AFTER({Created}, DATETIME_PARSE(\"2024-05-01 12:00:00\", \"YYYY-MM-DD HH:mm:ss\"))"
        );
    }

    #[test]
    fn test_render_and_wrap() {
        let f = Formula::is_after("Created", "2024-05-01 12:00:00").and(Formula::raw("{Status} = 'Open'"));
        assert_eq!(
            f.render(),
            "AND(IS_AFTER({Created}, DATETIME_PARSE(\"2024-05-01 12:00:00\", \"YYYY-MM-DD HH:mm:ss\")), {Status} = 'Open')"
        );
    }

    #[test]
    fn test_and_flattens() {
        let f = Formula::raw("a").and(Formula::raw("b")).and(Formula::raw("c"));
        assert_eq!(f.render(), "AND(a, b, c)");
    }

    #[test]
    fn test_raw_passthrough() {
        assert_eq!(Formula::raw("NOT({Done})").render(), "NOT({Done})");
    }
}
