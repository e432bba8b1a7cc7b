//! Key/value extraction from free-text order bodies.
//!
//! A line is a field iff it contains `:`. The key is the trimmed text before
//! the first `:`, the value is the trimmed remainder (which may contain more
//! colons, e.g. times or URLs).

use crate::model::metadata::MetadataField;

/// Extract `key: value` fields from body text, in order of appearance.
///
/// Lines without a separator, and lines whose key is blank, are skipped.
/// Duplicate keys are all kept.
pub fn extract(body_text: &str) -> Vec<MetadataField> {
    body_text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<MetadataField> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some(MetadataField::new(key, value.trim()))
}

/// Combine body-derived fields with caller-supplied ones.
///
/// Body order is kept. A supplied field overrides the value of every body
/// field with the same key; supplied keys the body does not mention are
/// appended in the order given.
pub fn merge_fields(body: &[MetadataField], supplied: &[MetadataField]) -> Vec<MetadataField> {
    let mut merged: Vec<MetadataField> = body
        .iter()
        .map(|field| match supplied.iter().rev().find(|s| s.key == field.key) {
            Some(over) => MetadataField::new(field.key.clone(), over.value.clone()),
            None => field.clone(),
        })
        .collect();

    for field in supplied {
        if !merged.iter().any(|m| m.key == field.key) {
            merged.push(field.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(fields: &[MetadataField]) -> Vec<(&str, &str)> {
        fields
            .iter()
            .map(|f| (f.key.as_str(), f.value.as_str()))
            .collect()
    }

    #[test]
    fn test_extract_basic() {
        let fields = extract("Amount: $500\nCurrency: USD");
        assert_eq!(pairs(&fields), vec![("Amount", "$500"), ("Currency", "USD")]);
    }

    #[test]
    fn test_extract_value_keeps_later_colons() {
        let fields = extract("Delivery: 10:30 at https://example.com/x\r\n");
        assert_eq!(
            pairs(&fields),
            vec![("Delivery", "10:30 at https://example.com/x")]
        );
    }

    #[test]
    fn test_extract_ignores_lines_without_separator() {
        let fields = extract("Hello team,\n\n  Order : ORD-1  \nThanks\n: orphan value");
        assert_eq!(pairs(&fields), vec![("Order", "ORD-1")]);
    }

    #[test]
    fn test_extract_is_idempotent_and_keeps_duplicates() {
        let body = "A: 1\nB: 2\nA: 3";
        let first = extract(body);
        assert_eq!(first, extract(body));
        assert_eq!(pairs(&first), vec![("A", "1"), ("B", "2"), ("A", "3")]);
    }

    #[test]
    fn test_extract_empty() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_merge_supplied_takes_precedence() {
        let body = extract("Amount: $500\nCurrency: USD");
        let supplied = vec![
            MetadataField::new("Currency", "EUR"),
            MetadataField::new("Buyer", "ACME"),
        ];
        let merged = merge_fields(&body, &supplied);
        assert_eq!(
            pairs(&merged),
            vec![("Amount", "$500"), ("Currency", "EUR"), ("Buyer", "ACME")]
        );
    }

    #[test]
    fn test_merge_without_body_fields() {
        let supplied = vec![MetadataField::new("K", "V")];
        assert_eq!(merge_fields(&[], &supplied), supplied);
        assert!(merge_fields(&[], &[]).is_empty());
    }
}
