//! Structural equality between value nodes, possibly of different documents.
//!
//! Rules:
//! - object members are compared by name, ignoring order (recursively)
//! - array elements are compared position by position
//! - strings compare decoded content, numbers compare numerically
//! - formatting and comments never matter

use super::{Document, NodeId, NodeKind};

pub fn values_equal(a: &Document, a_id: NodeId, b: &Document, b_id: NodeId) -> bool {
    let kind = a.kind(a_id);
    if kind != b.kind(b_id) {
        return false;
    }

    match kind {
        NodeKind::Object => {
            let a_members = a.entries(a_id);
            let b_members = b.entries(b_id);
            if a_members.len() != b_members.len() {
                return false;
            }
            a_members.iter().all(|(name, a_value)| {
                b_members
                    .iter()
                    .find(|(other, _)| other == name)
                    .is_some_and(|(_, b_value)| values_equal(a, *a_value, b, *b_value))
            })
        }
        NodeKind::Array => {
            let a_items = a.elements(a_id);
            let b_items = b.elements(b_id);
            a_items.len() == b_items.len()
                && a_items
                    .iter()
                    .zip(&b_items)
                    .all(|(x, y)| values_equal(a, *x, b, *y))
        }
        NodeKind::String => a.as_str(a_id) == b.as_str(b_id),
        NodeKind::Number => match (a.as_f64(a_id), b.as_f64(b_id)) {
            (Some(x), Some(y)) => x == y,
            _ => a.raw(a_id) == b.raw(b_id),
        },
        NodeKind::Boolean | NodeKind::Null => a.raw(a_id) == b.raw(b_id),
        NodeKind::Root | NodeKind::Key | NodeKind::Punct | NodeKind::Trivia => false,
    }
}

/// Equality of possibly-missing fields: two missing fields are equal, a missing
/// and a present one are not.
pub fn optional_values_equal(a: &Document, a_id: Option<NodeId>, b: &Document, b_id: Option<NodeId>) -> bool {
    match (a_id, b_id) {
        (None, None) => true,
        (Some(x), Some(y)) => values_equal(a, x, b, y),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(x: &str, y: &str) -> bool {
        let a = Document::parse(x).unwrap();
        let b = Document::parse(y).unwrap();
        values_equal(&a, a.root_value().unwrap(), &b, b.root_value().unwrap())
    }

    #[test]
    fn object_member_order_is_ignored() {
        assert!(eq(r#"{"a": 1, "b": {"x": [1, 2], "y": null}}"#, r#"{ "b": {"y": null, "x": [1,2]}, /* c */ "a": 1 }"#));
    }

    #[test]
    fn array_order_matters() {
        assert!(!eq("[1, 2]", "[2, 1]"));
        assert!(!eq("[1, 2]", "[1, 2, 3]"));
    }

    #[test]
    fn scalars_are_exact() {
        assert!(eq("1.0", "1"));
        assert!(eq(r#""A""#, r#""A""#));
        assert!(!eq(r#""1""#, "1"));
        assert!(!eq("true", "false"));
        assert!(!eq(r#"{"a": 1}"#, r#"{"a": 1, "b": 2}"#));
        assert!(!eq(r#"{"a": 1}"#, r#"{"b": 1}"#));
    }

    #[test]
    fn missing_fields() {
        let a = Document::parse(r#"{"a": 1}"#).unwrap();
        let root = a.root_value().unwrap();
        assert!(optional_values_equal(&a, None, &a, None));
        assert!(!optional_values_equal(&a, a.get(root, "a"), &a, None));
        assert!(optional_values_equal(&a, a.get(root, "a"), &a, a.get(root, "a")));
    }
}
