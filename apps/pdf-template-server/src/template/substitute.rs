//! Placeholder substitution
//!
//! Values are inserted verbatim. A value that itself contains `{{other}}`
//! can be replaced by a later entry in the same pass, so the result depends
//! on the order of the field values.

use indexmap::IndexMap;

/// Field values keyed by placeholder name, in the order the client sent them.
pub type FieldValues = IndexMap<String, String>;

/// Replace every `{{name}}` occurrence for each entry in `values`.
///
/// Placeholders without a value are left as they are; keys that match no
/// placeholder are ignored.
pub fn substitute(text: &str, values: &FieldValues) -> String {
    let mut result = text.to_string();

    for (name, value) in values {
        let marker = format!("{{{{{}}}}}", name);
        if result.contains(&marker) {
            result = result.replace(&marker, value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_all_occurrences() {
        let text = "Hello {{name}}, you owe {{amount}}. Bye {{name}}.";
        let out = substitute(text, &values(&[("name", "Ann"), ("amount", "$5")]));
        assert_eq!(out, "Hello Ann, you owe $5. Bye Ann.");
    }

    #[test]
    fn test_substitute_empty_mapping() {
        let text = "Hello {{name}}";
        assert_eq!(substitute(text, &FieldValues::new()), text);
    }

    #[test]
    fn test_substitute_unknown_key() {
        let text = "Hello {{name}}";
        assert_eq!(substitute(text, &values(&[("other", "x")])), text);
    }

    #[test]
    fn test_substitute_missing_value_left_in_place() {
        let out = substitute("{{a}} and {{b}}", &values(&[("a", "1")]));
        assert_eq!(out, "1 and {{b}}");
    }

    #[test]
    fn test_substitute_idempotent() {
        let vals = values(&[("name", "Ann"), ("amount", "$5")]);
        let once = substitute("Hello {{name}}, {{amount}} {{missing}}", &vals);
        let twice = substitute(&once, &vals);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_substitute_empty_name() {
        assert_eq!(substitute("x{{}}y", &values(&[("", "-")])), "x-y");
    }

    #[test]
    fn test_substitute_is_order_dependent() {
        let text = "{{a}}";
        let forward = substitute(text, &values(&[("a", "{{b}}"), ("b", "B")]));
        assert_eq!(forward, "B");

        let backward = substitute(text, &values(&[("b", "B"), ("a", "{{b}}")]));
        assert_eq!(backward, "{{b}}");
    }
}
