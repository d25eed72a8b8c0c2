//! Property tests for placeholder resolution.

use proptest::prelude::*;
use rest_workbench::variables::resolve;
use std::collections::HashMap;

fn var_name() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,12}"
}

fn plain_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 /:._-]{0,20}"
}

proptest! {
    #[test]
    fn test_empty_variables_leave_text_unchanged(text in ".*") {
        prop_assert_eq!(resolve(&text, &HashMap::new()), text);
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged(
        text in "[^{}]*",
        name in var_name(),
        value in plain_value(),
    ) {
        let vars = HashMap::from([(name, value)]);
        prop_assert_eq!(resolve(&text, &vars), text);
    }

    #[test]
    fn test_whitespace_inside_braces_is_ignored(
        name in var_name(),
        value in plain_value(),
        left in " {0,3}",
        right in " {0,3}",
    ) {
        let vars = HashMap::from([(name.clone(), value)]);
        let spaced = format!("{{{{{}{}{}}}}}", left, name, right);
        let tight = format!("{{{{{}}}}}", name);
        prop_assert_eq!(resolve(&spaced, &vars), resolve(&tight, &vars));
    }

    #[test]
    fn test_known_placeholders_are_fully_substituted(
        a in plain_value(),
        b in plain_value(),
    ) {
        let vars = HashMap::from([
            ("A".to_string(), a.clone()),
            ("B".to_string(), b.clone()),
        ]);
        prop_assert_eq!(resolve("{{A}}-{{B}}", &vars), format!("{}-{}", a, b));
    }

    #[test]
    fn test_unknown_placeholders_are_kept_verbatim(
        a in plain_value(),
        unknown in "[A-Z]{3,8}_MISSING",
    ) {
        let vars = HashMap::from([("A".to_string(), a.clone())]);
        let text = format!("{{{{A}}}}/{{{{{}}}}}", unknown);
        prop_assert_eq!(resolve(&text, &vars), format!("{}/{{{{{}}}}}", a, unknown));
    }
}

#[test]
fn test_empty_value_removes_placeholder() {
    let vars = HashMap::from([("EMPTY".to_string(), String::new())]);
    assert_eq!(resolve("x{{EMPTY}}y", &vars), "xy");
}
