//! Common KiCad-ish S-expression query helpers.
//!
//! Many KiCad nodes behave like key/value properties: `(tag "value")`,
//! `(tag 123)`, `(tag yes)`, `(at x y rot)`. These helpers standardize querying
//! them and rewriting them in place.

use crate::{Sexpr, find_child_list, find_child_list_mut, number_as_f64};

/// Find a direct child list `(tag ...)` within `list`.
pub fn child_list<'a>(list: &'a [Sexpr], tag: &str) -> Option<&'a [Sexpr]> {
    find_child_list(list, tag)
}

/// Find a string property `(tag "VALUE")` within `list`.
pub fn string_prop(list: &[Sexpr], tag: &str) -> Option<String> {
    child_list(list, tag)?
        .get(1)?
        .as_str()
        .map(|s| s.to_string())
}

/// Find a symbol atom property `(tag VALUE)` within `list`.
pub fn sym_prop(list: &[Sexpr], tag: &str) -> Option<String> {
    child_list(list, tag)?
        .get(1)?
        .as_sym()
        .map(|s| s.to_string())
}

/// Find a boolean property that is represented as `(tag yes)` or `(tag no)`.
pub fn yes_no_prop(list: &[Sexpr], tag: &str) -> Option<bool> {
    match sym_prop(list, tag)?.as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Find an integer property `(tag 123)` within `list`.
pub fn int_prop(list: &[Sexpr], tag: &str) -> Option<i64> {
    child_list(list, tag)?.get(1)?.as_int()
}

/// Find a numeric property `(tag 1.27)` within `list`, accepting ints.
pub fn number_prop(list: &[Sexpr], tag: &str) -> Option<f64> {
    number_as_f64(child_list(list, tag)?.get(1)?)
}

/// Find `(at x y [rot])` within `list`.
pub fn at_prop(list: &[Sexpr]) -> Option<(f64, f64, Option<f64>)> {
    let at = child_list(list, "at")?;
    let x = number_as_f64(at.get(1)?)?;
    let y = number_as_f64(at.get(2)?)?;
    let rot = at.get(3).and_then(number_as_f64);
    Some((x, y, rot))
}

/// Find a list-of-strings property `(tag "A" "B" ...)` within `list`.
pub fn string_list_prop(list: &[Sexpr], tag: &str) -> Option<Vec<String>> {
    let items = child_list(list, tag)?;
    let out: Vec<String> = items
        .iter()
        .skip(1)
        .filter_map(|s| s.as_str().map(|v| v.to_string()))
        .collect();
    (!out.is_empty()).then_some(out)
}

/// Replace the values of `(tag ...)` with `values`, appending the list when absent.
///
/// Nested lists following the values (e.g. `(effects ...)`) are left alone.
pub fn set_child_values(list: &mut Vec<Sexpr>, tag: &str, values: Vec<Sexpr>) {
    match find_child_list_mut(list, tag) {
        Some(child) => {
            let tail: Vec<Sexpr> = child.drain(1..).skip_while(|n| !n.is_list()).collect();
            child.extend(values);
            child.extend(tail);
        }
        None => {
            let mut child = vec![Sexpr::symbol(tag)];
            child.extend(values);
            list.push(Sexpr::list(child));
        }
    }
}

/// Remove every direct child list `(tag ...)`.
pub fn remove_child_lists(list: &mut Vec<Sexpr>, tag: &str) {
    list.retain(|node| node.tag() != Some(tag));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn queries_typed_props() {
        let node = parse(
            r#"(symbol (lib_id "Device:R") (at 10 20.5 90) (unit 2) (in_bom yes) (dnp no)
                (fields_autoplaced yes))"#,
        )
        .unwrap();
        let items = node.as_list().unwrap();
        assert_eq!(string_prop(items, "lib_id").as_deref(), Some("Device:R"));
        assert_eq!(at_prop(items), Some((10.0, 20.5, Some(90.0))));
        assert_eq!(int_prop(items, "unit"), Some(2));
        assert_eq!(number_prop(items, "unit"), Some(2.0));
        assert_eq!(yes_no_prop(items, "in_bom"), Some(true));
        assert_eq!(yes_no_prop(items, "dnp"), Some(false));
        assert_eq!(yes_no_prop(items, "on_board"), None);
    }

    #[test]
    fn set_child_values_rewrites_or_appends() {
        let mut node = parse(r#"(property "Value" "10k" (at 1 2 0) (effects (hide yes)))"#).unwrap();
        let items = node.as_list_mut().unwrap();
        set_child_values(items, "at", vec![Sexpr::int(5), Sexpr::int(6), Sexpr::int(90)]);
        set_child_values(items, "unit", vec![Sexpr::int(3)]);
        assert_eq!(at_prop(items), Some((5.0, 6.0, Some(90.0))));
        assert_eq!(int_prop(items, "unit"), Some(3));
        assert!(child_list(items, "effects").is_some());

        remove_child_lists(items, "unit");
        assert!(child_list(items, "unit").is_none());
    }

    #[test]
    fn set_child_values_keeps_nested_tail() {
        let mut node = parse("(root (pin \"1\" (uuid \"a\")))").unwrap();
        let items = node.as_list_mut().unwrap();
        set_child_values(items, "pin", vec![Sexpr::string("2")]);
        let pin = child_list(items, "pin").unwrap();
        assert_eq!(pin[1].as_str(), Some("2"));
        assert_eq!(pin[2].tag(), Some("uuid"));
    }
}
