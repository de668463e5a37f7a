//! KiCad schematic (`.kicad_sch`) helpers.

use crate::Sexpr;
use std::collections::BTreeMap;

use super::props::{at_prop, child_list, sym_prop};

/// Extract `(instances (project ... (path "/...") ...))` paths for a placed schematic symbol.
pub fn schematic_instance_paths(symbol: &[Sexpr]) -> Vec<String> {
    instance_path_lists(symbol)
        .into_iter()
        .filter_map(|path| path.get(1).and_then(Sexpr::as_str).map(str::to_string))
        .collect()
}

/// Extract every `(reference "...")` recorded under the symbol's project instances.
pub fn schematic_instance_references(symbol: &[Sexpr]) -> Vec<String> {
    instance_path_lists(symbol)
        .into_iter()
        .filter_map(|path| {
            let reference = child_list(path, "reference")?;
            reference.get(1).and_then(Sexpr::as_str).map(str::to_string)
        })
        .collect()
}

/// Overwrite every `(reference "...")` under the symbol's project instances.
///
/// Returns the number of references rewritten.
pub fn set_instance_references(symbol: &mut [Sexpr], value: &str) -> usize {
    let mut rewritten = 0;
    let Some(instances) = symbol
        .iter_mut()
        .filter_map(Sexpr::as_list_mut)
        .find(|items| items.first().and_then(Sexpr::as_sym) == Some("instances"))
    else {
        return 0;
    };

    for project in instances.iter_mut().skip(1).filter_map(Sexpr::as_list_mut) {
        if project.first().and_then(Sexpr::as_sym) != Some("project") {
            continue;
        }
        for path in project.iter_mut().skip(1).filter_map(Sexpr::as_list_mut) {
            if path.first().and_then(Sexpr::as_sym) != Some("path") {
                continue;
            }
            for reference in path.iter_mut().filter_map(Sexpr::as_list_mut) {
                if reference.first().and_then(Sexpr::as_sym) == Some("reference")
                    && reference.len() >= 2
                {
                    reference[1] = Sexpr::string(value);
                    rewritten += 1;
                }
            }
        }
    }
    rewritten
}

fn instance_path_lists(symbol: &[Sexpr]) -> Vec<&[Sexpr]> {
    let Some(instances) = child_list(symbol, "instances") else {
        return Vec::new();
    };

    instances
        .iter()
        .skip(1)
        .filter_map(Sexpr::as_list)
        .filter(|project| project.first().and_then(Sexpr::as_sym) == Some("project"))
        .flat_map(|project| {
            project
                .iter()
                .skip(1)
                .filter_map(Sexpr::as_list)
                .filter(|items| items.first().and_then(Sexpr::as_sym) == Some("path"))
        })
        .collect()
}

/// Extract all `(property "NAME" "VALUE" ...)` pairs from a placed schematic symbol.
pub fn schematic_properties(symbol: &[Sexpr]) -> BTreeMap<String, String> {
    symbol
        .iter()
        .skip(1)
        .filter_map(property_entry)
        .collect()
}

/// Name and value of a `(property "NAME" "VALUE" ...)` node.
pub fn property_entry(node: &Sexpr) -> Option<(String, String)> {
    let items = node.as_list()?;
    if items.first().and_then(Sexpr::as_sym) != Some("property") {
        return None;
    }
    let name = items.get(1).and_then(Sexpr::as_atom)?;
    let value = items.get(2).and_then(Sexpr::as_atom).unwrap_or_default();
    Some((name.to_string(), value.to_string()))
}

/// Extract `(pin "<num>" (uuid "..."))` entries from a placed schematic symbol, in file order.
pub fn schematic_pins(symbol: &[Sexpr]) -> Vec<(String, Option<String>)> {
    symbol
        .iter()
        .skip(1)
        .filter_map(Sexpr::as_list)
        .filter(|items| items.first().and_then(Sexpr::as_sym) == Some("pin"))
        .filter_map(|items| {
            let number = items.get(1).and_then(Sexpr::as_atom)?;
            let uuid = child_list(items, "uuid")
                .and_then(|uuid| uuid.get(1))
                .and_then(Sexpr::as_atom)
                .map(str::to_string);
            Some((number.to_string(), uuid))
        })
        .collect()
}

/// Extract schematic placement `(at x y [rot])` for a placed item.
pub fn schematic_at(symbol: &[Sexpr]) -> Option<(f64, f64, Option<f64>)> {
    at_prop(symbol)
}

/// Extract `(mirror x|y)` for a placed symbol.
pub fn schematic_mirror(symbol: &[Sexpr]) -> Option<String> {
    sym_prop(symbol, "mirror")
}

/// Extract the two `(pts (xy ..) (xy ..))` endpoints of a wire.
pub fn wire_endpoints(wire: &[Sexpr]) -> Option<[(f64, f64); 2]> {
    let pts = child_list(wire, "pts")?;
    let mut points = pts.iter().skip(1).filter_map(|node| {
        let xy = node.as_list()?;
        if xy.first().and_then(Sexpr::as_sym) != Some("xy") {
            return None;
        }
        Some((xy.get(1)?.as_number()?, xy.get(2)?.as_number()?))
    });
    Some([points.next()?, points.next()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const SYMBOL: &str = r#"(symbol (lib_id "Device:R") (at 100 50 90) (mirror y) (unit 1)
        (property "Reference" "R1" (at 0 0 0))
        (property "Value" "10k" (at 0 0 0))
        (pin "1" (uuid "p1"))
        (pin "2" (uuid "p2"))
        (instances (project "demo" (path "/root" (reference "R1") (unit 1)))))"#;

    #[test]
    fn extracts_placed_symbol_fields() {
        let node = parse(SYMBOL).unwrap();
        let items = node.as_list().unwrap();
        assert_eq!(schematic_at(items), Some((100.0, 50.0, Some(90.0))));
        assert_eq!(schematic_mirror(items).as_deref(), Some("y"));
        let props = schematic_properties(items);
        assert_eq!(props.get("Value").map(String::as_str), Some("10k"));
        assert_eq!(
            schematic_pins(items),
            vec![
                ("1".to_string(), Some("p1".to_string())),
                ("2".to_string(), Some("p2".to_string()))
            ]
        );
        assert_eq!(schematic_instance_paths(items), vec!["/root".to_string()]);
    }

    #[test]
    fn rewrites_instance_references() {
        let mut node = parse(SYMBOL).unwrap();
        let items = node.as_list_mut().unwrap();
        assert_eq!(set_instance_references(items, "R7"), 1);
        assert_eq!(schematic_instance_references(items), vec!["R7".to_string()]);
    }

    #[test]
    fn reads_wire_endpoints() {
        let node = parse(r#"(wire (pts (xy 1 2) (xy 3.5 2)) (uuid "w"))"#).unwrap();
        assert_eq!(
            wire_endpoints(node.as_list().unwrap()),
            Some([(1.0, 2.0), (3.5, 2.0)])
        );
        let short = parse("(wire (pts (xy 1 2)))").unwrap();
        assert_eq!(wire_endpoints(short.as_list().unwrap()), None);
    }
}
