//! Library part templates embedded in a schematic's `(lib_symbols ...)` block.
//!
//! The table is read-only: placed symbols look their template up by library id
//! and take pin numbers, names and part-space placements from it.

use std::collections::HashMap;

use kisch_sexpr::Sexpr;
use kisch_sexpr::kicad::props::{at_prop, child_list};
use kisch_sexpr::kicad::symbol::{nested_symbol_unit_style, nested_symbols, symbol_name};

use crate::error::{Result, SchematicError};
use crate::geometry::Placement;

/// `~` (or an empty name) marks a pin KiCad draws without a name.
pub fn is_generic_pin_name(name: &str) -> bool {
    name.is_empty() || name == "~"
}

/// A pin as drawn in the library part.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryPinDef {
    pub number: String,
    pub name: String,
    /// Pin tip in part space (y up).
    pub at: Placement,
    pub electrical_type: Option<String>,
    /// 0 when shared by every unit.
    pub unit: u32,
    /// 0 when shared by every body style.
    pub body_style: u32,
    pub hidden: bool,
}

impl LibraryPinDef {
    fn from_node(pin: &[Sexpr], unit: u32, body_style: u32) -> Option<Self> {
        let number = child_list(pin, "number")?.get(1)?.as_atom()?.to_string();
        let name = child_list(pin, "name")
            .and_then(|name| name.get(1))
            .and_then(Sexpr::as_atom)
            .unwrap_or_default()
            .to_string();

        let (x, y, rot) = at_prop(pin)?;
        let at = match Placement::from_at(x, y, rot) {
            Ok(at) => at,
            Err(e) => {
                log::warn!("Skipping library pin {number}: {e}");
                return None;
            }
        };

        let hidden = pin.iter().any(|n| n.as_sym() == Some("hide"))
            || kisch_sexpr::kicad::yes_no_prop(pin, "hide").unwrap_or(false);

        Some(LibraryPinDef {
            number,
            name,
            at,
            electrical_type: pin.get(1).and_then(Sexpr::as_sym).map(str::to_string),
            unit,
            body_style,
            hidden,
        })
    }

    pub fn has_generic_name(&self) -> bool {
        is_generic_pin_name(&self.name)
    }
}

/// One library part: its id, pins across every unit, and the template node.
#[derive(Debug, Clone)]
pub struct LibrarySymbol {
    id: String,
    pins: Vec<LibraryPinDef>,
    unit_count: u32,
    node: Sexpr,
}

impl LibrarySymbol {
    pub(crate) fn from_node(node: &Sexpr) -> Option<Self> {
        let items = node.as_list()?;
        let id = symbol_name(items)?;

        let mut pins: Vec<LibraryPinDef> = items
            .iter()
            .skip(2)
            .filter_map(Sexpr::as_list)
            .filter(|list| list.first().and_then(Sexpr::as_sym) == Some("pin"))
            .filter_map(|pin| LibraryPinDef::from_node(pin, 0, 0))
            .collect();

        let mut unit_count = 1;
        for section in nested_symbols(items) {
            let (unit, style) = nested_symbol_unit_style(section);
            unit_count = unit_count.max(unit);
            pins.extend(
                section
                    .iter()
                    .filter_map(Sexpr::as_list)
                    .filter(|list| list.first().and_then(Sexpr::as_sym) == Some("pin"))
                    .filter_map(|pin| LibraryPinDef::from_node(pin, unit, style)),
            );
        }

        Some(LibrarySymbol {
            id,
            pins,
            unit_count,
            node: node.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> &Sexpr {
        &self.node
    }

    /// Every pin of every unit and body style.
    pub fn pins(&self) -> &[LibraryPinDef] {
        &self.pins
    }

    pub fn unit_count(&self) -> u32 {
        self.unit_count
    }

    pub fn is_multi_unit(&self) -> bool {
        self.unit_count > 1
    }

    /// Pins visible on `unit` (plus shared unit-0 pins) for a body style.
    ///
    /// `unit = None` selects every unit.
    pub fn pins_for(&self, unit: Option<u32>, body_style: u32) -> Vec<&LibraryPinDef> {
        self.pins
            .iter()
            .filter(|pin| pin.body_style == 0 || pin.body_style == body_style)
            .filter(|pin| match unit {
                Some(unit) => pin.unit == 0 || pin.unit == unit,
                None => true,
            })
            .collect()
    }

    /// Template property such as `Reference` (`"U"`) or `Value`.
    pub fn property(&self, name: &str) -> Option<String> {
        self.node
            .as_list()?
            .iter()
            .filter_map(kisch_sexpr::kicad::schematic::property_entry)
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}

/// Library id → template table.
#[derive(Debug, Clone, Default)]
pub struct LibrarySymbols {
    symbols: Vec<LibrarySymbol>,
    by_id: HashMap<String, usize>,
}

impl LibrarySymbols {
    /// Read the children of a `(lib_symbols ...)` node.
    pub(crate) fn from_items(items: &[Sexpr]) -> Self {
        let mut table = LibrarySymbols::default();
        for node in items.iter().skip(1) {
            match LibrarySymbol::from_node(node) {
                Some(symbol) => table.insert(symbol),
                None => log::warn!("Skipping unreadable lib_symbols entry"),
            }
        }
        table
    }

    fn insert(&mut self, symbol: LibrarySymbol) {
        match self.by_id.get(symbol.id()) {
            Some(&idx) => self.symbols[idx] = symbol,
            None => {
                self.by_id.insert(symbol.id().to_string(), self.symbols.len());
                self.symbols.push(symbol);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LibrarySymbol> {
        self.by_id.get(id).map(|&idx| &self.symbols[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Like [`get`](Self::get), but the error lists every known id.
    pub fn require(&self, id: &str) -> Result<&LibrarySymbol> {
        self.get(id).ok_or_else(|| SchematicError::LibraryNotFound {
            lib_id: id.to_string(),
            known: self.ids().map(str::to_string).collect(),
        })
    }

    /// Known library ids in file order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(LibrarySymbol::id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LibrarySymbol> {
        self.symbols.iter()
    }

    /// Rebuild the `(lib_symbols ...)` node.
    pub(crate) fn to_sexpr(&self) -> Sexpr {
        let mut items = vec![Sexpr::symbol("lib_symbols")];
        items.extend(self.symbols.iter().map(|s| s.node.clone()));
        Sexpr::list(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kisch_sexpr::parse;

    const LM358: &str = r#"(lib_symbols
        (symbol "Amplifier_Operational:LM358"
            (property "Reference" "U" (at 0 5.08 0))
            (symbol "LM358_1_1"
                (pin output line (at 7.62 0 180) (length 2.54) (name "~") (number "1"))
                (pin input line (at -7.62 -2.54 0) (length 2.54) (name "-") (number "2"))
                (pin input line (at -7.62 2.54 0) (length 2.54) (name "+") (number "3")))
            (symbol "LM358_2_1"
                (pin input line (at -7.62 2.54 0) (length 2.54) (name "+") (number "5"))
                (pin input line (at -7.62 -2.54 0) (length 2.54) (name "-") (number "6"))
                (pin output line (at 7.62 0 180) (length 2.54) (name "~") (number "7")))
            (symbol "LM358_3_1"
                (pin power_in line (at -2.54 -7.62 90) (length 3.81) (name "V-") (number "4"))
                (pin power_in line (at -2.54 7.62 270) (length 3.81) (name "V+") (number "8")))
        )
        (symbol "Device:R"
            (symbol "R_0_1" (rectangle (start -1.016 -2.54) (end 1.016 2.54)))
            (symbol "R_1_1"
                (pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))
                (pin passive line (at 0 -3.81 90) (length 1.27) (name "~") (number "2"))))
    )"#;

    fn table() -> LibrarySymbols {
        LibrarySymbols::from_items(parse(LM358).unwrap().as_list().unwrap())
    }

    #[test]
    fn indexes_symbols_by_id() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert!(table.contains("Device:R"));
        assert_eq!(
            table.ids().collect::<Vec<_>>(),
            vec!["Amplifier_Operational:LM358", "Device:R"]
        );
        let lm358 = table.get("Amplifier_Operational:LM358").unwrap();
        assert_eq!(lm358.unit_count(), 3);
        assert!(lm358.is_multi_unit());
        assert_eq!(lm358.pins().len(), 8);
        assert_eq!(lm358.property("Reference").as_deref(), Some("U"));
        assert!(!table.get("Device:R").unwrap().is_multi_unit());
    }

    #[test]
    fn selects_pins_per_unit() {
        let table = table();
        let lm358 = table.get("Amplifier_Operational:LM358").unwrap();
        let unit2: Vec<&str> = lm358
            .pins_for(Some(2), 1)
            .into_iter()
            .map(|p| p.number.as_str())
            .collect();
        assert_eq!(unit2, vec!["5", "6", "7"]);
        assert_eq!(lm358.pins_for(None, 1).len(), 8);
        assert!(lm358.pins_for(Some(1), 2).is_empty());
    }

    #[test]
    fn reads_pin_geometry() {
        let table = table();
        let r = table.get("Device:R").unwrap();
        let pin = &r.pins()[1];
        assert_eq!(pin.number, "2");
        assert!(pin.has_generic_name());
        assert_eq!(pin.at.y, -3.81);
        assert_eq!(pin.at.rotation.degrees(), 90);
        assert_eq!(pin.electrical_type.as_deref(), Some("passive"));
    }

    #[test]
    fn missing_id_lists_known_ids() {
        let err = table().require("Device:C").unwrap_err();
        match err {
            SchematicError::LibraryNotFound { lib_id, known } => {
                assert_eq!(lib_id, "Device:C");
                assert_eq!(known.len(), 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
