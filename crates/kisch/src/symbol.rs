//! Placed symbols and the collection that names them.
//!
//! A [`SymbolCollection`] is keyed by Reference. Multi-unit parts (one gate of
//! a quad op-amp per placement) share a Reference, so every unit of such a part
//! is keyed `"{Reference}_{letter}"`: `U1_A`, `U1_B`, ...
//!
//! Edits go through [`SymbolMut`] so that a Reference change re-keys the
//! collection and structural changes drop the symbol's cached pins.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::Index;

use kisch_sexpr::kicad::props::{int_prop, remove_child_lists, set_child_values, string_prop};
use kisch_sexpr::kicad::schematic::{
    schematic_at, schematic_instance_references, schematic_mirror, schematic_pins,
    set_instance_references,
};
use kisch_sexpr::kicad::yes_no_prop;
use kisch_sexpr::{ListBuilder, Sexpr, kv};
use regex::Regex;

use crate::collection::NamedCollection;
use crate::error::{Result, SchematicError};
use crate::geometry::{MirrorAxis, Placement};
use crate::library::LibrarySymbols;
use crate::pin::{InstancePin, PinCollection, SymbolPin, build_pin_collection};
use crate::property::{PropertyBag, PropertyChange, REFERENCE, VALUE};

/// Letter KiCad shows for a unit: 1 → `A`, 2 → `B`, ...
pub fn unit_letter(unit: u32) -> String {
    match unit {
        1..=26 => char::from(b'A' + (unit - 1) as u8).to_string(),
        other => other.to_string(),
    }
}

/// Collection key of unit `unit` of a multi-unit part.
pub fn unit_key(reference: &str, unit: u32) -> String {
    format!("{reference}_{}", unit_letter(unit))
}

/// A placed instance of a library part.
#[derive(Debug, Clone)]
pub struct Symbol {
    lib_id: String,
    placement: Placement,
    mirror: Option<MirrorAxis>,
    unit: u32,
    body_style: u32,
    in_bom: bool,
    on_board: bool,
    dnp: bool,
    uuid: Option<String>,
    properties: PropertyBag,
    instance_pins: Vec<InstancePin>,
    /// Source node; unmodeled children are written back unchanged.
    node: Sexpr,
    pins: OnceCell<PinCollection>,
}

impl Symbol {
    /// Read a placed `(symbol (lib_id ...) ...)` node.
    pub fn from_node(node: &Sexpr) -> Result<Self> {
        let items = node
            .as_list()
            .ok_or_else(|| SchematicError::malformed("symbol is not a list"))?;
        let lib_id = string_prop(items, "lib_id")
            .ok_or_else(|| SchematicError::malformed("symbol without lib_id"))?;

        let placement = match schematic_at(items) {
            Some((x, y, rot)) => Placement::from_at(x, y, rot)?,
            None => Placement::default(),
        };
        let mirror = schematic_mirror(items).and_then(|m| MirrorAxis::from_value(&m));
        let unit = int_prop(items, "unit").unwrap_or(1).max(1) as u32;
        let body_style = int_prop(items, "body_style")
            .or_else(|| int_prop(items, "convert"))
            .unwrap_or(1)
            .max(1) as u32;

        let instance_pins = schematic_pins(items)
            .into_iter()
            .map(|(number, uuid)| InstancePin { number, uuid })
            .collect();

        Ok(Symbol {
            lib_id,
            placement,
            mirror,
            unit,
            body_style,
            in_bom: yes_no_prop(items, "in_bom").unwrap_or(true),
            on_board: yes_no_prop(items, "on_board").unwrap_or(true),
            dnp: yes_no_prop(items, "dnp").unwrap_or(false),
            uuid: string_prop(items, "uuid"),
            properties: PropertyBag::from_symbol_items(items),
            instance_pins,
            node: node.clone(),
            pins: OnceCell::new(),
        })
    }

    pub fn lib_id(&self) -> &str {
        &self.lib_id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn mirror(&self) -> Option<MirrorAxis> {
        self.mirror
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    pub fn body_style(&self) -> u32 {
        self.body_style
    }

    pub fn in_bom(&self) -> bool {
        self.in_bom
    }

    pub fn on_board(&self) -> bool {
        self.on_board
    }

    pub fn dnp(&self) -> bool {
        self.dnp
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.value(name)
    }

    /// The `Reference` property, or `""` when the symbol has none.
    pub fn reference(&self) -> &str {
        self.property(REFERENCE).unwrap_or_default()
    }

    pub fn value(&self) -> &str {
        self.property(VALUE).unwrap_or_default()
    }

    pub fn instance_pins(&self) -> &[InstancePin] {
        &self.instance_pins
    }

    /// Whether the part comes from the `power` library (GND, +3V3, ...).
    pub fn is_power(&self) -> bool {
        self.lib_id.starts_with("power:")
    }

    /// References recorded under `(instances (project ... (path ... (reference ...))))`.
    pub fn all_references(&self) -> Vec<String> {
        self.node
            .as_list()
            .map(schematic_instance_references)
            .unwrap_or_default()
    }

    /// Resolved pins, built on first use and cached until a structural edit.
    ///
    /// With `multi_unit` set (or a multi-unit library part) only this unit's
    /// library pins are considered. A missing library entry yields no pins.
    pub fn pins(&self, library: &LibrarySymbols, multi_unit: bool) -> &PinCollection {
        self.pins.get_or_init(|| {
            let Some(lib_symbol) = library.get(&self.lib_id) else {
                log::debug!("No library symbol '{}' for {}", self.lib_id, self.reference());
                return build_pin_collection(&self.instance_pins, []);
            };
            let unit = (multi_unit || lib_symbol.is_multi_unit()).then_some(self.unit);
            build_pin_collection(
                &self.instance_pins,
                lib_symbol.pins_for(unit, self.body_style),
            )
        })
    }

    pub fn pins_cached(&self) -> bool {
        self.pins.get().is_some()
    }

    /// Drop the cached pin collection; the next [`pins`](Self::pins) call rebuilds it.
    pub fn invalidate_pins(&mut self) {
        self.pins.take();
    }

    pub(crate) fn set_property(&mut self, name: &str, value: &str) -> PropertyChange {
        self.properties.set(name, value)
    }

    pub(crate) fn set_unit(&mut self, unit: u32) {
        self.unit = unit.max(1);
        self.invalidate_pins();
    }

    pub(crate) fn set_body_style(&mut self, body_style: u32) {
        self.body_style = body_style.max(1);
        self.invalidate_pins();
    }

    pub(crate) fn set_lib_id(&mut self, lib_id: &str) {
        self.lib_id = lib_id.to_string();
        self.invalidate_pins();
    }

    pub(crate) fn set_instance_pins(&mut self, pins: Vec<InstancePin>) {
        self.instance_pins = pins;
        self.invalidate_pins();
    }

    pub(crate) fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub(crate) fn set_mirror(&mut self, mirror: Option<MirrorAxis>) {
        self.mirror = mirror;
    }

    pub(crate) fn set_flags(&mut self, in_bom: bool, on_board: bool, dnp: bool) {
        self.in_bom = in_bom;
        self.on_board = on_board;
        self.dnp = dnp;
    }

    pub(crate) fn set_instance_references(&mut self, reference: &str) -> usize {
        self.node
            .as_list_mut()
            .map(|items| set_instance_references(items, reference))
            .unwrap_or(0)
    }

    /// Serialize back to a `(symbol ...)` node, carrying every unmodeled child along.
    pub fn to_sexpr(&self) -> Sexpr {
        let original = self.node.as_list().unwrap_or_default();
        let mut items: Vec<Sexpr> = Vec::with_capacity(original.len());
        let mut properties_written = false;
        let mut pins_written = false;

        for child in original {
            match child.tag() {
                Some("property") => {
                    if !properties_written {
                        items.extend(self.properties.iter().map(|p| p.node().clone()));
                        properties_written = true;
                    }
                }
                Some("pin") => {
                    if !pins_written {
                        items.extend(self.instance_pin_nodes(original));
                        pins_written = true;
                    }
                }
                _ => items.push(child.clone()),
            }
        }
        if items.is_empty() {
            items.push(Sexpr::symbol("symbol"));
        }

        let tail_at = |items: &[Sexpr]| {
            items
                .iter()
                .position(|n| n.tag() == Some("instances"))
                .unwrap_or(items.len())
        };
        if !properties_written {
            let at = items
                .iter()
                .position(|n| matches!(n.tag(), Some("pin") | Some("instances")))
                .unwrap_or(items.len());
            items.splice(at..at, self.properties.iter().map(|p| p.node().clone()));
        }
        if !pins_written {
            let at = tail_at(&items);
            let pins = self.instance_pin_nodes(original);
            items.splice(at..at, pins);
        }

        set_child_values(&mut items, "lib_id", vec![Sexpr::string(self.lib_id.as_str())]);
        set_child_values(
            &mut items,
            "at",
            vec![
                Sexpr::number(self.placement.x),
                Sexpr::number(self.placement.y),
                Sexpr::int(self.placement.rotation.degrees() as i64),
            ],
        );
        remove_child_lists(&mut items, "mirror");
        if let Some(mirror) = self.mirror {
            let at = items
                .iter()
                .position(|n| n.tag() == Some("at"))
                .map_or(items.len(), |idx| idx + 1);
            items.insert(at, kv("mirror", mirror.as_value()));
        }
        set_child_values(&mut items, "unit", vec![Sexpr::int(self.unit as i64)]);
        for (tag, value, default) in [
            ("in_bom", self.in_bom, true),
            ("on_board", self.on_board, true),
            ("dnp", self.dnp, false),
        ] {
            if value != default || items.iter().any(|n| n.tag() == Some(tag)) {
                set_child_values(&mut items, tag, vec![Sexpr::from(value)]);
            }
        }

        Sexpr::list(items)
    }

    /// `(pin ...)` nodes for the current instance pins, reusing source nodes by number.
    fn instance_pin_nodes(&self, original: &[Sexpr]) -> Vec<Sexpr> {
        self.instance_pins
            .iter()
            .map(|pin| {
                original
                    .iter()
                    .filter(|n| n.tag() == Some("pin"))
                    .find(|n| {
                        n.as_list()
                            .and_then(|items| items.get(1))
                            .and_then(Sexpr::as_atom)
                            == Some(pin.number.as_str())
                    })
                    .cloned()
                    .unwrap_or_else(|| {
                        let mut node = ListBuilder::node("pin");
                        node.push(Sexpr::string(pin.number.as_str()));
                        if let Some(uuid) = &pin.uuid {
                            node.push(kv("uuid", Sexpr::string(uuid.as_str())));
                        }
                        node.build()
                    })
            })
            .collect()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit != 1 {
            write!(
                f,
                "<symbol {} (unit {})>",
                self.reference(),
                unit_letter(self.unit)
            )
        } else {
            write!(f, "<symbol {}>", self.reference())
        }
    }
}

fn symbol_key(symbol: &Symbol) -> String {
    if symbol.unit == 1 {
        symbol.reference().to_string()
    } else {
        unit_key(symbol.reference(), symbol.unit)
    }
}

/// All placed symbols of a schematic, in file order, addressable by key.
#[derive(Debug, Clone)]
pub struct SymbolCollection {
    symbols: NamedCollection<Symbol>,
    /// References with a placed unit above 1.
    multi_unit: HashSet<String>,
}

impl Default for SymbolCollection {
    fn default() -> Self {
        SymbolCollection {
            symbols: NamedCollection::new(symbol_key),
            multi_unit: HashSet::new(),
        }
    }
}

impl SymbolCollection {
    /// Key a batch of symbols. Any Reference with a unit above 1 gets its unit 1
    /// re-keyed to `_A` as well.
    pub fn new(symbols: Vec<Symbol>) -> Result<Self> {
        let multi_unit: HashSet<String> = symbols
            .iter()
            .filter(|s| s.unit > 1)
            .map(|s| s.reference().to_string())
            .collect();
        let mut symbols = NamedCollection::from_elements(symbols, symbol_key)?;

        let mut references: Vec<&String> = multi_unit.iter().collect();
        references.sort();
        for reference in references {
            if symbols.contains(reference) {
                symbols.element_rename(reference, &unit_key(reference, 1))?;
            }
        }

        Ok(SymbolCollection {
            symbols,
            multi_unit,
        })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn get_by_name(&self, key: &str) -> Option<&Symbol> {
        self.symbols.get_by_name(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.symbols.contains(key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.symbols.position(key)
    }

    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.symbols.key_at(index)
    }

    /// Keys in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.names()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    pub fn reference_startswith(&self, prefix: &str) -> Vec<&Symbol> {
        self.filter(|s| s.reference().starts_with(prefix))
    }

    /// Symbols whose Reference matches `pattern` at its start (not necessarily in full).
    pub fn reference_matches(&self, pattern: &str) -> Result<Vec<&Symbol>> {
        let re = anchored(pattern)?;
        Ok(self.filter(|s| re.is_match(s.reference())))
    }

    pub fn value_startswith(&self, prefix: &str) -> Vec<&Symbol> {
        self.filter(|s| s.value().starts_with(prefix))
    }

    pub fn value_matches(&self, pattern: &str) -> Result<Vec<&Symbol>> {
        let re = anchored(pattern)?;
        Ok(self.filter(|s| re.is_match(s.value())))
    }

    fn filter(&self, pred: impl Fn(&Symbol) -> bool) -> Vec<&Symbol> {
        self.symbols.iter().filter(|s| pred(s)).collect()
    }

    pub fn multiple_units_for_reference(&self, reference: &str) -> bool {
        self.multi_unit.contains(reference)
    }

    /// Symbols ordered by Reference, naturally (`R2` before `R10`).
    pub fn sorted_by_reference(&self) -> Vec<&Symbol> {
        let mut sorted: Vec<&Symbol> = self.symbols.iter().collect();
        sorted.sort_by(|a, b| {
            natord::compare(a.reference(), b.reference()).then(a.unit.cmp(&b.unit))
        });
        sorted
    }

    /// Pins of `symbol`, which must belong to this collection.
    pub fn pins_of<'a>(&self, symbol: &'a Symbol, library: &LibrarySymbols) -> &'a PinCollection {
        symbol.pins(library, self.multiple_units_for_reference(symbol.reference()))
    }

    /// Key `symbol` will be registered under by [`append`](Self::append).
    fn key_for_new(&self, symbol: &Symbol) -> String {
        let reference = symbol.reference();
        if symbol.unit > 1 || self.multi_unit.contains(reference) {
            unit_key(reference, symbol.unit)
        } else {
            reference.to_string()
        }
    }

    /// Register a new symbol at the end.
    ///
    /// Adding a second unit of a part re-keys the unit already present from
    /// `U1` to `U1_A`.
    pub fn append(&mut self, symbol: Symbol) -> Result<usize> {
        let key = self.key_for_new(&symbol);
        if self.symbols.contains(&key) {
            return Err(SchematicError::KeyCollision { key });
        }

        let reference = symbol.reference().to_string();
        if symbol.unit > 1 && self.multi_unit.insert(reference.clone()) {
            let first = unit_key(&reference, 1);
            if self.symbols.contains(&reference) && !self.symbols.contains(&first) {
                self.symbols.element_rename(&reference, &first)?;
            }
        }
        self.symbols.append_with_key(symbol, key)
    }

    /// Drop the symbol under `key`. A Reference leaves the multi-unit set
    /// once none of its remaining placements has a unit above 1.
    pub fn remove(&mut self, key: &str) -> Result<Symbol> {
        let removed = self.symbols.remove(key)?;
        let reference = removed.reference();
        let still_multi = self
            .symbols
            .iter()
            .any(|s| s.unit > 1 && s.reference() == reference);
        if !still_multi && self.multi_unit.remove(reference) {
            log::debug!("{reference} no longer has multiple units");
        }
        Ok(removed)
    }

    /// React to a property write on the symbol registered under `key`.
    ///
    /// Only Reference changes matter: the symbol is re-keyed, keeping any unit
    /// suffix it already had. Sibling units keep their keys.
    pub fn property_changed(&mut self, key: &str, change: &PropertyChange) -> Result<()> {
        if !change.is_reference() {
            return Ok(());
        }
        let new_key = self.renamed_key(key, change);
        self.symbols.element_rename(key, &new_key)?;

        let was_multi = change
            .old
            .as_deref()
            .is_some_and(|old| self.multi_unit.contains(old));
        if was_multi {
            self.multi_unit.insert(change.new.clone());
        }
        Ok(())
    }

    fn renamed_key(&self, key: &str, change: &PropertyChange) -> String {
        let suffix = change
            .old
            .as_deref()
            .and_then(|old| key.strip_prefix(old))
            .unwrap_or_default();
        format!("{}{suffix}", change.new)
    }

    /// Editing guard for the symbol registered under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<SymbolMut<'_>> {
        let position = self.symbols.position(key)?;
        Some(SymbolMut {
            collection: self,
            position,
        })
    }
}

impl Index<usize> for SymbolCollection {
    type Output = Symbol;

    fn index(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }
}

impl<'a> IntoIterator for &'a SymbolCollection {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

fn anchored(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

/// Mutable access to one symbol that keeps the owning collection consistent.
pub struct SymbolMut<'a> {
    collection: &'a mut SymbolCollection,
    position: usize,
}

impl SymbolMut<'_> {
    pub fn symbol(&self) -> &Symbol {
        &self.collection.symbols[self.position]
    }

    pub fn key(&self) -> &str {
        self.collection
            .symbols
            .key_at(self.position)
            .unwrap_or_default()
    }

    fn symbol_mut(&mut self) -> &mut Symbol {
        &mut self.collection.symbols[self.position]
    }

    /// Write a property; a Reference write re-keys the collection.
    ///
    /// A Reference that would collide with another key is rejected before
    /// anything changes.
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<PropertyChange> {
        let key = self.key().to_string();
        if name == REFERENCE {
            let preview = PropertyChange {
                name: name.to_string(),
                new: value.to_string(),
                old: Some(self.symbol().reference().to_string()),
            };
            let new_key = self.collection.renamed_key(&key, &preview);
            if new_key != key && self.collection.contains(&new_key) {
                return Err(SchematicError::KeyCollision { key: new_key });
            }
        }

        let change = self.symbol_mut().set_property(name, value);
        self.collection.property_changed(&key, &change)?;
        Ok(change)
    }

    pub fn set_reference(&mut self, reference: &str) -> Result<PropertyChange> {
        self.set_property(REFERENCE, reference)
    }

    pub fn set_value(&mut self, value: &str) -> Result<PropertyChange> {
        self.set_property(VALUE, value)
    }

    /// Set the Reference property and every per-project instance reference.
    pub fn set_all_references(&mut self, reference: &str) -> Result<PropertyChange> {
        let change = self.set_reference(reference)?;
        self.symbol_mut().set_instance_references(reference);
        Ok(change)
    }

    /// Change the unit. The collection key is left as it is.
    pub fn set_unit(&mut self, unit: u32) {
        self.symbol_mut().set_unit(unit);
    }

    pub fn set_body_style(&mut self, body_style: u32) {
        self.symbol_mut().set_body_style(body_style);
    }

    pub fn set_lib_id(&mut self, lib_id: &str) {
        self.symbol_mut().set_lib_id(lib_id);
    }

    pub fn set_instance_pins(&mut self, pins: Vec<InstancePin>) {
        self.symbol_mut().set_instance_pins(pins);
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.symbol_mut().set_placement(placement);
    }

    pub fn set_mirror(&mut self, mirror: Option<MirrorAxis>) {
        self.symbol_mut().set_mirror(mirror);
    }

    pub fn set_flags(&mut self, in_bom: bool, on_board: bool, dnp: bool) {
        self.symbol_mut().set_flags(in_bom, on_board, dnp);
    }
}

/// Pin lookup helpers over a resolved pin collection.
pub trait PinLookup {
    fn get_pin_by_name(&self, name: &str) -> Option<&SymbolPin>;
    fn get_pin_by_number(&self, number: &str) -> Option<&SymbolPin>;
}

impl PinLookup for PinCollection {
    fn get_pin_by_name(&self, name: &str) -> Option<&SymbolPin> {
        self.iter().find(|pin| pin.name() == name)
    }

    fn get_pin_by_number(&self, number: &str) -> Option<&SymbolPin> {
        self.iter().find(|pin| pin.number() == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kisch_sexpr::parse;

    fn symbol(reference: &str, value: &str, unit: u32) -> Symbol {
        let text = format!(
            r#"(symbol (lib_id "Device:R") (at 10 20 0) (unit {unit})
                (property "Reference" "{reference}" (at 0 0 0))
                (property "Value" "{value}" (at 0 0 0))
                (pin "1" (uuid "a")) (pin "2" (uuid "b")))"#
        );
        Symbol::from_node(&parse(&text).unwrap()).unwrap()
    }

    fn collection() -> SymbolCollection {
        SymbolCollection::new(vec![
            symbol("R1", "10k", 1),
            symbol("C1", "100n", 1),
            symbol("R12", "1k", 1),
            symbol("R21", "10k", 1),
            symbol("U1", "LM358", 1),
            symbol("U1", "LM358", 2),
        ])
        .unwrap()
    }

    #[test]
    fn reads_symbol_fields() {
        let s = symbol("R1", "10k", 1);
        assert_eq!(s.lib_id(), "Device:R");
        assert_eq!((s.placement().x, s.placement().y), (10.0, 20.0));
        assert_eq!(s.reference(), "R1");
        assert_eq!(s.value(), "10k");
        assert!(s.in_bom() && s.on_board() && !s.dnp());
        assert_eq!(s.instance_pins().len(), 2);
        assert!(!s.is_power());
    }

    #[test]
    fn rejects_symbol_without_lib_id() {
        let node = parse(r#"(symbol (at 0 0 0))"#).unwrap();
        assert!(matches!(
            Symbol::from_node(&node),
            Err(SchematicError::Malformed { .. })
        ));
        let skewed = parse(r#"(symbol (lib_id "Device:R") (at 0 0 45))"#).unwrap();
        assert!(matches!(
            Symbol::from_node(&skewed),
            Err(SchematicError::InvalidRotation(_))
        ));
    }

    #[test]
    fn multi_unit_parts_are_suffixed() {
        let symbols = collection();
        assert!(symbols.contains("U1_A"));
        assert!(symbols.contains("U1_B"));
        assert!(!symbols.contains("U1"));
        assert!(symbols.multiple_units_for_reference("U1"));
        assert!(!symbols.multiple_units_for_reference("R1"));
        assert_eq!(symbols.get_by_name("U1_B").map(Symbol::unit), Some(2));
    }

    #[test]
    fn filters_preserve_input_order() {
        let symbols = collection();
        let refs = |v: Vec<&Symbol>| v.iter().map(|s| s.reference().to_string()).collect::<Vec<_>>();
        assert_eq!(refs(symbols.reference_startswith("R")), vec!["R1", "R12", "R21"]);
        assert_eq!(refs(symbols.reference_matches("R.[1-3]").unwrap()), vec!["R12", "R21"]);
        // Prefix-anchored, not a full match.
        assert_eq!(refs(symbols.reference_matches("R1").unwrap()), vec!["R1", "R12"]);
        assert_eq!(refs(symbols.value_startswith("10")), vec!["R1", "C1", "R21"]);
        assert_eq!(refs(symbols.value_matches("1.?k").unwrap()), vec!["R1", "R12", "R21"]);
        assert!(symbols.reference_matches("(").is_err());
    }

    #[test]
    fn reference_edit_rekeys() {
        let mut symbols = collection();
        let change = symbols.get_mut("C1").unwrap().set_reference("C2").unwrap();
        assert_eq!(change.old.as_deref(), Some("C1"));
        assert!(!symbols.contains("C1"));
        assert_eq!(symbols.get_by_name("C2").map(Symbol::value), Some("100n"));
        assert_eq!(symbols.position("C2"), Some(1));
    }

    #[test]
    fn reference_collision_is_rejected_without_change() {
        let mut symbols = collection();
        let err = symbols.get_mut("C1").unwrap().set_reference("R1").unwrap_err();
        assert!(matches!(err, SchematicError::KeyCollision { key } if key == "R1"));
        assert_eq!(symbols.get_by_name("C1").map(Symbol::reference), Some("C1"));
    }

    #[test]
    fn renaming_one_unit_leaves_siblings() {
        let mut symbols = collection();
        symbols.get_mut("U1_B").unwrap().set_reference("U7").unwrap();
        assert!(symbols.contains("U7_B"));
        assert!(symbols.contains("U1_A"));
        assert!(symbols.multiple_units_for_reference("U7"));
    }

    #[test]
    fn value_edit_does_not_rekey() {
        let mut symbols = collection();
        symbols.get_mut("R1").unwrap().set_value("22k").unwrap();
        assert_eq!(symbols.get_by_name("R1").map(Symbol::value), Some("22k"));
    }

    #[test]
    fn append_suffixes_on_demand() {
        let mut symbols = SymbolCollection::new(vec![symbol("U3", "TL072", 1)]).unwrap();
        assert!(symbols.contains("U3"));
        symbols.append(symbol("U3", "TL072", 2)).unwrap();
        assert!(symbols.contains("U3_A"));
        assert!(symbols.contains("U3_B"));
        assert!(!symbols.contains("U3"));
        assert!(matches!(
            symbols.append(symbol("U3", "TL072", 2)),
            Err(SchematicError::KeyCollision { .. })
        ));
    }

    #[test]
    fn removing_every_unit_forgets_multi_unit() {
        let mut symbols = collection();
        symbols.remove("U1_B").unwrap();
        assert!(!symbols.multiple_units_for_reference("U1"));
        symbols.remove("U1_A").unwrap();

        symbols.append(symbol("U1", "LM358", 1)).unwrap();
        assert!(symbols.contains("U1"));
        assert!(!symbols.contains("U1_A"));
    }

    #[test]
    fn removing_unit_one_keeps_multi_unit() {
        let mut symbols = collection();
        symbols.remove("U1_A").unwrap();
        assert!(symbols.multiple_units_for_reference("U1"));
        symbols.append(symbol("U1", "LM358", 1)).unwrap();
        assert!(symbols.contains("U1_A"));
    }

    #[test]
    fn duplicate_references_fail_to_load() {
        let err = SymbolCollection::new(vec![symbol("R1", "1k", 1), symbol("R1", "2k", 1)]);
        assert!(matches!(err, Err(SchematicError::KeyCollision { .. })));
    }

    #[test]
    fn natural_sort_by_reference() {
        let symbols = collection();
        let sorted: Vec<String> = symbols
            .sorted_by_reference()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            sorted,
            vec![
                "<symbol C1>",
                "<symbol R1>",
                "<symbol R12>",
                "<symbol R21>",
                "<symbol U1>",
                "<symbol U1 (unit B)>"
            ]
        );
    }

    #[test]
    fn structural_edits_invalidate_pins() {
        let mut symbols = collection();
        let library = LibrarySymbols::default();
        let r1 = symbols.get_by_name("R1").unwrap();
        assert!(symbols.pins_of(r1, &library).is_empty());
        assert!(symbols.get_by_name("R1").unwrap().pins_cached());

        let mut edit = symbols.get_mut("R1").unwrap();
        edit.set_placement(Placement::default());
        assert!(edit.symbol().pins_cached());
        edit.set_unit(2);
        assert!(!edit.symbol().pins_cached());
        // Unit edits keep the key.
        assert_eq!(edit.key(), "R1");
    }

    #[test]
    fn serializes_edits_back_into_the_node() {
        let mut symbols = collection();
        {
            let mut edit = symbols.get_mut("R1").unwrap();
            edit.set_value("47k").unwrap();
            edit.set_mirror(Some(MirrorAxis::Y));
            edit.set_flags(true, true, true);
        }
        let node = symbols.get_by_name("R1").unwrap().to_sexpr();
        let reparsed = Symbol::from_node(&parse(&node.to_string()).unwrap()).unwrap();
        assert_eq!(reparsed.value(), "47k");
        assert_eq!(reparsed.mirror(), Some(MirrorAxis::Y));
        assert!(reparsed.dnp());
        assert_eq!(reparsed.instance_pins(), symbols.get_by_name("R1").unwrap().instance_pins());
        let items = node.as_list().unwrap();
        assert_eq!(items[2].tag(), Some("at"));
        assert_eq!(items[3].tag(), Some("mirror"));
    }
}
