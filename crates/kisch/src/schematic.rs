//! The schematic document: one parsed `(kicad_sch ...)` tree plus the typed
//! views built over it.
//!
//! Only symbols are editable. Every other top-level node (sheet metadata,
//! junctions, text, ...) is carried through serialization untouched and in
//! its original position.

use std::fmt;

use kisch_sexpr::formatter::{FormatMode, format_tree};
use kisch_sexpr::{ListBuilder, Sexpr, kv};

use crate::connectivity::ConnectivityWalker;
use crate::error::{Result, SchematicError};
use crate::geometry::{Rotation, round4};
use crate::library::LibrarySymbols;
use crate::property::{Property, REFERENCE, VALUE};
use crate::symbol::{Symbol, SymbolCollection};
use crate::view::SymbolRef;
use crate::wire::{Label, LabelCollection, LabelKind, Wire, WireCollection};

/// Vertical gap between a new symbol's Reference and Value fields.
const VALUE_OFFSET: f64 = 2.54;

/// Options for [`Schematic::add_symbol_from_lib`].
#[derive(Debug, Clone)]
pub struct NewSymbol {
    pub reference: String,
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
    pub unit: u32,
    pub in_bom: bool,
    pub on_board: bool,
    pub dnp: bool,
}

impl Default for NewSymbol {
    fn default() -> Self {
        NewSymbol {
            reference: "U?".to_string(),
            x: 0.0,
            y: 0.0,
            rotation: Rotation::R0,
            unit: 1,
            in_bom: true,
            on_board: true,
            dnp: false,
        }
    }
}

impl NewSymbol {
    pub fn at(reference: impl Into<String>, x: f64, y: f64) -> Self {
        NewSymbol {
            reference: reference.into(),
            x,
            y,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schematic {
    /// Source tree; modeled children are regenerated on serialization.
    root: Sexpr,
    library: LibrarySymbols,
    symbols: SymbolCollection,
    wires: WireCollection,
    labels: LabelCollection,
    global_labels: LabelCollection,
}

impl Schematic {
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_sexpr(kisch_sexpr::parse(text)?)
    }

    pub fn from_sexpr(root: Sexpr) -> Result<Self> {
        let items = root
            .as_list()
            .filter(|items| items.first().and_then(Sexpr::as_sym) == Some("kicad_sch"))
            .ok_or_else(|| SchematicError::malformed("root node is not (kicad_sch ...)"))?;

        let library = items
            .iter()
            .find(|node| node.tag() == Some("lib_symbols"))
            .and_then(Sexpr::as_list)
            .map(LibrarySymbols::from_items)
            .unwrap_or_default();

        let mut symbols = Vec::new();
        let mut wires = WireCollection::default();
        let mut labels = LabelCollection::default();
        let mut global_labels = LabelCollection::default();

        for node in items.iter().skip(1) {
            let Some(list) = node.as_list() else {
                continue;
            };
            match node.tag() {
                Some("symbol") => symbols.push(Symbol::from_node(node)?),
                Some("wire") => match Wire::from_node(list) {
                    Some(wire) => {
                        wires.push(wire);
                    }
                    None => log::warn!("Skipping wire without two endpoints"),
                },
                Some("label") => push_label(&mut labels, list, LabelKind::Local),
                Some("global_label") => push_label(&mut global_labels, list, LabelKind::Global),
                _ => {}
            }
        }

        let symbols = SymbolCollection::new(symbols)?;
        log::debug!(
            "Loaded schematic: {} library symbols, {} symbols, {} wires, {} labels, {} global labels",
            library.len(),
            symbols.len(),
            wires.len(),
            labels.len(),
            global_labels.len()
        );

        Ok(Schematic {
            root,
            library,
            symbols,
            wires,
            labels,
            global_labels,
        })
    }

    pub fn library(&self) -> &LibrarySymbols {
        &self.library
    }

    pub fn symbols(&self) -> &SymbolCollection {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolCollection {
        &mut self.symbols
    }

    pub fn wires(&self) -> &WireCollection {
        &self.wires
    }

    pub fn labels(&self) -> &LabelCollection {
        &self.labels
    }

    pub fn global_labels(&self) -> &LabelCollection {
        &self.global_labels
    }

    /// Query handle for the symbol registered under `key` (`R1`, `U1_B`, ...).
    pub fn symbol(&self, key: &str) -> Option<SymbolRef<'_>> {
        self.symbols
            .position(key)
            .map(|index| SymbolRef::new(self, index))
    }

    pub fn symbol_at(&self, index: usize) -> Option<SymbolRef<'_>> {
        (index < self.symbols.len()).then(|| SymbolRef::new(self, index))
    }

    /// Query handles for every symbol, in file order.
    pub fn symbol_refs(&self) -> impl Iterator<Item = SymbolRef<'_>> {
        (0..self.symbols.len()).map(|index| SymbolRef::new(self, index))
    }

    pub fn walker(&self) -> ConnectivityWalker<'_> {
        ConnectivityWalker::new(self)
    }

    /// Place a new instance of library part `lib_id` and register it.
    ///
    /// The symbol gets a fresh uuid, `Reference` and `Value` properties (the
    /// value is the part name after the library prefix) and one pin entry per
    /// library pin of the chosen unit.
    pub fn add_symbol_from_lib(&mut self, lib_id: &str, options: NewSymbol) -> Result<SymbolRef<'_>> {
        let node = self.synthesize_symbol(lib_id, &options)?;
        let symbol = Symbol::from_node(&node)?;
        let index = self.symbols.append(symbol)?;
        log::debug!(
            "Added {} ({lib_id}) as {}",
            options.reference,
            self.symbols.key_at(index).unwrap_or_default()
        );
        Ok(SymbolRef::new(self, index))
    }

    fn synthesize_symbol(&self, lib_id: &str, options: &NewSymbol) -> Result<Sexpr> {
        let lib_symbol = self.library.require(lib_id)?;
        let value = lib_id.split_once(':').map_or(lib_id, |(_, name)| name);
        let unit = options.unit.max(1);
        let at = (options.x, options.y);
        // Value sits one grid step below Reference.
        let value_at = (options.x, round4(options.y + VALUE_OFFSET));

        let mut at_node = ListBuilder::node("at");
        at_node
            .push(Sexpr::number(options.x))
            .push(Sexpr::number(options.y))
            .push(options.rotation.degrees());

        let mut node = ListBuilder::node("symbol");
        node.push(kv("lib_id", Sexpr::string(lib_id)))
            .push(at_node.build())
            .push(kv("unit", unit))
            .push(kv("in_bom", options.in_bom))
            .push(kv("on_board", options.on_board))
            .push(kv("dnp", options.dnp))
            .push(kv("uuid", Sexpr::string(uuid::Uuid::new_v4().to_string())))
            .push(Property::new(REFERENCE, options.reference.as_str(), at).node().clone())
            .push(Property::new(VALUE, value, value_at).node().clone());

        let pin_unit = lib_symbol.is_multi_unit().then_some(unit);
        let mut numbers: Vec<&str> = Vec::new();
        for pin in lib_symbol.pins_for(pin_unit, 1) {
            if numbers.contains(&pin.number.as_str()) {
                continue;
            }
            numbers.push(pin.number.as_str());
            let mut pin_node = ListBuilder::node("pin");
            pin_node
                .push(Sexpr::string(pin.number.as_str()))
                .push(kv("uuid", Sexpr::string(uuid::Uuid::new_v4().to_string())));
            node.push(pin_node.build());
        }

        Ok(node.build())
    }

    /// Serialize the document, regenerating `lib_symbols` and every placed symbol.
    ///
    /// Symbols are written as one block where the first symbol stood. A sheet
    /// that had none gets them before `sheet_instances`, or at the end.
    pub fn to_sexpr(&self) -> Sexpr {
        let original = self.root.as_list().unwrap_or_default();
        let mut items = Vec::with_capacity(original.len() + 1);
        let mut symbols_written = false;

        for child in original {
            match child.tag() {
                Some("lib_symbols") => items.push(self.library.to_sexpr()),
                Some("symbol") => {
                    if !symbols_written {
                        items.extend(self.symbols.iter().map(Symbol::to_sexpr));
                        symbols_written = true;
                    }
                }
                _ => items.push(child.clone()),
            }
        }

        if !symbols_written {
            let at = items
                .iter()
                .position(|n| matches!(n.tag(), Some("sheet_instances") | Some("symbol_instances")))
                .unwrap_or(items.len());
            let symbols: Vec<Sexpr> = self.symbols.iter().map(Symbol::to_sexpr).collect();
            items.splice(at..at, symbols);
        }

        Sexpr::list(items)
    }
}

fn push_label(labels: &mut LabelCollection, list: &[Sexpr], kind: LabelKind) {
    match Label::from_node(list, kind) {
        Some(label) => {
            labels.push(label);
        }
        None => log::warn!("Skipping {} without text or position", kind.tag()),
    }
}

impl fmt::Display for Schematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_tree(&self.to_sexpr(), FormatMode::Normal))
    }
}

#[cfg(test)]
mod tests {
    use kisch_sexpr::kicad::props::at_prop;

    use super::*;

    const SHEET: &str = r#"(kicad_sch
        (version 20231120)
        (generator "eeschema")
        (lib_symbols
            (symbol "Device:R"
                (symbol "R_1_1"
                    (pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))
                    (pin passive line (at 0 -3.81 90) (length 1.27) (name "~") (number "2")))))
        (junction (at 100 46.19) (diameter 0))
        (sheet_instances (path "/" (page "1")))
    )"#;

    #[test]
    fn rejects_non_schematic_roots() {
        assert!(matches!(
            Schematic::parse("(kicad_pcb)"),
            Err(SchematicError::Malformed { .. })
        ));
        assert!(matches!(
            Schematic::parse("(kicad_sch"),
            Err(SchematicError::Parse(_))
        ));
    }

    #[test]
    fn new_symbol_defaults() {
        let options = NewSymbol::default();
        assert_eq!(options.reference, "U?");
        assert_eq!(options.unit, 1);
        assert!(options.in_bom && options.on_board && !options.dnp);
    }

    #[test]
    fn synthesizes_symbol_from_library() {
        let mut schematic = Schematic::parse(SHEET).unwrap();
        let r1 = schematic
            .add_symbol_from_lib("Device:R", NewSymbol::at("R1", 100.0, 50.0))
            .unwrap();
        let symbol = r1.symbol();
        assert_eq!(symbol.value(), "R");
        assert_eq!(symbol.lib_id(), "Device:R");
        assert_eq!(symbol.instance_pins().len(), 2);
        assert!(symbol.uuid().is_some_and(|u| uuid::Uuid::parse_str(u).is_ok()));
        assert_eq!(r1.pins().len(), 2);

        let anchor = |name: &str| {
            let node = symbol.properties().get(name).unwrap().node();
            at_prop(node.as_list().unwrap()).map(|(x, y, _)| (x, y))
        };
        assert_eq!(anchor(REFERENCE), Some((100.0, 50.0)));
        assert_eq!(anchor(VALUE), Some((100.0, 52.54)));
        assert_eq!(schematic.symbols().names().collect::<Vec<_>>(), vec!["R1"]);
    }

    #[test]
    fn unknown_library_part_lists_known_ids() {
        let mut schematic = Schematic::parse(SHEET).unwrap();
        let err = schematic
            .add_symbol_from_lib("Device:C", NewSymbol::default())
            .unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @r#"Library symbol 'Device:C' not found in schematic. Available symbols: ["Device:R"]"#
        );
        assert!(schematic.symbols().is_empty());
    }

    #[test]
    fn new_symbols_go_before_sheet_instances() {
        let mut schematic = Schematic::parse(SHEET).unwrap();
        schematic
            .add_symbol_from_lib("Device:R", NewSymbol::at("R1", 100.0, 50.0))
            .unwrap();
        let tree = schematic.to_sexpr();
        let tags: Vec<&str> = tree
            .as_list()
            .unwrap()
            .iter()
            .filter_map(Sexpr::tag)
            .collect();
        assert_eq!(
            tags,
            vec!["version", "generator", "lib_symbols", "junction", "symbol", "sheet_instances"]
        );
    }

    #[test]
    fn unedited_document_round_trips() {
        let schematic = Schematic::parse(SHEET).unwrap();
        assert_eq!(schematic.to_sexpr(), kisch_sexpr::parse(SHEET).unwrap());
        let text = schematic.to_string();
        assert!(text.ends_with(")\n"));
        assert_eq!(
            Schematic::parse(&text).unwrap().to_sexpr(),
            schematic.to_sexpr()
        );
    }
}
