//! Borrowed query handles over a [`Schematic`].
//!
//! A [`SymbolRef`] pairs a placed symbol with its document so pin locations
//! and connectivity can be answered without the symbol holding a back-pointer.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::connectivity::WireRun;
use crate::geometry::{Placement, Point};
use crate::pin::{PinCollection, SymbolPin};
use crate::schematic::Schematic;
use crate::symbol::{PinLookup, Symbol};
use crate::wire::{Label, LabelKind, Wire};

/// Something found on a pin's wire run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attached<'a> {
    Symbol(SymbolRef<'a>),
    GlobalLabel(&'a Label),
    Label(&'a Label),
}

#[derive(Clone, Copy)]
pub struct SymbolRef<'a> {
    schematic: &'a Schematic,
    index: usize,
}

impl<'a> SymbolRef<'a> {
    pub(crate) fn new(schematic: &'a Schematic, index: usize) -> Self {
        SymbolRef { schematic, index }
    }

    /// Position in the symbol collection.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn symbol(&self) -> &'a Symbol {
        &self.schematic.symbols()[self.index]
    }

    pub fn key(&self) -> &'a str {
        self.schematic
            .symbols()
            .key_at(self.index)
            .unwrap_or_default()
    }

    pub fn pins(&self) -> &'a PinCollection {
        self.schematic
            .symbols()
            .pins_of(self.symbol(), self.schematic.library())
    }

    pub fn pin_refs(&self) -> impl Iterator<Item = PinRef<'a>> + 'a {
        let owner = *self;
        self.pins().iter().map(move |pin| PinRef { owner, pin })
    }

    /// Absolute pin coordinates keyed by number, and also by name for named pins.
    pub fn get_pin_locations(&self) -> BTreeMap<String, (f64, f64)> {
        let symbol = self.symbol();
        let mut locations = BTreeMap::new();
        for pin in self.pins() {
            let location = pin.location_on(symbol).as_tuple();
            locations.insert(pin.number().to_string(), location);
            if !pin.has_generic_name() {
                locations.insert(pin.name().to_string(), location);
            }
        }
        locations
    }

    pub fn get_pin_by_name(&self, name: &str) -> Option<PinRef<'a>> {
        let pin = self.pins().get_pin_by_name(name)?;
        Some(PinRef { owner: *self, pin })
    }

    pub fn get_pin_by_number(&self, number: &str) -> Option<PinRef<'a>> {
        let pin = self.pins().get_pin_by_number(number)?;
        Some(PinRef { owner: *self, pin })
    }

    /// Wires touching any pin, first-seen order.
    pub fn attached_wires(&self) -> Vec<&'a Wire> {
        let mut seen = HashSet::new();
        self.pin_refs()
            .flat_map(|pin| pin.wire_indices().iter().copied())
            .filter(|index| seen.insert(*index))
            .filter_map(|index| self.schematic.wires().get(index))
            .collect()
    }

    pub fn attached_labels(&self) -> Vec<&'a Label> {
        self.union_labels(LabelKind::Local)
    }

    pub fn attached_global_labels(&self) -> Vec<&'a Label> {
        self.union_labels(LabelKind::Global)
    }

    fn union_labels(&self, kind: LabelKind) -> Vec<&'a Label> {
        let walker = self.schematic.walker();
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for pin in self.pin_refs() {
            let run = pin.run();
            for index in walker.labels_on(&run, kind) {
                if seen.insert(index) {
                    found.extend(label_at(self.schematic, kind, index));
                }
            }
        }
        found
    }

    /// Other symbols sharing a wire run with any pin.
    pub fn attached_symbols(&self) -> Vec<SymbolRef<'a>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for pin in self.pin_refs() {
            for other in pin.attached_symbols() {
                if seen.insert(other.index) {
                    found.push(other);
                }
            }
        }
        found
    }

    /// Symbols, then global labels, then labels.
    pub fn attached_all(&self) -> Vec<Attached<'a>> {
        let mut all: Vec<Attached<'a>> = self
            .attached_symbols()
            .into_iter()
            .map(Attached::Symbol)
            .collect();
        all.extend(self.attached_global_labels().into_iter().map(Attached::GlobalLabel));
        all.extend(self.attached_labels().into_iter().map(Attached::Label));
        all
    }
}

impl PartialEq for SymbolRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schematic, other.schematic) && self.index == other.index
    }
}

impl fmt::Debug for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRef")
            .field("key", &self.key())
            .field("index", &self.index)
            .finish()
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.symbol(), f)
    }
}

fn label_at(schematic: &Schematic, kind: LabelKind, index: usize) -> Option<&Label> {
    match kind {
        LabelKind::Local => schematic.labels().get(index),
        LabelKind::Global => schematic.global_labels().get(index),
    }
}

/// One pin of a placed symbol, with its document.
#[derive(Clone, Copy)]
pub struct PinRef<'a> {
    owner: SymbolRef<'a>,
    pin: &'a SymbolPin,
}

impl<'a> PinRef<'a> {
    pub fn owner(&self) -> SymbolRef<'a> {
        self.owner
    }

    pub fn pin(&self) -> &'a SymbolPin {
        self.pin
    }

    pub fn number(&self) -> &'a str {
        self.pin.number()
    }

    pub fn name(&self) -> &'a str {
        self.pin.name()
    }

    pub fn placement(&self) -> Placement {
        self.pin.placement_on(self.owner.symbol())
    }

    pub fn location(&self) -> Point {
        self.pin.location_on(self.owner.symbol())
    }

    fn wire_indices(&self) -> &'a [usize] {
        self.owner.schematic.walker().wires_at(self.location())
    }

    fn run(&self) -> WireRun {
        self.owner.schematic.walker().crawl(self.location())
    }

    /// Wires with an endpoint on this pin.
    pub fn attached_wires(&self) -> Vec<&'a Wire> {
        let wires = self.owner.schematic.wires();
        self.wire_indices()
            .iter()
            .filter_map(|&index| wires.get(index))
            .collect()
    }

    pub fn attached_labels(&self) -> Vec<&'a Label> {
        self.labels_on(&self.run(), LabelKind::Local)
    }

    pub fn attached_global_labels(&self) -> Vec<&'a Label> {
        self.labels_on(&self.run(), LabelKind::Global)
    }

    fn labels_on(&self, run: &WireRun, kind: LabelKind) -> Vec<&'a Label> {
        let schematic = self.owner.schematic;
        schematic
            .walker()
            .labels_on(run, kind)
            .into_iter()
            .filter_map(|index| label_at(schematic, kind, index))
            .collect()
    }

    /// Other symbols with a pin on this pin's wire run.
    pub fn attached_symbols(&self) -> Vec<SymbolRef<'a>> {
        self.symbols_on(&self.run())
    }

    fn symbols_on(&self, run: &WireRun) -> Vec<SymbolRef<'a>> {
        let schematic = self.owner.schematic;
        schematic
            .walker()
            .symbols_on(run, Some(self.owner.index))
            .into_iter()
            .map(|index| SymbolRef::new(schematic, index))
            .collect()
    }

    /// Symbols, then global labels, then labels.
    pub fn attached_all(&self) -> Vec<Attached<'a>> {
        let run = self.run();
        let mut all: Vec<Attached<'a>> = self
            .symbols_on(&run)
            .into_iter()
            .map(Attached::Symbol)
            .collect();
        all.extend(
            self.labels_on(&run, LabelKind::Global)
                .into_iter()
                .map(Attached::GlobalLabel),
        );
        all.extend(
            self.labels_on(&run, LabelKind::Local)
                .into_iter()
                .map(Attached::Label),
        );
        all
    }
}

impl fmt::Debug for PinRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinRef")
            .field("symbol", &self.owner.key())
            .field("number", &self.number())
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for PinRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.pin, f)
    }
}
