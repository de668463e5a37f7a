//! Pins of placed symbols.
//!
//! A placed symbol only records pin numbers (and their uuids); names and
//! geometry come from the library part. [`SymbolPin`] pairs the two.

use std::collections::HashMap;
use std::fmt;

use crate::collection::NamedCollection;
use crate::geometry::{Placement, Point, transform_pin};
use crate::library::LibraryPinDef;
use crate::symbol::Symbol;

/// `(pin "<number>" (uuid "..."))` as stored on a placed symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePin {
    pub number: String,
    pub uuid: Option<String>,
}

impl InstancePin {
    pub fn new(number: impl Into<String>, uuid: Option<String>) -> Self {
        InstancePin {
            number: number.into(),
            uuid,
        }
    }
}

/// An instance pin matched with its library definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPin {
    uuid: Option<String>,
    def: LibraryPinDef,
}

impl SymbolPin {
    pub fn number(&self) -> &str {
        &self.def.number
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn library_pin(&self) -> &LibraryPinDef {
        &self.def
    }

    pub fn has_generic_name(&self) -> bool {
        self.def.has_generic_name()
    }

    /// Absolute pin tip placement on `symbol`.
    pub fn placement_on(&self, symbol: &Symbol) -> Placement {
        transform_pin(&symbol.placement(), symbol.mirror(), &self.def.at)
    }

    /// Absolute pin tip coordinate on `symbol`.
    pub fn location_on(&self, symbol: &Symbol) -> Point {
        self.placement_on(symbol).point()
    }
}

impl fmt::Display for SymbolPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<SymbolPin {} \"{}\">", self.number(), self.name())
    }
}

pub type PinCollection = NamedCollection<SymbolPin>;

/// Named pins are keyed by name, unnamed (`~`) pins by number.
fn pin_key(pin: &SymbolPin) -> String {
    if pin.has_generic_name() {
        pin.number().to_string()
    } else {
        pin.name().to_string()
    }
}

/// Pair every instance pin with the library pin of the same number.
///
/// Instance pins without a definition are dropped; several pins sharing a name
/// (e.g. multiple `GND`) stay reachable by index and number.
pub(crate) fn build_pin_collection<'a>(
    instance_pins: &[InstancePin],
    defs: impl IntoIterator<Item = &'a LibraryPinDef>,
) -> PinCollection {
    let by_number: HashMap<&str, &LibraryPinDef> =
        defs.into_iter().map(|d| (d.number.as_str(), d)).collect();

    let pins = instance_pins.iter().filter_map(|instance| {
        let Some(def) = by_number.get(instance.number.as_str()) else {
            log::debug!(
                "Dropping instance pin {}: no library definition",
                instance.number
            );
            return None;
        };
        Some(SymbolPin {
            uuid: instance.uuid.clone(),
            def: (*def).clone(),
        })
    });

    NamedCollection::from_elements_lenient(pins, pin_key)
}
