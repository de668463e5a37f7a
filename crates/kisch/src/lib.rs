//! Object model over KiCad schematics.
//!
//! [`Schematic`] wraps one parsed `.kicad_sch` tree and exposes:
//!
//! * [`SymbolCollection`] - placed symbols in file order, addressable by
//!   Reference (`R1`) or, for multi-unit parts, by unit key (`U1_A`, `U1_B`);
//! * per-pin sheet coordinates derived from the embedded library part and the
//!   symbol's placement, rotation and mirror ([`geometry`]);
//! * "what is this pin connected to" queries that follow wires through shared
//!   endpoints ([`ConnectivityWalker`], [`SymbolRef`], [`PinRef`]).
//!
//! ```no_run
//! use kisch::{NewSymbol, Schematic};
//!
//! # fn main() -> kisch::Result<()> {
//! let text = std::fs::read_to_string("board.kicad_sch").unwrap();
//! let mut schematic = Schematic::parse(&text)?;
//! for label in schematic.symbol("U1").unwrap().attached_global_labels() {
//!     println!("U1 reaches {}", label.text());
//! }
//! schematic.add_symbol_from_lib("Device:R", NewSymbol::at("R10", 100.33, 50.8))?;
//! schematic.symbols_mut().get_mut("R10").unwrap().set_value("4k7")?;
//! println!("{schematic}");
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod connectivity;
pub mod error;
pub mod geometry;
pub mod library;
pub mod pin;
pub mod property;
pub mod schematic;
pub mod symbol;
pub mod view;
pub mod wire;

pub use collection::NamedCollection;
pub use connectivity::{ConnectivityWalker, WireRun};
pub use error::{Result, SchematicError};
pub use geometry::{MirrorAxis, Placement, Point, Rotation};
pub use library::{LibraryPinDef, LibrarySymbol, LibrarySymbols};
pub use pin::{InstancePin, PinCollection, SymbolPin};
pub use property::{Property, PropertyBag, PropertyChange};
pub use schematic::{NewSymbol, Schematic};
pub use symbol::{PinLookup, Symbol, SymbolCollection, SymbolMut};
pub use view::{Attached, PinRef, SymbolRef};
pub use wire::{Label, LabelCollection, LabelKind, Wire, WireCollection};
