//! KiCad-specific S-expression helpers.
//!
//! - [`props`] - common "property-like" query and update helpers
//! - [`schematic`] - placed-item helpers for `.kicad_sch` trees
//! - [`symbol`] - library symbol helpers for `(lib_symbols ...)` entries

pub mod props;
pub mod schematic;
pub mod symbol;

pub use props::{
    at_prop, child_list, int_prop, number_prop, set_child_values, string_list_prop, string_prop,
    sym_prop, yes_no_prop,
};
pub use schematic::{
    schematic_at, schematic_instance_paths, schematic_instance_references, schematic_mirror,
    schematic_pins, schematic_properties, set_instance_references, wire_endpoints,
};
pub use symbol::{nested_symbol_unit_style, nested_symbols, symbol_name};
