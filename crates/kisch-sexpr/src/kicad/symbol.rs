//! KiCad library symbol helpers.
//!
//! Library symbols appear both in `.kicad_sym` files and embedded in a
//! schematic's `(lib_symbols ...)` block. Their pins live in nested
//! `(symbol "<name>_<unit>_<style>" ...)` sections.

use crate::Sexpr;

/// Return the symbol name from a `(symbol "<name>" ...)` list.
pub fn symbol_name(symbol: &[Sexpr]) -> Option<String> {
    if symbol.first().and_then(Sexpr::as_sym) != Some("symbol") {
        return None;
    }
    symbol.get(1).and_then(atom_to_string)
}

/// Nested `(symbol ...)` sections of a library symbol.
pub fn nested_symbols(symbol: &[Sexpr]) -> impl Iterator<Item = &[Sexpr]> {
    symbol
        .iter()
        .skip(2)
        .filter_map(Sexpr::as_list)
        .filter(|items| items.first().and_then(Sexpr::as_sym) == Some("symbol"))
}

/// Parse the trailing `_<unit>_<style>` of a nested section name.
///
/// Unit 0 holds items shared by every unit; style 1 is the normal body and
/// style 2 the De Morgan alternate.
pub fn nested_symbol_unit_style(section: &[Sexpr]) -> (u32, u32) {
    section
        .get(1)
        .and_then(Sexpr::as_atom)
        .map(|name| {
            let mut parts = name.rsplitn(3, '_');
            let style = parts
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let unit = parts
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            (unit, style)
        })
        .unwrap_or((0, 0))
}

fn atom_to_string(node: &Sexpr) -> Option<String> {
    if let Some(s) = node.as_atom() {
        return Some(s.to_string());
    }
    if let Some(i) = node.as_int() {
        return Some(i.to_string());
    }
    node.as_float().map(|f| f.to_string())
}
