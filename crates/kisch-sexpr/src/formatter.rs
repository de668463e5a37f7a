//! KiCad-style writer for S-expression trees.
//!
//! Output follows the layout KiCad 7+ writes for `.kicad_sch` files: tab
//! indentation, atom-only lists on one line, one child list per line, and
//! `(pts ...)` point runs kept together on a single indented line.

use crate::{Sexpr, SexprKind};

/// Formatting modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// Standard KiCad formatting.
    #[default]
    Normal,
    /// Keep text-property sublists (`font`, `stroke`, `fill`, ...) on a single line.
    CompactTextProperties,
}

const SHORT_FORM_TAGS: &[&str] = &["font", "stroke", "fill", "offset", "rotate", "scale"];

/// Format a tree as KiCad text. The returned string ends with a newline.
pub fn format_tree(sexpr: &Sexpr, mode: FormatMode) -> String {
    let mut out = String::new();
    write_node(sexpr, 0, mode, &mut out);
    out.push('\n');
    out
}

fn write_node(node: &Sexpr, depth: usize, mode: FormatMode, out: &mut String) {
    let Some(items) = node.as_list() else {
        write_atom(node, out);
        return;
    };

    let short_form = mode == FormatMode::CompactTextProperties
        && node.tag().is_some_and(|tag| SHORT_FORM_TAGS.contains(&tag));
    if short_form || items.iter().all(|item| !item.is_list()) {
        write_inline(node, out);
        return;
    }

    // Leading atoms stay on the opening line.
    let head_len = items.iter().take_while(|item| !item.is_list()).count();
    out.push('(');
    for (idx, item) in items[..head_len].iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        write_atom(item, out);
    }

    if node.tag() == Some("pts") {
        newline(depth + 1, out);
        for (idx, item) in items[head_len..].iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            write_inline(item, out);
        }
    } else {
        for item in &items[head_len..] {
            newline(depth + 1, out);
            write_node(item, depth + 1, mode, out);
        }
    }

    newline(depth, out);
    out.push(')');
}

fn write_inline(node: &Sexpr, out: &mut String) {
    match node.as_list() {
        Some(items) => {
            out.push('(');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(' ');
                }
                write_inline(item, out);
            }
            out.push(')');
        }
        None => write_atom(node, out),
    }
}

fn write_atom(node: &Sexpr, out: &mut String) {
    match &node.kind {
        SexprKind::Symbol(s) => out.push_str(s),
        SexprKind::String(s) => out.push_str(&quote_string(s)),
        SexprKind::Int(n) => match node.raw_atom.as_deref() {
            Some(raw) => out.push_str(raw),
            None => out.push_str(&n.to_string()),
        },
        SexprKind::F64(f) => match node.raw_atom.as_deref() {
            Some(raw) => out.push_str(raw),
            None => out.push_str(&trim_float(f.to_string())),
        },
        SexprKind::List(_) => write_inline(node, out),
    }
}

fn newline(depth: usize, out: &mut String) {
    out.push('\n');
    out.extend(std::iter::repeat_n('\t', depth));
}

/// Quote a string value, escaping special characters.
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

fn trim_float(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" => "0".to_string(),
        t => t.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{FormatMode, format_tree};
    use crate::{Sexpr, parse};

    #[test]
    fn formats_nested_lists_with_tabs() {
        let sexpr = parse(r#"(kicad_sch (version 20231120) (generator "eeschema") (paper "A4"))"#)
            .unwrap();
        assert_eq!(
            format_tree(&sexpr, FormatMode::Normal),
            "(kicad_sch\n\t(version 20231120)\n\t(generator \"eeschema\")\n\t(paper \"A4\")\n)\n"
        );
    }

    #[test]
    fn keeps_head_atoms_on_opening_line() {
        let sexpr = parse(r#"(property "Reference" "R1" (at 1 2 0))"#).unwrap();
        assert_eq!(
            format_tree(&sexpr, FormatMode::Normal),
            "(property \"Reference\" \"R1\"\n\t(at 1 2 0)\n)\n"
        );
    }

    #[test]
    fn keeps_points_on_one_line() {
        let sexpr = parse("(wire (pts (xy 1 2) (xy 3 4)))").unwrap();
        assert_eq!(
            format_tree(&sexpr, FormatMode::Normal),
            "(wire\n\t(pts\n\t\t(xy 1 2) (xy 3 4)\n\t)\n)\n"
        );
    }

    #[test]
    fn compact_mode_inlines_font() {
        let sexpr = parse("(effects (font (size 1.27 1.27)) (justify left))").unwrap();
        assert_eq!(
            format_tree(&sexpr, FormatMode::CompactTextProperties),
            "(effects\n\t(font (size 1.27 1.27))\n\t(justify left)\n)\n"
        );
        assert_eq!(
            format_tree(&sexpr, FormatMode::Normal),
            "(effects\n\t(font\n\t\t(size 1.27 1.27)\n\t)\n\t(justify left)\n)\n"
        );
    }

    #[test]
    fn preserves_parsed_numeric_lexemes() {
        let sexpr = parse("(at 12.700 -0.000 90)").unwrap();
        assert_eq!(format_tree(&sexpr, FormatMode::Normal), "(at 12.700 -0.000 90)\n");
    }

    #[test]
    fn synthesized_floats_are_trimmed() {
        let sexpr = Sexpr::list(vec![
            Sexpr::symbol("size"),
            Sexpr::float(1.27),
            Sexpr::float(2.5400),
        ]);
        assert_eq!(format_tree(&sexpr, FormatMode::Normal), "(size 1.27 2.54)\n");
    }

    #[test]
    fn roundtrip_reparses_equal() {
        let inputs = [
            "(simple list)",
            r#"(label "a \"quoted\" (paren)" (at 1 2 0))"#,
            r#"(pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))"#,
        ];
        for input in inputs {
            let parsed = parse(input).unwrap();
            let formatted = format_tree(&parsed, FormatMode::Normal);
            assert_eq!(parse(&formatted).unwrap(), parsed, "roundtrip failed for {input}");
        }
    }
}
