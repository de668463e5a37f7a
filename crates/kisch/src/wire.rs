//! Wire segments and net labels, indexed by exact coordinate.

use std::collections::HashMap;
use std::fmt;

use kisch_sexpr::Sexpr;
use kisch_sexpr::kicad::{at_prop, string_prop, sym_prop, wire_endpoints};

use crate::geometry::Point;

/// A straight wire segment between two sheet coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    start: Point,
    end: Point,
    uuid: Option<String>,
}

impl Wire {
    pub fn new(start: Point, end: Point) -> Self {
        Wire {
            start,
            end,
            uuid: None,
        }
    }

    pub(crate) fn from_node(items: &[Sexpr]) -> Option<Self> {
        let [start, end] = wire_endpoints(items)?;
        Some(Wire {
            start: start.into(),
            end: end.into(),
            uuid: string_prop(items, "uuid"),
        })
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn endpoints(&self) -> [Point; 2] {
        [self.start, self.end]
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn touches(&self, point: Point) -> bool {
        self.start == point || self.end == point
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<wire {} -> {}>", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Local,
    Global,
}

impl LabelKind {
    pub fn tag(self) -> &'static str {
        match self {
            LabelKind::Local => "label",
            LabelKind::Global => "global_label",
        }
    }
}

/// A `(label ...)` or `(global_label ...)` anchored at a sheet coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    text: String,
    at: Point,
    kind: LabelKind,
    /// Global labels only: `input`, `output`, `bidirectional`, ...
    shape: Option<String>,
    uuid: Option<String>,
}

impl Label {
    pub fn new(kind: LabelKind, text: impl Into<String>, at: Point) -> Self {
        Label {
            text: text.into(),
            at,
            kind,
            shape: None,
            uuid: None,
        }
    }

    pub(crate) fn from_node(items: &[Sexpr], kind: LabelKind) -> Option<Self> {
        let text = items.get(1)?.as_atom()?.to_string();
        let (x, y, _) = at_prop(items)?;
        Some(Label {
            text,
            at: Point::new(x, y),
            kind,
            shape: sym_prop(items, "shape"),
            uuid: string_prop(items, "uuid"),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn at(&self) -> Point {
        self.at
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    pub fn is_global(&self) -> bool {
        self.kind == LabelKind::Global
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.kind.tag(), self.text)
    }
}

/// Wires in file order plus an endpoint index.
#[derive(Debug, Clone, Default)]
pub struct WireCollection {
    wires: Vec<Wire>,
    by_endpoint: HashMap<Point, Vec<usize>>,
}

impl WireCollection {
    pub fn new(wires: impl IntoIterator<Item = Wire>) -> Self {
        let mut collection = WireCollection::default();
        for wire in wires {
            collection.push(wire);
        }
        collection
    }

    pub fn push(&mut self, wire: Wire) -> usize {
        let index = self.wires.len();
        self.by_endpoint.entry(wire.start).or_default().push(index);
        if wire.end != wire.start {
            self.by_endpoint.entry(wire.end).or_default().push(index);
        }
        self.wires.push(wire);
        index
    }

    pub fn len(&self) -> usize {
        self.wires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Wire> {
        self.wires.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Wire> {
        self.wires.iter()
    }

    /// Indices of wires with an endpoint exactly at `point`, in file order.
    pub fn indices_at(&self, point: Point) -> &[usize] {
        self.by_endpoint
            .get(&point)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Wires with an endpoint exactly at `point`.
    pub fn all_at(&self, point: Point) -> Vec<&Wire> {
        self.indices_at(point)
            .iter()
            .map(|&index| &self.wires[index])
            .collect()
    }
}

impl<'a> IntoIterator for &'a WireCollection {
    type Item = &'a Wire;
    type IntoIter = std::slice::Iter<'a, Wire>;

    fn into_iter(self) -> Self::IntoIter {
        self.wires.iter()
    }
}

/// Labels of one kind in file order plus an anchor index.
#[derive(Debug, Clone, Default)]
pub struct LabelCollection {
    labels: Vec<Label>,
    by_anchor: HashMap<Point, Vec<usize>>,
}

impl LabelCollection {
    pub fn new(labels: impl IntoIterator<Item = Label>) -> Self {
        let mut collection = LabelCollection::default();
        for label in labels {
            collection.push(label);
        }
        collection
    }

    pub fn push(&mut self, label: Label) -> usize {
        let index = self.labels.len();
        self.by_anchor.entry(label.at).or_default().push(index);
        self.labels.push(label);
        index
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    pub fn indices_at(&self, point: Point) -> &[usize] {
        self.by_anchor
            .get(&point)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Labels anchored exactly at `point`.
    pub fn all_at(&self, point: Point) -> Vec<&Label> {
        self.indices_at(point)
            .iter()
            .map(|&index| &self.labels[index])
            .collect()
    }

    /// Every label carrying `text`.
    pub fn named(&self, text: &str) -> Vec<&Label> {
        self.labels.iter().filter(|l| l.text == text).collect()
    }
}

impl<'a> IntoIterator for &'a LabelCollection {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kisch_sexpr::parse;

    #[test]
    fn reads_wire_endpoints_on_grid() {
        let node = parse(
            r#"(wire (pts (xy 100.33 50.8) (xy 110.49000001 50.8))
                (stroke (width 0) (type default)) (uuid "w1"))"#,
        )
        .unwrap();
        let wire = Wire::from_node(node.as_list().unwrap()).unwrap();
        assert_eq!(wire.start(), Point::new(100.33, 50.8));
        assert_eq!(wire.end().as_tuple(), (110.49, 50.8));
        assert_eq!(wire.uuid(), Some("w1"));
        assert!(wire.touches(Point::new(110.49, 50.8)));
    }

    #[test]
    fn reads_labels() {
        let local = parse(r#"(label "SDA" (at 10 20 0) (uuid "l1"))"#).unwrap();
        let label = Label::from_node(local.as_list().unwrap(), LabelKind::Local).unwrap();
        assert_eq!(label.text(), "SDA");
        assert_eq!(label.at(), Point::new(10.0, 20.0));
        assert!(!label.is_global());

        let global =
            parse(r#"(global_label "VBUS" (shape input) (at 5 5 180) (uuid "g1"))"#).unwrap();
        let label = Label::from_node(global.as_list().unwrap(), LabelKind::Global).unwrap();
        assert_eq!(label.shape(), Some("input"));
        assert_eq!(label.to_string(), "<global_label VBUS>");
    }

    #[test]
    fn endpoint_lookup_is_exact() {
        let wires = WireCollection::new([
            Wire::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
            Wire::new(Point::new(10.0, 0.0), Point::new(10.0, 10.0)),
            Wire::new(Point::new(20.0, 0.0), Point::new(30.0, 0.0)),
        ]);
        assert_eq!(wires.indices_at(Point::new(10.0, 0.0)), &[0, 1]);
        assert!(wires.all_at(Point::new(10.0001, 0.0)).is_empty());
        // Mid-segment points are not endpoints.
        assert!(wires.all_at(Point::new(25.0, 0.0)).is_empty());
    }

    #[test]
    fn zero_length_wire_is_indexed_once() {
        let p = Point::new(1.0, 1.0);
        let wires = WireCollection::new([Wire::new(p, p)]);
        assert_eq!(wires.indices_at(p), &[0]);
    }
}
