//! Wire-run crawling for "what is this pin connected to" queries.
//!
//! Connections are exact coordinate matches: a wire joins whatever sits on one
//! of its two endpoints. A crawl starts from a point, follows wires through
//! shared endpoints (never through symbol pins) and reports everything anchored
//! on the run. No netlist is built.

use std::collections::HashSet;

use crate::geometry::Point;
use crate::schematic::Schematic;
use crate::wire::LabelKind;

/// Wires reached by a crawl and the endpoints they cover.
#[derive(Debug, Clone, Default)]
pub struct WireRun {
    /// Wire indices in discovery order.
    wires: Vec<usize>,
    /// Endpoints in discovery order.
    points: Vec<Point>,
    point_set: HashSet<Point>,
}

impl WireRun {
    pub fn wires(&self) -> &[usize] {
        &self.wires
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn contains(&self, point: Point) -> bool {
        self.point_set.contains(&point)
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    fn add_point(&mut self, point: Point) -> bool {
        if self.point_set.insert(point) {
            self.points.push(point);
            true
        } else {
            false
        }
    }
}

/// Read-only connectivity queries over one schematic.
#[derive(Clone, Copy)]
pub struct ConnectivityWalker<'a> {
    schematic: &'a Schematic,
}

impl<'a> ConnectivityWalker<'a> {
    pub fn new(schematic: &'a Schematic) -> Self {
        ConnectivityWalker { schematic }
    }

    /// Indices of wires with an endpoint exactly at `point`.
    pub fn wires_at(&self, point: Point) -> &'a [usize] {
        self.schematic.wires().indices_at(point)
    }

    /// Every wire transitively connected to `start` through shared endpoints.
    pub fn crawl(&self, start: Point) -> WireRun {
        let wires = self.schematic.wires();
        let mut run = WireRun::default();
        if wires.is_empty() {
            log::debug!("No wires in schematic; nothing connects to {start}");
            return run;
        }

        let mut visited: HashSet<usize> = HashSet::new();
        let mut pending: Vec<usize> = self.wires_at(start).to_vec();
        pending.reverse();

        while let Some(index) = pending.pop() {
            if !visited.insert(index) {
                continue;
            }
            run.wires.push(index);
            let Some(wire) = wires.get(index) else {
                continue;
            };
            for endpoint in wire.endpoints() {
                if run.add_point(endpoint) {
                    pending.extend(
                        self.wires_at(endpoint)
                            .iter()
                            .rev()
                            .filter(|next| !visited.contains(*next)),
                    );
                }
            }
        }

        log::trace!(
            "Crawl from {start} reached {} wires, {} endpoints",
            run.wires.len(),
            run.points.len()
        );
        run
    }

    /// Indices of labels of `kind` anchored on an endpoint of `run`, first-seen order.
    pub fn labels_on(&self, run: &WireRun, kind: LabelKind) -> Vec<usize> {
        let labels = match kind {
            LabelKind::Local => self.schematic.labels(),
            LabelKind::Global => self.schematic.global_labels(),
        };
        let mut seen = HashSet::new();
        run.points()
            .iter()
            .flat_map(|&point| labels.indices_at(point).iter().copied())
            .filter(|index| seen.insert(*index))
            .collect()
    }

    /// Indices of symbols with a pin on an endpoint of `run`, in file order.
    pub fn symbols_on(&self, run: &WireRun, exclude: Option<usize>) -> Vec<usize> {
        if run.is_empty() {
            return Vec::new();
        }
        let symbols = self.schematic.symbols();
        let library = self.schematic.library();
        symbols
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != exclude)
            .filter(|(_, symbol)| {
                symbols
                    .pins_of(symbol, library)
                    .iter()
                    .any(|pin| run.contains(pin.location_on(symbol)))
            })
            .map(|(index, _)| index)
            .collect()
    }
}
