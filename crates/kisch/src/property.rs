//! Named text properties of a placed symbol (`Reference`, `Value`, `Footprint`, ...).
//!
//! Every write returns a [`PropertyChange`]; the owner decides what to do with
//! it. The symbol collection uses Reference changes to re-key its index.

use kisch_sexpr::kicad::props::set_child_values;
use kisch_sexpr::kicad::schematic::property_entry;
use kisch_sexpr::{ListBuilder, Sexpr};

pub const REFERENCE: &str = "Reference";
pub const VALUE: &str = "Value";

/// One `(property "NAME" "VALUE" ...)` entry, keeping its node for round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    value: String,
    node: Sexpr,
}

impl Property {
    /// New property with KiCad's default text effects, anchored at `(x, y)`.
    pub fn new(name: impl Into<String>, value: impl Into<String>, at: (f64, f64)) -> Self {
        let name = name.into();
        let value = value.into();

        let mut at_node = ListBuilder::node("at");
        at_node.push(at.0).push(at.1).push(0i64);
        let mut size = ListBuilder::node("size");
        size.push(Sexpr::float(1.27)).push(Sexpr::float(1.27));
        let mut font = ListBuilder::node("font");
        font.push(size.build());
        let mut effects = ListBuilder::node("effects");
        effects.push(font.build());

        let mut node = ListBuilder::node("property");
        node.push(Sexpr::string(name.as_str()))
            .push(Sexpr::string(value.as_str()))
            .push(at_node.build())
            .push(effects.build());

        Property {
            name,
            value,
            node: node.build(),
        }
    }

    pub(crate) fn from_node(node: &Sexpr) -> Option<Self> {
        let (name, value) = property_entry(node)?;
        Some(Property {
            name,
            value,
            node: node.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn node(&self) -> &Sexpr {
        &self.node
    }

    /// Move the property's text anchor.
    pub fn set_position(&mut self, x: f64, y: f64) {
        if let Some(items) = self.node.as_list_mut() {
            let rotation = kisch_sexpr::kicad::at_prop(items)
                .and_then(|(_, _, rot)| rot)
                .unwrap_or(0.0);
            set_child_values(
                items,
                "at",
                vec![Sexpr::number(x), Sexpr::number(y), Sexpr::number(rotation)],
            );
        }
    }

    fn replace_value(&mut self, value: String) -> String {
        if let Some(items) = self.node.as_list_mut() {
            while items.len() < 3 {
                items.push(Sexpr::string(""));
            }
            items[2] = Sexpr::string(value.as_str());
        }
        std::mem::replace(&mut self.value, value)
    }
}

/// Emitted for every property write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub name: String,
    pub new: String,
    /// `None` when the write created the property.
    pub old: Option<String>,
}

impl PropertyChange {
    pub fn is_reference(&self) -> bool {
        self.name == REFERENCE
    }
}

/// Ordered name → value mapping of a symbol's properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    properties: Vec<Property>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `(property ...)` child of a placed symbol node.
    pub(crate) fn from_symbol_items(items: &[Sexpr]) -> Self {
        PropertyBag {
            properties: items.iter().filter_map(Property::from_node).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.properties.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(Property::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Write `value`, creating the property at the end when it does not exist yet.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> PropertyChange {
        let value = value.into();
        let old = match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => Some(existing.replace_value(value.clone())),
            None => {
                self.properties.push(Property::new(name, value.clone(), (0.0, 0.0)));
                None
            }
        };
        PropertyChange {
            name: name.to_string(),
            new: value,
            old,
        }
    }

    pub fn push(&mut self, property: Property) {
        self.properties.push(property);
    }

    pub fn remove(&mut self, name: &str) -> Option<Property> {
        let position = self.properties.iter().position(|p| p.name == name)?;
        Some(self.properties.remove(position))
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}
