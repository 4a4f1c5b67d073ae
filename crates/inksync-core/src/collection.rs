//! The ordered set of elements a client renders.
//!
//! Order is paint order: later elements draw on top. Identifiers are unique
//! within a collection; every mutation primitive keeps it that way.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::element::{Element, ElementId, ElementPatch};
use crate::error::SnapshotError;

/// Result of appending an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// Added on top
    New,
    /// An element with the same identifier already existed and was
    /// overwritten in place
    Replaced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    elements: Vec<Element>,
}

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, rejecting duplicate identifiers
    pub fn from_elements(elements: Vec<Element>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(elements.len());
        for el in &elements {
            if !seen.insert(&el.id) {
                return Err(SnapshotError::DuplicateId(el.id.clone()));
            }
        }
        Ok(Self { elements })
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in paint order, bottom first
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Get an element by id
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|el| &el.id == id)
    }

    /// Check if an element with this id exists
    pub fn contains(&self, id: &ElementId) -> bool {
        self.position(id).is_some()
    }

    /// Paint-order index of an element
    pub fn position(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|el| &el.id == id)
    }

    /// Add an element on top. An identifier collision overwrites the existing
    /// element at its current paint position.
    pub fn append(&mut self, element: Element) -> Appended {
        match self.position(&element.id) {
            Some(idx) => {
                warn!(id = %element.id, "element id collision, overwriting existing element");
                self.elements[idx] = element;
                Appended::Replaced
            }
            None => {
                self.elements.push(element);
                Appended::New
            }
        }
    }

    /// Replace the element carrying the same identifier. Returns false when
    /// no such element exists.
    pub fn merge_update(&mut self, element: Element) -> bool {
        match self.position(&element.id) {
            Some(idx) => {
                self.elements[idx] = element;
                true
            }
            None => false,
        }
    }

    /// Merge a field patch into an element, returning the merged result
    pub fn patch(&mut self, id: &ElementId, patch: &ElementPatch) -> Option<&Element> {
        let idx = self.position(id)?;
        let el = &mut self.elements[idx];
        el.apply_patch(patch);
        Some(&*el)
    }

    pub fn translate(&mut self, id: &ElementId, dx: f64, dy: f64) -> Option<&Element> {
        let idx = self.position(id)?;
        let el = &mut self.elements[idx];
        el.translate(dx, dy);
        Some(&*el)
    }

    /// Remove by identifier. Removing an unknown identifier is a no-op.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let idx = self.position(id)?;
        Some(self.elements.remove(idx))
    }

    /// Bulk reset. Duplicate identifiers in `elements` collapse onto the
    /// first occurrence's position, last value wins.
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements.clear();
        for el in elements {
            self.append(el);
        }
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    // --- Snapshot export/import ---

    /// Serialize as a JSON array of element records
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.elements)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(&self.elements)?)
    }

    /// Parse a JSON array of element records
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let elements: Vec<Element> = serde_json::from_str(json)?;
        Self::from_elements(elements)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
        }
        let json = self.to_json_pretty()?;
        fs::write(path, json).map_err(|e| SnapshotError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_json(&json)
    }
}

impl From<Collection> for Vec<Element> {
    fn from(collection: Collection) -> Self {
        collection.elements
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Shape, Style};
    use proptest::prelude::*;

    fn circle(id: &str, radius: f64) -> Element {
        Element::with_id(
            id.into(),
            Shape::Circle { x: 0.0, y: 0.0, radius },
            &Style::default(),
        )
    }

    fn ids(c: &Collection) -> Vec<&str> {
        c.iter().map(|el| el.id.as_str()).collect()
    }

    #[test]
    fn append_keeps_paint_order() {
        let mut c = Collection::new();
        c.append(circle("a", 1.0));
        c.append(circle("b", 2.0));
        c.append(circle("c", 3.0));
        assert_eq!(ids(&c), ["a", "b", "c"]);
    }

    #[test]
    fn colliding_append_overwrites_in_place() {
        let mut c = Collection::new();
        c.append(circle("a", 1.0));
        c.append(circle("b", 2.0));
        assert_eq!(c.append(circle("a", 9.0)), Appended::Replaced);
        assert_eq!(ids(&c), ["a", "b"]);
        assert_eq!(c.get(&"a".into()).unwrap().shape, circle("a", 9.0).shape);
    }

    #[test]
    fn merge_update_of_unknown_id_is_dropped() {
        let mut c = Collection::new();
        c.append(circle("a", 1.0));
        assert!(!c.merge_update(circle("zzz", 5.0)));
        assert_eq!(c.len(), 1);
        assert!(c.merge_update(circle("a", 5.0)));
        assert_eq!(c.get(&"a".into()).unwrap().shape, circle("a", 5.0).shape);
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let mut c = Collection::new();
        c.append(circle("a", 1.0));
        let before = c.clone();
        assert!(c.remove(&"missing".into()).is_none());
        assert!(c.remove(&"missing".into()).is_none());
        assert_eq!(c, before);
    }

    #[test]
    fn replace_all_collapses_duplicates() {
        let mut c = Collection::new();
        c.append(circle("x", 1.0));
        c.replace_all(vec![circle("a", 1.0), circle("b", 2.0), circle("a", 3.0)]);
        assert_eq!(ids(&c), ["a", "b"]);
        assert_eq!(c.get(&"a".into()).unwrap().shape, circle("a", 3.0).shape);
    }

    #[test]
    fn import_rejects_duplicates_and_garbage() {
        let dup = r#"[{"id":"a","type":"circle","x":0,"y":0,"radius":1},
                      {"id":"a","type":"circle","x":0,"y":0,"radius":2}]"#;
        assert!(matches!(Collection::from_json(dup), Err(SnapshotError::DuplicateId(_))));
        assert!(matches!(Collection::from_json("{\"elements\":[]}"), Err(SnapshotError::Parse(_))));
        assert!(matches!(Collection::from_json("not json"), Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn export_import_preserves_order_and_fields() {
        let mut c = Collection::new();
        c.append(circle("b", 2.0));
        c.append(Element::text(crate::element::Point::new(1.0, 2.0), "hi", &Style::default()));
        c.append(circle("a", 1.0));

        let json = c.to_json().unwrap();
        assert!(json.starts_with('['));
        assert_eq!(Collection::from_json(&json).unwrap(), c);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(u8),
        Remove(u8),
        Reset(Vec<u8>),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6).prop_map(Op::Append),
            (0u8..6).prop_map(Op::Remove),
            proptest::collection::vec(0u8..6, 0..5).prop_map(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn identifiers_stay_unique(ops in proptest::collection::vec(op(), 0..40)) {
            let mut c = Collection::new();
            for op in ops {
                match op {
                    Op::Append(n) => { c.append(circle(&n.to_string(), n as f64)); }
                    Op::Remove(n) => { c.remove(&n.to_string().into()); }
                    Op::Reset(ns) => {
                        c.replace_all(ns.iter().map(|n| circle(&n.to_string(), 0.0)).collect());
                    }
                }
                let unique: HashSet<_> = c.iter().map(|el| el.id.clone()).collect();
                prop_assert_eq!(unique.len(), c.len());
            }
        }
    }

    #[test]
    fn save_and_load_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boards").join("whiteboard.json");

        let mut c = Collection::new();
        c.append(circle("a", 1.0));
        c.save(&path).unwrap();

        assert_eq!(Collection::load(&path).unwrap(), c);
        assert!(matches!(
            Collection::load(&dir.path().join("missing.json")),
            Err(SnapshotError::Io { .. })
        ));
    }
}
