use std::collections::{BTreeMap, BTreeSet};

use scraper::{ElementRef, Html};

/// The slice of a document the widget needs: id lookup, markup injection
/// and class toggling.
pub trait Document {
    fn contains(&self, id: &str) -> bool;

    /// Replaces the element's content. Returns `false` when `id` is unknown.
    fn set_inner_html(&mut self, id: &str, html: &str) -> bool;

    fn inner_html(&self, id: &str) -> Option<&str>;

    /// `force` behaves like `DOMTokenList.toggle`: `None` flips, `Some(on)` sets.
    /// Returns whether the class is present afterwards, or `None` for an unknown id.
    fn toggle_class(&mut self, id: &str, class: &str, force: Option<bool>) -> Option<bool>;

    fn has_class(&self, id: &str, class: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct MemoryElement {
    parent: Option<String>,
    classes: BTreeSet<String>,
    inner_html: String,
}

/// Document kept in memory. Elements carrying an `id` inside injected
/// markup become addressable, and disappear when their parent's content is
/// replaced again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryDocument {
    elements: BTreeMap<String, MemoryElement>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_element(&mut self, id: &str, parent: Option<&str>, classes: &[&str]) {
        self.elements.insert(
            id.to_owned(),
            MemoryElement {
                parent: parent.map(str::to_owned),
                classes: classes.iter().map(|class| (*class).to_owned()).collect(),
                inner_html: String::new(),
            },
        );
    }

    pub fn with_element(mut self, id: &str, parent: Option<&str>, classes: &[&str]) -> Self {
        self.insert_element(id, parent, classes);
        self
    }

    fn remove_descendants(&mut self, id: &str) {
        let children = self
            .elements
            .iter()
            .filter(|(_, element)| element.parent.as_deref() == Some(id))
            .map(|(child_id, _)| child_id.clone())
            .collect::<Vec<_>>();
        for child_id in children {
            self.remove_descendants(&child_id);
            self.elements.remove(&child_id);
        }
    }
}

impl Document for MemoryDocument {
    fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn set_inner_html(&mut self, id: &str, html: &str) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };
        element.inner_html = html.to_owned();
        self.remove_descendants(id);

        let fragment = Html::parse_fragment(html);
        for node in fragment.root_element().descendants() {
            let Some(child) = ElementRef::wrap(node) else {
                continue;
            };
            let Some(child_id) = child.value().id() else {
                continue;
            };
            // Nested ids are flattened under the injection target.
            self.elements.insert(
                child_id.to_owned(),
                MemoryElement {
                    parent: Some(id.to_owned()),
                    classes: child.value().classes().map(str::to_owned).collect(),
                    inner_html: child.inner_html(),
                },
            );
        }
        true
    }

    fn inner_html(&self, id: &str) -> Option<&str> {
        self.elements
            .get(id)
            .map(|element| element.inner_html.as_str())
    }

    fn toggle_class(&mut self, id: &str, class: &str, force: Option<bool>) -> Option<bool> {
        let element = self.elements.get_mut(id)?;
        let present = force.unwrap_or(!element.classes.contains(class));
        if present {
            element.classes.insert(class.to_owned());
        } else {
            element.classes.remove(class);
        }
        Some(present)
    }

    fn has_class(&self, id: &str, class: &str) -> bool {
        self.elements
            .get(id)
            .is_some_and(|element| element.classes.contains(class))
    }
}
