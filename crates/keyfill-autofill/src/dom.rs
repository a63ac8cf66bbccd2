//! Minimal view of a page's DOM as the injection routine needs it, plus an
//! in-memory [`Document`] that implements it.

use serde::{Deserialize, Serialize};

/// Index of an element within its document
pub type NodeId = usize;

/// DOM operations the injection routine performs
pub trait Dom {
    /// Every element, in document order
    fn elements(&self) -> Vec<NodeId>;

    /// Attribute value; attribute names are matched case-insensitively
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Whether the element is an `<input>` whose value can be written
    fn is_input_element(&self, node: NodeId) -> bool;

    fn set_value(&mut self, node: NodeId, value: &str);

    fn dispatch_event(&mut self, node: NodeId, event: DomEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Input,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomEvent {
    pub kind: EventKind,
    pub bubbles: bool,
}

impl DomEvent {
    pub fn bubbling(kind: EventKind) -> Self {
        Self {
            kind,
            bubbles: true,
        }
    }
}

/// An event as observed by a listener on some element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedEvent {
    pub event: DomEvent,
    pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    value: String,
    observed: Vec<ObservedEvent>,
}

/// In-memory document tree
///
/// Records every event that reaches each element, so callers can check what
/// a listener on the target or any ancestor would have seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element under `parent` (or at the top level)
    pub fn append(
        &mut self,
        parent: Option<NodeId>,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        let value = attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("value"))
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();

        self.elements.push(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                .collect(),
            parent,
            value,
            observed: Vec::new(),
        });
        self.elements.len() - 1
    }

    /// Append a top-level `<input>`
    pub fn input(&mut self, attributes: &[(&str, &str)]) -> NodeId {
        self.append(None, "input", attributes)
    }

    /// Current value of an element
    pub fn value(&self, node: NodeId) -> Option<&str> {
        self.elements.get(node).map(|element| element.value.as_str())
    }

    /// Events that reached `node`, either as target or by bubbling
    pub fn observed_events(&self, node: NodeId) -> &[ObservedEvent] {
        self.elements
            .get(node)
            .map(|element| element.observed.as_slice())
            .unwrap_or_default()
    }

    /// Events dispatched with `node` as their target
    pub fn events_targeting(&self, node: NodeId) -> Vec<EventKind> {
        self.observed_events(node)
            .iter()
            .filter(|observed| observed.target == node)
            .map(|observed| observed.event.kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Dom for Document {
    fn elements(&self) -> Vec<NodeId> {
        (0..self.elements.len()).collect()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.elements.get(node).and_then(|element| {
            element
                .attributes
                .iter()
                .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        })
    }

    fn is_input_element(&self, node: NodeId) -> bool {
        self.elements
            .get(node)
            .is_some_and(|element| element.tag == "input")
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.elements.get_mut(node) {
            element.value = value.to_string();
        }
    }

    fn dispatch_event(&mut self, node: NodeId, event: DomEvent) {
        let observed = ObservedEvent {
            event,
            target: node,
        };

        let mut current = Some(node);
        while let Some(id) = current {
            let Some(element) = self.elements.get_mut(id) else {
                break;
            };
            element.observed.push(observed);
            if !event.bubbles {
                break;
            }
            current = element.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let mut doc = Document::new();
        let input = doc.input(&[("PlaceHolder", "Email")]);
        assert_eq!(doc.attribute(input, "placeholder"), Some("Email"));
        assert_eq!(doc.attribute(input, "PLACEHOLDER"), Some("Email"));
        assert_eq!(doc.attribute(input, "name"), None);
    }

    #[test]
    fn test_initial_value_from_attribute() {
        let mut doc = Document::new();
        let input = doc.input(&[("value", "prefilled")]);
        assert_eq!(doc.value(input), Some("prefilled"));
    }

    #[test]
    fn test_bubbling_event_reaches_ancestors() {
        let mut doc = Document::new();
        let form = doc.append(None, "form", &[]);
        let div = doc.append(Some(form), "div", &[]);
        let input = doc.append(Some(div), "input", &[]);
        let sibling = doc.append(Some(form), "input", &[]);

        doc.dispatch_event(input, DomEvent::bubbling(EventKind::Input));

        assert_eq!(doc.events_targeting(input), vec![EventKind::Input]);
        assert_eq!(doc.observed_events(div).len(), 1);
        assert_eq!(doc.observed_events(form)[0].target, input);
        assert!(doc.observed_events(sibling).is_empty());
    }

    #[test]
    fn test_non_bubbling_event_stays_on_target() {
        let mut doc = Document::new();
        let form = doc.append(None, "form", &[]);
        let input = doc.append(Some(form), "input", &[]);

        doc.dispatch_event(
            input,
            DomEvent {
                kind: EventKind::Change,
                bubbles: false,
            },
        );

        assert_eq!(doc.observed_events(input).len(), 1);
        assert!(doc.observed_events(form).is_empty());
    }

    #[test]
    fn test_only_input_tag_is_input_element() {
        let mut doc = Document::new();
        let input = doc.append(None, "INPUT", &[]);
        let textarea = doc.append(None, "textarea", &[("name", "email")]);
        assert!(doc.is_input_element(input));
        assert!(!doc.is_input_element(textarea));
    }
}
