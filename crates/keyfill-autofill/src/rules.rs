use crate::dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};

/// The two kinds of login field the engine fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Email,
    Password,
}

/// One way of recognising a field from its markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// `type` attribute equals the value (ASCII case-insensitive)
    TypeIs(&'static str),
    /// Attribute value contains the needle (case-insensitive)
    AttributeContains {
        attribute: &'static str,
        needle: &'static str,
    },
}

// The trailing "mail" rules catch markup such as `id="user-mail"` or
// `name="e_mail"` that never spells out "email". Placeholders are prose
// ("Mailing address"), so they only match the full word.
const EMAIL_RULES: [MatchRule; 6] = [
    MatchRule::TypeIs("email"),
    MatchRule::AttributeContains { attribute: "name", needle: "email" },
    MatchRule::AttributeContains { attribute: "id", needle: "email" },
    MatchRule::AttributeContains { attribute: "placeholder", needle: "email" },
    MatchRule::AttributeContains { attribute: "name", needle: "mail" },
    MatchRule::AttributeContains { attribute: "id", needle: "mail" },
];

const PASSWORD_RULES: [MatchRule; 4] = [
    MatchRule::TypeIs("password"),
    MatchRule::AttributeContains { attribute: "name", needle: "pass" },
    MatchRule::AttributeContains { attribute: "id", needle: "pass" },
    MatchRule::AttributeContains { attribute: "placeholder", needle: "pass" },
];

impl FieldKind {
    /// Rules in the order their matches are collected
    pub fn rules(self) -> &'static [MatchRule] {
        match self {
            FieldKind::Email => &EMAIL_RULES,
            FieldKind::Password => &PASSWORD_RULES,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::Password => "password",
        }
    }

    /// CSS selectors equivalent to [`rules`](Self::rules)
    pub fn selectors(self) -> Vec<String> {
        self.rules().iter().map(MatchRule::css_selector).collect()
    }

    /// Elements matching any rule, each listed once, in first-match order
    ///
    /// Hidden, disabled and off-screen elements are not excluded.
    pub fn candidates<D: Dom + ?Sized>(self, dom: &D) -> Vec<NodeId> {
        let elements = dom.elements();
        let mut found: Vec<NodeId> = Vec::new();

        for rule in self.rules() {
            for &node in &elements {
                if !found.contains(&node) && rule.matches(dom, node) {
                    found.push(node);
                }
            }
        }

        found
    }
}

impl MatchRule {
    pub fn matches<D: Dom + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        match self {
            MatchRule::TypeIs(expected) => dom
                .attribute(node, "type")
                .is_some_and(|value| value.eq_ignore_ascii_case(expected)),
            MatchRule::AttributeContains { attribute, needle } => dom
                .attribute(node, attribute)
                .is_some_and(|value| value.to_lowercase().contains(needle)),
        }
    }

    /// Selector with the same meaning, for running inside a real page
    pub fn css_selector(&self) -> String {
        match self {
            MatchRule::TypeIs(expected) => format!("[type=\"{}\" i]", expected),
            MatchRule::AttributeContains { attribute, needle } => {
                format!("[{}*=\"{}\" i]", attribute, needle)
            }
        }
    }
}
