use crate::dom::{Dom, DomEvent, EventKind};
use crate::rules::FieldKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of elements filled per field kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReport {
    pub email: usize,
    pub password: usize,
}

impl FillReport {
    /// True when no field of either kind was found
    pub fn is_empty(&self) -> bool {
        self.email == 0 && self.password == 0
    }
}

/// The injection routine together with its two arguments
///
/// This is the function/arguments pair handed to a page host. Hosts that own
/// a [`Dom`] call [`apply`](Self::apply); hosts that run script in a real
/// page evaluate [`to_javascript`](Self::to_javascript).
#[derive(Clone)]
pub struct Injection {
    email: String,
    password: String,
}

impl Injection {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Fill every matching field and notify listeners
    ///
    /// Each candidate `<input>` gets its value set, then a bubbling `input`
    /// event, then a bubbling `change` event. Finding nothing is not an error.
    pub fn apply<D: Dom + ?Sized>(&self, dom: &mut D) -> FillReport {
        FillReport {
            email: fill_kind(dom, FieldKind::Email, &self.email),
            password: fill_kind(dom, FieldKind::Password, &self.password),
        }
    }

    /// Self-contained script expression performing the same routine in a page
    ///
    /// The expression evaluates to `{ email, password }` counts. Arguments are
    /// embedded as JSON string literals.
    pub fn to_javascript(&self) -> String {
        let email_selectors = json_literal(&FieldKind::Email.selectors());
        let password_selectors = json_literal(&FieldKind::Password.selectors());
        let email = json_literal(&self.email);
        let password = json_literal(&self.password);

        format!(
            r#"((email, password) => {{
    const fill = (selectors, value) => {{
        const seen = new Set();
        let filled = 0;
        for (const selector of selectors) {{
            for (const element of document.querySelectorAll(selector)) {{
                if (seen.has(element)) continue;
                seen.add(element);
                if (!(element instanceof HTMLInputElement)) continue;
                element.value = value;
                element.dispatchEvent(new Event('input', {{ bubbles: true }}));
                element.dispatchEvent(new Event('change', {{ bubbles: true }}));
                filled += 1;
            }}
        }}
        return filled;
    }};
    return {{
        email: fill({email_selectors}, email),
        password: fill({password_selectors}, password),
    }};
}})({email}, {password})"#
        )
    }
}

// The password stays out of logs and panics.
impl fmt::Debug for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injection")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn fill_kind<D: Dom + ?Sized>(dom: &mut D, kind: FieldKind, value: &str) -> usize {
    let mut filled = 0;

    for node in kind.candidates(&*dom) {
        if !dom.is_input_element(node) {
            continue;
        }
        dom.set_value(node, value);
        dom.dispatch_event(node, DomEvent::bubbling(EventKind::Input));
        dom.dispatch_event(node, DomEvent::bubbling(EventKind::Change));
        filled += 1;
    }

    tracing::debug!("Filled {} {} field(s)", filled, kind.as_str());
    filled
}

fn json_literal<T: Serialize + ?Sized>(value: &T) -> String {
    // Strings and string lists always serialize.
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
