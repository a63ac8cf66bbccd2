pub mod autofill;
pub mod dom;
pub mod error;
pub mod executor;
pub mod injection;
pub mod rules;

pub use autofill::Autofill;
pub use dom::{Document, Dom, DomEvent, EventKind, NodeId};
pub use error::{Error, Result};
pub use executor::{LocalExecutor, PageExecutor, TabId, TabInfo, TabResolver};
pub use injection::{FillReport, Injection};
pub use rules::{FieldKind, MatchRule};
