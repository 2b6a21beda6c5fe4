//! The retained scene graph.

mod computed;
mod document;
pub mod element;
pub mod mutation;
pub mod selector;
pub mod shape;
pub mod transform;
pub mod tree;

pub use computed::ElementStyle;
pub use document::{Lifecycle, Scene};
pub use element::Element;
pub use mutation::{MutationKind, MutationObserverInit, MutationRecord, ObserverId};
pub use selector::Selector;
pub use shape::{Outline, PointerTargets, ShapeKind, ShapeSpec, StyleSource};
pub use transform::Transform;
pub use tree::{ElementId, Tree};
