use thiserror::Error;

use crate::scene::ElementId;

/// Structural misuse of the scene tree. These are programming errors and are
/// reported immediately rather than recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("appending {child:?} to {parent:?} would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },
    #[error("node is not child")]
    NotChild,
    #[error("reference node is not a child of the parent")]
    ReferenceNotChild,
    #[error("element {0:?} does not exist or was destroyed")]
    StaleElement(ElementId),
    #[error("the document element cannot be removed, reparented or destroyed")]
    DocumentElement,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("plugin '{plugin}' failed to initialize: {reason}")]
    Init { plugin: String, reason: String },
    #[error("a plugin named '{0}' is already registered")]
    Duplicate(String),
    #[error("no plugin named '{0}' is registered")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("the canvas has been destroyed")]
    Destroyed,
}
