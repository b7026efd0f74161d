//! Error type shared by the engine's mount, update, and destroy paths.

use thiserror::Error;

/// Errors surfaced by [`Engine`](crate::Engine) operations.
///
/// Variants carry plain message payloads rather than opaque sources so the
/// type stays `Clone` and `PartialEq`; a single cycle failure may have to be
/// delivered to several pending flush waiters.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A render changed the root node type while the caller had disabled
    /// root replacements. No DOM mutation has happened and the previously
    /// mounted element is still attached.
    #[error("changing the root node type from {from} to {to} is not allowed for this update")]
    RootTypeChange {
        /// Type label of the currently mounted root.
        from: String,
        /// Type label the new render asked for.
        to: String,
    },

    /// The component was never initialized, or has since been destroyed.
    #[error("component is not mounted")]
    NotMounted,

    /// The component is already mounted. A component instance can only
    /// appear in one place in the tree at a time.
    #[error("component is already mounted")]
    AlreadyMounted,

    /// A component hook reported a failure.
    #[error("component failure: {0}")]
    Component(String),
}

impl Error {
    /// Wrap a failure message coming out of a component's own `update` or
    /// `destroy` implementation.
    pub fn component(message: impl Into<String>) -> Self {
        Error::Component(message.into())
    }
}
