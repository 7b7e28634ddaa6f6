//! Incremental tree reconciliation for `WaterUI` backends.
//!
//! Given an immutable [`Description`] of the desired tree and the mutable
//! [`Instance`] tree last applied to a host container, osmosis computes and
//! applies the minimal set of host mutations so the live tree matches the
//! description, preserving component identity, local state and host nodes
//! wherever possible.
//!
//! The crate owns the recursive dispatch ([`patch`]) and the entry points
//! ([`Renderer`]); everything platform- or component-specific (keyed
//! child-list diffing, attribute application, component execution, recovery
//! policy for suspended or failed subtrees) is consumed through the
//! [`Backend`] and [`Host`] traits.
//!
//! # Example
//!
//! ```ignore
//! use osmosis::{Description, Props, Renderer};
//!
//! let mut renderer = Renderer::new();
//! let view = Description::element(
//!     "div",
//!     Props::new()
//!         .attr("class", "greeting")
//!         .child(Description::text("hello")),
//! );
//! renderer.render(&mut backend, view, container)?;
//! ```

pub mod ambient;
pub mod backend;
pub mod description;
pub mod error;
pub mod instance;
pub mod patch;
pub mod render;
pub mod value;

pub use ambient::{Ambient, ContextMap, ResolvedContext};
pub use backend::{Backend, Host, Rendered};
pub use description::{
    ComponentRef, ComponentStyle, Content, ContextDependency, Description, Props, Provenance,
    Stamp,
};
pub use error::Failure;
pub use instance::{Effect, Instance, InstanceKind, Mode};
pub use render::Renderer;
pub use value::{ContextId, HostId, PropValue, RefTarget, SharedValue};

#[doc(inline)]
pub use crate::patch::patch;
