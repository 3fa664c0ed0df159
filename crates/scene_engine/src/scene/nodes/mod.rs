//! Built-in node kinds

mod group;
mod inset_view;
mod mesh_node;
mod text_billboard;

pub use group::GroupNode;
pub use inset_view::InsetViewNode;
pub use mesh_node::{flat_program, MeshNode};
pub use text_billboard::{billboard_anchor, TextBillboardNode};
