pub mod icon;
pub mod status;

pub use icon::{Color, IconImage, TextOp, TextRole};
pub use status::{render, RenderRequest};
