//! Network-synchronized overlay widgets.
//!
//! Every widget serializes itself, tracks whether it changed since it was last
//! sent, and sorts deterministically for drawing. A [`Screen`] owns the widgets
//! shown to one client and turns their changes into packets.

pub mod label;
pub mod screen;
pub mod texture;
pub mod widget;

pub use label::Label;
pub use screen::{Screen, ScreenFlush, ScreenId};
pub use texture::Texture;
pub use widget::{
    BASE_NUM_BYTES, RenderPriority, Widget, WidgetBase, WidgetType, decode_widget, encode_widget,
};
