//! The synchronized widget contract.
//!
//! Every widget embeds a [`WidgetBase`] carrying identity, geometry, render
//! priority, visibility, and the dirty flag. The [`Widget`] trait layers the
//! type-specific serialization on top.
//!
//! Lifecycle of the dirty flag:
//!
//! ```text
//! Clean --(any setter that changes state)--> Dirty --(flush)--> Clean
//! ```
//!
//! Base wire layout (34 bytes, all big-endian):
//!
//! ```text
//! upper_right_x i32 | upper_right_y i32 | width i32 | height i32 |
//! visible bool      | priority u8       | id uuid (16 bytes)
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use tessera_net::WidgetUpdate;
use tessera_wire::{WireError, WireRead, WireWrite};
use uuid::Uuid;

use crate::label::Label;
use crate::screen::ScreenId;
use crate::texture::Texture;

/// Encoded size of the fields every widget shares.
pub const BASE_NUM_BYTES: usize = 4 * 4 + 1 + 1 + 16;

/// Creation counter used to break render-priority ties.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// RenderPriority
// ---------------------------------------------------------------------------

/// Drawing tier. Widgets are drawn in ascending order, so `Overlay` ends up on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum RenderPriority {
    /// Drawn first, behind everything.
    Background = 0,
    /// Below normal content.
    Low = 1,
    /// Default tier.
    #[default]
    Normal = 2,
    /// Above normal content.
    High = 3,
    /// Drawn last, on top of everything.
    Overlay = 4,
}

impl RenderPriority {
    /// Wire id of this tier.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Looks up a tier by wire id.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Background),
            1 => Some(Self::Low),
            2 => Some(Self::Normal),
            3 => Some(Self::High),
            4 => Some(Self::Overlay),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// WidgetType
// ---------------------------------------------------------------------------

/// The catalog of concrete widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetType {
    /// A line of coloured text.
    Label,
    /// An image loaded by URL.
    Texture,
}

impl WidgetType {
    /// Wire id of this widget type.
    pub fn id(self) -> u16 {
        match self {
            Self::Label => 0,
            Self::Texture => 1,
        }
    }

    /// Looks up a widget type by wire id.
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0 => Some(Self::Label),
            1 => Some(Self::Texture),
            _ => None,
        }
    }

    /// Creates a default-initialized widget of this type, ready for `read_data`.
    pub fn create(self) -> Box<dyn Widget> {
        match self {
            Self::Label => Box::new(Label::default()),
            Self::Texture => Box::new(Texture::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// WidgetBase
// ---------------------------------------------------------------------------

/// State shared by every widget.
///
/// Setters mark the widget dirty only when the value actually changes. The
/// dirty flag, owning screen, and creation sequence are local bookkeeping and
/// never travel on the wire.
#[derive(Debug)]
pub struct WidgetBase {
    id: Uuid,
    sequence: u64,
    dirty: bool,
    priority: RenderPriority,
    width: i32,
    height: i32,
    upper_right_x: i32,
    upper_right_y: i32,
    visible: bool,
    screen: Option<ScreenId>,
}

impl WidgetBase {
    /// Creates base state with a fresh random id.
    ///
    /// A new widget starts dirty so that its first flush transmits it.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            dirty: true,
            priority: RenderPriority::default(),
            width: 0,
            height: 0,
            upper_right_x: 0,
            upper_right_y: 0,
            visible: true,
            screen: None,
        }
    }

    /// Globally unique identifier, fixed at creation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation order; breaks ties between widgets of equal priority.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Adopts the creation sequence of the widget this one replaces.
    pub(crate) fn inherit_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Returns `true` if wire-relevant state changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Overrides the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) -> &mut Self {
        self.dirty = dirty;
        self
    }

    /// Marks the widget dirty. Concrete widgets call this from their own setters.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Render tier.
    pub fn priority(&self) -> RenderPriority {
        self.priority
    }

    /// Sets the render tier.
    pub fn set_priority(&mut self, priority: RenderPriority) -> &mut Self {
        update(&mut self.priority, priority, &mut self.dirty);
        self
    }

    /// Width in screen units.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Sets the width. Negative values are passed through unchanged.
    pub fn set_width(&mut self, width: i32) -> &mut Self {
        update(&mut self.width, width, &mut self.dirty);
        self
    }

    /// Height in screen units.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Sets the height.
    pub fn set_height(&mut self, height: i32) -> &mut Self {
        update(&mut self.height, height, &mut self.dirty);
        self
    }

    /// X of the upper-right anchor.
    pub fn upper_right_x(&self) -> i32 {
        self.upper_right_x
    }

    /// Sets the X of the upper-right anchor. Off-screen values are allowed.
    pub fn set_upper_right_x(&mut self, x: i32) -> &mut Self {
        update(&mut self.upper_right_x, x, &mut self.dirty);
        self
    }

    /// Y of the upper-right anchor.
    pub fn upper_right_y(&self) -> i32 {
        self.upper_right_y
    }

    /// Sets the Y of the upper-right anchor.
    pub fn set_upper_right_y(&mut self, y: i32) -> &mut Self {
        update(&mut self.upper_right_y, y, &mut self.dirty);
        self
    }

    /// Moves the anchor horizontally by `dx`.
    pub fn shift_x_pos(&mut self, dx: i32) -> &mut Self {
        self.set_upper_right_x(self.upper_right_x.wrapping_add(dx))
    }

    /// Moves the anchor vertically by `dy`.
    pub fn shift_y_pos(&mut self, dy: i32) -> &mut Self {
        self.set_upper_right_y(self.upper_right_y.wrapping_add(dy))
    }

    /// Returns `true` if the widget should be drawn.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the widget.
    pub fn set_visible(&mut self, visible: bool) -> &mut Self {
        update(&mut self.visible, visible, &mut self.dirty);
        self
    }

    /// The screen this widget is attached to, if any.
    pub fn screen(&self) -> Option<ScreenId> {
        self.screen
    }

    /// Records the owning screen. Not wire-relevant, so the dirty flag is untouched.
    pub fn set_screen(&mut self, screen: Option<ScreenId>) -> &mut Self {
        self.screen = screen;
        self
    }

    /// Writes the shared fields.
    pub fn write_data(&self, out: &mut dyn Write) -> Result<(), WireError> {
        out.write_i32(self.upper_right_x)?;
        out.write_i32(self.upper_right_y)?;
        out.write_i32(self.width)?;
        out.write_i32(self.height)?;
        out.write_bool(self.visible)?;
        out.write_u8(self.priority.id())?;
        out.write_uuid(self.id)
    }

    /// Reads the shared fields, adopting the sender's id.
    ///
    /// The receiving copy is left clean; its screen and sequence are kept. On
    /// error no field is changed.
    pub fn read_data(&mut self, input: &mut dyn Read) -> Result<(), WireError> {
        let upper_right_x = input.read_i32()?;
        let upper_right_y = input.read_i32()?;
        let width = input.read_i32()?;
        let height = input.read_i32()?;
        let visible = input.read_bool()?;
        let priority = input.read_u8()?;
        let priority = RenderPriority::from_id(priority).ok_or(WireError::InvalidValue {
            field: "render priority",
            value: u64::from(priority),
        })?;
        let id = input.read_uuid()?;

        self.upper_right_x = upper_right_x;
        self.upper_right_y = upper_right_y;
        self.width = width;
        self.height = height;
        self.visible = visible;
        self.priority = priority;
        self.id = id;
        self.dirty = false;
        Ok(())
    }
}

impl Default for WidgetBase {
    fn default() -> Self {
        Self::new()
    }
}

fn update<T: PartialEq>(field: &mut T, value: T, dirty: &mut bool) {
    if *field != value {
        *field = value;
        *dirty = true;
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

/// A stateful, network-visible overlay element.
///
/// Implementations must keep [`num_bytes`](Self::num_bytes) equal to the number
/// of bytes [`write_data`](Self::write_data) emits, and make
/// [`read_data`](Self::read_data) its exact inverse on a fresh widget of the
/// same type.
///
/// The fluent setters are available on concrete widget types. Through
/// `dyn Widget`, use [`base_mut`](Self::base_mut).
pub trait Widget: fmt::Debug + Send {
    /// Shared state.
    fn base(&self) -> &WidgetBase;

    /// Mutable shared state.
    fn base_mut(&mut self) -> &mut WidgetBase;

    /// Concrete type, used to reconstruct the widget on the receiving side.
    fn widget_type(&self) -> WidgetType;

    /// Exact encoded size in bytes.
    fn num_bytes(&self) -> usize;

    /// Serializes every wire-relevant field.
    fn write_data(&self, out: &mut dyn Write) -> Result<(), WireError>;

    /// Deserializes a payload written by [`write_data`](Self::write_data).
    fn read_data(&mut self, input: &mut dyn Read) -> Result<(), WireError>;

    /// Globally unique identifier.
    fn id(&self) -> Uuid {
        self.base().id()
    }

    /// Returns `true` if the widget has unsent changes.
    fn is_dirty(&self) -> bool {
        self.base().is_dirty()
    }

    /// Overrides the dirty flag.
    fn set_dirty(&mut self, dirty: bool) {
        self.base_mut().set_dirty(dirty);
    }

    /// Render tier.
    fn priority(&self) -> RenderPriority {
        self.base().priority()
    }

    /// Returns `true` if the widget should be drawn.
    fn is_visible(&self) -> bool {
        self.base().is_visible()
    }

    /// Owning screen, if attached.
    fn screen(&self) -> Option<ScreenId> {
        self.base().screen()
    }

    /// Sets the render tier.
    fn set_priority(&mut self, priority: RenderPriority) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().set_priority(priority);
        self
    }

    /// Sets the width.
    fn set_width(&mut self, width: i32) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().set_width(width);
        self
    }

    /// Sets the height.
    fn set_height(&mut self, height: i32) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().set_height(height);
        self
    }

    /// Sets the X of the upper-right anchor.
    fn set_upper_right_x(&mut self, x: i32) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().set_upper_right_x(x);
        self
    }

    /// Sets the Y of the upper-right anchor.
    fn set_upper_right_y(&mut self, y: i32) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().set_upper_right_y(y);
        self
    }

    /// Moves the anchor horizontally.
    fn shift_x_pos(&mut self, dx: i32) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().shift_x_pos(dx);
        self
    }

    /// Moves the anchor vertically.
    fn shift_y_pos(&mut self, dy: i32) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().shift_y_pos(dy);
        self
    }

    /// Shows or hides the widget.
    fn set_visible(&mut self, visible: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().set_visible(visible);
        self
    }
}

// ---------------------------------------------------------------------------
// Packet conversion
// ---------------------------------------------------------------------------

/// Serializes `widget` into a [`WidgetUpdate`]. The dirty flag is not touched.
pub fn encode_widget(widget: &dyn Widget) -> Result<WidgetUpdate, WireError> {
    let mut payload = Vec::with_capacity(widget.num_bytes());
    widget.write_data(&mut payload)?;
    debug_assert_eq!(
        payload.len(),
        widget.num_bytes(),
        "num_bytes disagrees with write_data for {:?}",
        widget.widget_type()
    );
    Ok(WidgetUpdate {
        widget_type: widget.widget_type().id(),
        payload,
    })
}

/// Reconstructs a widget from a [`WidgetUpdate`].
///
/// # Errors
///
/// Fails if the type id is unknown, the payload is malformed, or the payload
/// has bytes left over after decoding.
pub fn decode_widget(update: &WidgetUpdate) -> Result<Box<dyn Widget>, WireError> {
    let widget_type = WidgetType::from_id(update.widget_type).ok_or(WireError::InvalidValue {
        field: "widget type",
        value: u64::from(update.widget_type),
    })?;
    let mut widget = widget_type.create();
    let mut input: &[u8] = &update.payload;
    widget.read_data(&mut input)?;
    if !input.is_empty() {
        return Err(WireError::LengthMismatch {
            declared: update.payload.len(),
            actual: update.payload.len() - input.len(),
        });
    }
    Ok(widget)
}
