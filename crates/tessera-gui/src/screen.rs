//! Per-client widget container.
//!
//! A [`Screen`] owns every widget attached to it. Widgets hold only the
//! screen's id, never a reference to the screen itself.
//!
//! The server side mutates widgets and periodically calls
//! [`Screen::flush_dirty`]; the client side feeds received packets into
//! [`Screen::apply_update`] and [`Screen::apply_remove`].

use tessera_net::{WidgetRemove, WidgetUpdate};
use tessera_wire::WireError;
use uuid::Uuid;

use crate::widget::{Widget, decode_widget, encode_widget};

/// Identifies a screen, usually one per connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(pub u64);

/// Packets produced by one [`Screen::flush_dirty`] call, in send order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScreenFlush {
    /// Widgets removed since the previous flush.
    pub removals: Vec<WidgetRemove>,
    /// Widgets whose state changed since the previous flush.
    pub updates: Vec<WidgetUpdate>,
    /// Dirty widgets that failed to serialize. They are marked clean and
    /// stay unsent until their next change.
    pub rejected: Vec<Uuid>,
}

impl ScreenFlush {
    /// Returns `true` if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.updates.is_empty()
    }

    /// Returns `true` if any dirty widget failed to serialize.
    pub fn has_rejected(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// An ordered collection of widgets shown to one client.
#[derive(Debug)]
pub struct Screen {
    id: ScreenId,
    widgets: Vec<Box<dyn Widget>>,
    removed: Vec<Uuid>,
}

impl Screen {
    pub fn new(id: ScreenId) -> Self {
        Self {
            id,
            widgets: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn id(&self) -> ScreenId {
        self.id
    }

    /// Attaches `widget`, taking ownership. Returns its id.
    ///
    /// A widget with the same id replaces the existing one. The attached
    /// widget is marked dirty so the next flush transmits it.
    pub fn attach(&mut self, mut widget: Box<dyn Widget>) -> Uuid {
        let id = widget.id();
        widget.base_mut().set_screen(Some(self.id)).set_dirty(true);
        self.removed.retain(|removed| *removed != id);
        match self.position(id) {
            Some(index) => self.widgets[index] = widget,
            None => self.widgets.push(widget),
        }
        tracing::trace!(screen = self.id.0, %id, "attached widget");
        id
    }

    /// Detaches the widget with `id` and queues its removal for the next flush.
    pub fn remove(&mut self, id: Uuid) -> Option<Box<dyn Widget>> {
        let index = self.position(id)?;
        let mut widget = self.widgets.remove(index);
        widget.base_mut().set_screen(None);
        self.removed.push(id);
        tracing::trace!(screen = self.id.0, %id, "removed widget");
        Some(widget)
    }

    pub fn widget(&self, id: Uuid) -> Option<&dyn Widget> {
        self.widgets
            .iter()
            .find(|widget| widget.id() == id)
            .map(|widget| &**widget)
    }

    pub fn widget_mut(&mut self, id: Uuid) -> Option<&mut dyn Widget> {
        for widget in &mut self.widgets {
            if widget.id() == id {
                return Some(&mut **widget);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Iterates widgets in attachment order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Widget> {
        self.widgets.iter().map(|widget| &**widget)
    }

    /// Visible widgets in draw order: ascending priority, then creation order.
    pub fn render_order(&self) -> Vec<&dyn Widget> {
        let mut visible: Vec<&dyn Widget> = self.iter().filter(|w| w.is_visible()).collect();
        visible.sort_by_key(|w| (w.priority(), w.base().sequence()));
        visible
    }

    /// Serializes pending removals and every dirty widget, then marks them clean.
    ///
    /// Widgets are encoded one at a time. A widget that fails to serialize is
    /// logged, listed in [`ScreenFlush::rejected`], and marked clean; it does
    /// not hold back the rest of the screen.
    pub fn flush_dirty(&mut self) -> ScreenFlush {
        let mut updates = Vec::new();
        let mut rejected = Vec::new();
        for widget in self.widgets.iter_mut().filter(|w| w.is_dirty()) {
            match encode_widget(&**widget) {
                Ok(update) => updates.push(update),
                Err(error) => {
                    tracing::warn!(
                        screen = self.id.0,
                        id = %widget.id(),
                        %error,
                        "failed to serialize widget"
                    );
                    rejected.push(widget.id());
                }
            }
            widget.set_dirty(false);
        }
        let removals = self
            .removed
            .drain(..)
            .map(|widget_id| WidgetRemove { widget_id })
            .collect();
        ScreenFlush {
            removals,
            updates,
            rejected,
        }
    }

    /// Applies a received update, replacing any widget with the same id.
    ///
    /// A replaced widget keeps its creation sequence, so updates never change
    /// its place in [`render_order`](Self::render_order).
    pub fn apply_update(&mut self, update: &WidgetUpdate) -> Result<Uuid, WireError> {
        let mut widget = decode_widget(update)?;
        let id = widget.id();
        widget.base_mut().set_screen(Some(self.id));
        match self.position(id) {
            Some(index) => {
                let sequence = self.widgets[index].base().sequence();
                widget.base_mut().inherit_sequence(sequence);
                self.widgets[index] = widget;
            }
            None => self.widgets.push(widget),
        }
        Ok(id)
    }

    /// Applies a received removal. Returns `false` if the widget was unknown.
    pub fn apply_remove(&mut self, remove: &WidgetRemove) -> bool {
        match self.position(remove.widget_id) {
            Some(index) => {
                self.widgets.remove(index);
                true
            }
            None => false,
        }
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.widgets.iter().position(|widget| widget.id() == id)
    }
}
