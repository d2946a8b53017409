//! A single line of coloured text.

use std::io::{Read, Write};

use tessera_wire::{MAX_TEXT_LENGTH, WireError, WireRead, WireWrite, size_of_text};

use crate::widget::{BASE_NUM_BYTES, Widget, WidgetBase, WidgetType};

/// Opaque white.
pub const DEFAULT_COLOR: u32 = 0xFFFF_FFFF;

/// Text overlay. `color` is packed ARGB.
#[derive(Debug)]
pub struct Label {
    base: WidgetBase,
    text: String,
    color: u32,
}

impl Label {
    /// Creates a white label.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(),
            text: text.into(),
            color: DEFAULT_COLOR,
        }
    }

    /// The displayed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text, marking the label dirty if it changed.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if self.text != text {
            self.text = text;
            self.base.mark_dirty();
        }
        self
    }

    /// Packed ARGB colour.
    pub fn color(&self) -> u32 {
        self.color
    }

    /// Sets the ARGB colour.
    pub fn set_color(&mut self, color: u32) -> &mut Self {
        if self.color != color {
            self.color = color;
            self.base.mark_dirty();
        }
        self
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Widget for Label {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn widget_type(&self) -> WidgetType {
        WidgetType::Label
    }

    fn num_bytes(&self) -> usize {
        BASE_NUM_BYTES + size_of_text(&self.text) + 4
    }

    fn write_data(&self, out: &mut dyn Write) -> Result<(), WireError> {
        self.base.write_data(out)?;
        out.write_text(&self.text)?;
        out.write_u32(self.color)
    }

    fn read_data(&mut self, input: &mut dyn Read) -> Result<(), WireError> {
        self.base.read_data(input)?;
        self.text = input.read_text(MAX_TEXT_LENGTH)?;
        self.color = input.read_u32()?;
        Ok(())
    }
}
