//! An image drawn from a URL the client downloads and caches.

use std::io::{Read, Write};

use tessera_wire::{MAX_TEXT_LENGTH, WireError, WireRead, WireWrite, size_of_text};

use crate::widget::{BASE_NUM_BYTES, Widget, WidgetBase, WidgetType};

/// Image overlay. The client fetches `url` and scales it to the widget's size.
#[derive(Debug, Default)]
pub struct Texture {
    base: WidgetBase,
    url: String,
}

impl Texture {
    /// Creates a texture showing the image at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(),
            url: url.into(),
        }
    }

    /// Address of the image.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Points the texture at a new image.
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        let url = url.into();
        if self.url != url {
            self.url = url;
            self.base.mark_dirty();
        }
        self
    }
}

impl Widget for Texture {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn widget_type(&self) -> WidgetType {
        WidgetType::Texture
    }

    fn num_bytes(&self) -> usize {
        BASE_NUM_BYTES + size_of_text(&self.url)
    }

    fn write_data(&self, out: &mut dyn Write) -> Result<(), WireError> {
        self.base.write_data(out)?;
        out.write_text(&self.url)
    }

    fn read_data(&mut self, input: &mut dyn Read) -> Result<(), WireError> {
        self.base.read_data(input)?;
        self.url = input.read_text(MAX_TEXT_LENGTH)?;
        Ok(())
    }
}
