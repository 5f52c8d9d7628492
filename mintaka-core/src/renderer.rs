//! The contract between the multiplexer and whatever draws a screen.

use crate::framebuffer::Framebuffer;

/// Draws one full frame.
///
/// Rendering cannot fail: an implementation that cannot get its data
/// draws a placeholder instead.
pub trait Renderer {
    /// Font handle passed through on every call.
    type Font;

    /// Produce the frame for the given keyboard layer.
    fn render(&mut self, font: &Self::Font, layer: u8) -> Framebuffer;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    type Font = R::Font;

    fn render(&mut self, font: &Self::Font, layer: u8) -> Framebuffer {
        (**self).render(font, layer)
    }
}
