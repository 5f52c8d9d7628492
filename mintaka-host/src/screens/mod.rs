//! The four screens the macropad can select, in device index order:
//! system, GPU, IO and media.

pub mod draw;
mod gpu;
mod io;
mod media;
mod system;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_6X10, FONT_6X13};

use mintaka_core::{AnalyzerTask, Framebuffer, Renderer};

use crate::config::ScreensConfig;
use crate::metrics::{ArtCache, CommandRunner, GpuMonitor, MediaQuery};

pub use gpu::GpuScreen;
pub use io::IoScreen;
pub use media::{MediaScreen, TitleScroller};
pub use system::SystemScreen;

/// GPU readings are shared by the system and GPU screens.
pub type SharedGpu = Rc<RefCell<GpuMonitor>>;

// ── Fonts ────────────────────────────────────────────────────────

/// A named monospace font.
#[derive(Clone, Copy)]
pub struct FontHandle {
    name: &'static str,
    font: &'static MonoFont<'static>,
}

impl FontHandle {
    pub const NAMES: [&'static str; 3] = ["5x8", "6x10", "6x13"];

    pub fn by_name(name: &str) -> Option<Self> {
        let (name, font) = match name {
            "5x8" => ("5x8", &FONT_5X8),
            "6x10" => ("6x10", &FONT_6X10),
            "6x13" => ("6x13", &FONT_6X13),
            _ => return None,
        };
        Some(Self { name, font })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn font(&self) -> &'static MonoFont<'static> {
        self.font
    }

    /// Horizontal advance per character.
    pub fn char_width(&self) -> i32 {
        (self.font.character_size.width + self.font.character_spacing) as i32
    }

    pub fn line_height(&self) -> i32 {
        self.font.character_size.height as i32
    }

    pub fn text_width(&self, s: &str) -> i32 {
        s.chars().count() as i32 * self.char_width()
    }

    /// Characters that fit in `width` pixels.
    pub fn max_chars(&self, width: i32) -> usize {
        (width.max(0) / self.char_width()) as usize
    }
}

impl Default for FontHandle {
    fn default() -> Self {
        Self {
            name: "5x8",
            font: &FONT_5X8,
        }
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FontHandle").field(&self.name).finish()
    }
}

// ── Screen ───────────────────────────────────────────────────────

pub enum Screen {
    System(SystemScreen),
    Gpu(GpuScreen),
    Io(IoScreen),
    Media(MediaScreen),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::System(_) => "system",
            Screen::Gpu(_) => "gpu",
            Screen::Io(_) => "io",
            Screen::Media(_) => "media",
        }
    }

    /// Release background resources (the audio capture thread).
    pub fn shutdown(&mut self) {
        if let Screen::Media(media) = self {
            media.shutdown_audio();
        }
    }
}

impl Renderer for Screen {
    type Font = FontHandle;

    fn render(&mut self, font: &FontHandle, layer: u8) -> Framebuffer {
        match self {
            Screen::System(s) => s.render(*font, layer),
            Screen::Gpu(s) => s.render(*font, layer),
            Screen::Io(s) => s.render(*font, layer),
            Screen::Media(s) => s.render(*font, layer),
        }
    }
}

/// Build the screen set. `analyzer` feeds the media visualizer; without
/// it the bars are synthetic.
pub fn build_screens(
    config: &ScreensConfig,
    runner: CommandRunner,
    analyzer: Option<AnalyzerTask>,
) -> Vec<Screen> {
    let gpu: SharedGpu = Rc::new(RefCell::new(GpuMonitor::new(
        runner.clone(),
        config.gpu_cache(),
    )));
    vec![
        Screen::System(SystemScreen::new(Rc::clone(&gpu))),
        Screen::Gpu(GpuScreen::new(gpu)),
        Screen::Io(IoScreen::new(runner.clone(), config.public_ip)),
        Screen::Media(MediaScreen::new(
            MediaQuery::new(runner.clone(), config.media_player.clone()),
            ArtCache::new(runner),
            analyzer,
        )),
    ]
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fonts_by_name() {
        for name in FontHandle::NAMES {
            assert_eq!(FontHandle::by_name(name).map(|f| f.name()), Some(name));
        }
        assert!(FontHandle::by_name("8x8").is_none());
        assert_eq!(FontHandle::default().name(), "5x8");
    }

    #[test]
    fn font_metrics() {
        let small = FontHandle::default();
        assert_eq!(small.char_width(), 5);
        assert_eq!(small.line_height(), 8);
        assert_eq!(small.text_width("UP 1.0 MB/s"), 55);
        assert_eq!(small.max_chars(128 - 36), 18);

        let wide = FontHandle::by_name("6x10").unwrap();
        assert_eq!(wide.char_width(), 6);
        assert_eq!(wide.max_chars(-3), 0);
    }

    #[test]
    fn screens_follow_device_indices() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let runner = CommandRunner::new(rt.handle().clone(), std::time::Duration::from_secs(1));
        let mut screens = build_screens(&ScreensConfig::default(), runner, None);
        let names: Vec<_> = screens.iter().map(Screen::name).collect();
        assert_eq!(names, ["system", "gpu", "io", "media"]);
        for screen in &mut screens {
            screen.shutdown();
        }
    }
}
