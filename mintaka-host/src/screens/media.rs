use mintaka_core::{AnalyzerTask, BAND_COUNT, BandLevels, Framebuffer, SyntheticBands};
use tracing::debug;

use super::{FontHandle, draw};
use crate::metrics::media::format_time;
use crate::metrics::{ART_SIZE, ArtCache, MediaInfo, MediaQuery};

/// Left edge of the text column beside the art.
const TEXT_X: i32 = 36;
const ART_Y: i32 = 14;
/// One-pixel track; the fill sits on the two rows above it.
const PROGRESS_Y: i32 = 49;
const VIZ_TOP: i32 = 52;
const VIZ_HEIGHT: i32 = 12;
const BAR_WIDTH: i32 = 6;
const BAR_PITCH: i32 = 8;
/// Blank gap between the end and the restart of a scrolling title.
const SCROLL_GAP: &str = "   ";

// ── TitleScroller ────────────────────────────────────────────────

/// Marquee for titles wider than the text column. Advances one
/// character per frame and restarts when the title changes.
#[derive(Debug, Default)]
pub struct TitleScroller {
    title: String,
    offset: usize,
}

impl TitleScroller {
    pub fn next(&mut self, title: &str, max_chars: usize) -> String {
        if title != self.title {
            self.title = title.to_owned();
            self.offset = 0;
        }
        let len = title.chars().count();
        if len <= max_chars {
            return title.to_owned();
        }

        let shown = title
            .chars()
            .chain(SCROLL_GAP.chars())
            .chain(title.chars())
            .skip(self.offset)
            .take(max_chars)
            .collect();
        self.offset = (self.offset + 1) % (len + SCROLL_GAP.len());
        shown
    }
}

// ── MediaScreen ──────────────────────────────────────────────────

/// Now playing: art, title, artist, progress and a 16-band visualizer.
pub struct MediaScreen {
    query: MediaQuery,
    title: String,
    art: ArtCache,
    scroller: TitleScroller,
    analyzer: Option<AnalyzerTask>,
    synthetic: SyntheticBands,
}

impl MediaScreen {
    /// The analyzer is started on first render, so capture only runs
    /// once the media screen has been shown.
    pub fn new(query: MediaQuery, art: ArtCache, analyzer: Option<AnalyzerTask>) -> Self {
        Self {
            title: query.player().to_uppercase(),
            query,
            art,
            scroller: TitleScroller::default(),
            analyzer,
            synthetic: SyntheticBands::new(),
        }
    }

    pub fn shutdown_audio(&mut self) {
        if let Some(task) = self.analyzer.as_mut() {
            task.shutdown();
        }
    }

    pub fn render(&mut self, font: FontHandle, layer: u8) -> Framebuffer {
        let mut fb = Framebuffer::new();
        draw::header(&mut fb, font, &self.title, layer);

        let info = match self.query.fetch() {
            Ok(info) => info,
            Err(e) => {
                debug!("no media from {}: {e}", self.query.player());
                draw::placeholder(&mut fb, font, "NOT PLAYING");
                self.synthetic.reset();
                return fb;
            }
        };

        match self.art.get(&info.art_url) {
            Some(thumb) => fb.blit(
                0,
                ART_Y as usize,
                thumb.size as usize,
                thumb.size as usize,
                &thumb.pixels,
            ),
            None => draw::outline_rect(
                &mut fb,
                0,
                ART_Y,
                ART_SIZE as i32 - 1,
                ART_Y + ART_SIZE as i32 - 1,
            ),
        }

        self.draw_text(&mut fb, font, &info);
        draw_progress(&mut fb, info.progress());

        let levels = self.levels(info.is_playing());
        draw_bars(&mut fb, &levels);
        fb
    }

    fn draw_text(&mut self, fb: &mut Framebuffer, font: FontHandle, info: &MediaInfo) {
        let max_chars = font.max_chars(128 - TEXT_X);

        let title = self.scroller.next(&info.title, max_chars);
        draw::text(fb, font, TEXT_X, 16, &title);

        let artist: String = info.artist.chars().take(max_chars).collect();
        draw::text(fb, font, TEXT_X, 27, &artist);

        let time = format!("{}/{}", format_time(info.position), format_time(info.length));
        draw::text(fb, font, TEXT_X, 38, &time);
    }

    /// Live analyzer output when capture is running, synthetic bars
    /// otherwise.
    fn levels(&mut self, playing: bool) -> BandLevels {
        if let Some(task) = self.analyzer.as_mut() {
            // Idempotent; a failed start is logged once and not retried.
            if let Err(e) = task.start() {
                debug!("visualizer falls back to synthetic bars: {e}");
            }
            let bands = task.bands();
            if bands.is_live() {
                return bands.snapshot();
            }
        }
        self.synthetic.advance(playing)
    }
}

fn draw_progress(fb: &mut Framebuffer, percent: f32) {
    draw::fill_rect(fb, 0, PROGRESS_Y, 127, PROGRESS_Y);
    let fill = (128.0 * percent.clamp(0.0, 100.0) / 100.0) as i32;
    if fill > 0 {
        draw::fill_rect(fb, 0, PROGRESS_Y - 2, fill - 1, PROGRESS_Y - 1);
    }
}

/// One bar per band, bottom-aligned, never shorter than one pixel.
fn draw_bars(fb: &mut Framebuffer, levels: &BandLevels) {
    for (i, level) in levels.iter().enumerate().take(BAND_COUNT) {
        let height = ((level * VIZ_HEIGHT as f32) as i32).clamp(1, VIZ_HEIGHT);
        let x = i as i32 * BAR_PITCH;
        let bottom = VIZ_TOP + VIZ_HEIGHT - 1;
        draw::fill_rect(fb, x, bottom - height + 1, x + BAR_WIDTH - 1, bottom);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_do_not_scroll() {
        let mut s = TitleScroller::default();
        assert_eq!(s.next("ODE", 10), "ODE");
        assert_eq!(s.next("ODE", 10), "ODE");
    }

    #[test]
    fn long_titles_wrap_through_a_gap() {
        let mut s = TitleScroller::default();
        let frames: Vec<String> = (0..10).map(|_| s.next("ABCDEF", 4)).collect();
        assert_eq!(frames[0], "ABCD");
        assert_eq!(frames[1], "BCDE");
        assert_eq!(frames[3], "DEF ");
        assert_eq!(frames[6], "   A");
        assert_eq!(frames[8], " ABC");
        // Cycle length is the title plus the gap.
        assert_eq!(frames[9], "ABCD");
    }

    #[test]
    fn scroll_restarts_on_new_title() {
        let mut s = TitleScroller::default();
        s.next("ABCDEF", 4);
        s.next("ABCDEF", 4);
        assert_eq!(s.next("UVWXYZ", 4), "UVWX");
    }

    #[test]
    fn bars_have_a_floor_and_a_ceiling() {
        let mut levels = [0.0; BAND_COUNT];
        levels[1] = 1.0;
        levels[2] = 0.5;
        let mut fb = Framebuffer::new();
        draw_bars(&mut fb, &levels);

        let column_height = |x: usize| (0..64).filter(|&y| fb.pixel(x, y)).count();
        assert_eq!(column_height(0), 1);
        assert_eq!(column_height(8), 12);
        assert_eq!(column_height(16), 6);
        // Gap between bars.
        assert_eq!(column_height(6), 0);
        assert!(fb.pixel(0, 63));
        assert!(fb.pixel(8, 52));
    }

    #[test]
    fn progress_fill_tracks_percent() {
        let mut fb = Framebuffer::new();
        draw_progress(&mut fb, 50.0);
        assert!(fb.pixel(63, 47) && fb.pixel(63, 48));
        assert!(!fb.pixel(64, 48));
        // The track spans the full width.
        assert!(fb.pixel(127, 49));

        let mut empty = Framebuffer::new();
        draw_progress(&mut empty, 0.0);
        assert!(!empty.pixel(0, 48));
    }
}
