use mintaka_core::Framebuffer;
use tracing::debug;

use super::{FontHandle, SharedGpu, draw};
use crate::metrics::GpuStats;

const BAR_X: i32 = 68;
const BAR_W: i32 = 59;
const BAR_H: i32 = 9;

/// Utilization, VRAM and power of the first NVIDIA GPU.
pub struct GpuScreen {
    gpu: SharedGpu,
}

impl GpuScreen {
    pub fn new(gpu: SharedGpu) -> Self {
        Self { gpu }
    }

    pub fn render(&mut self, font: FontHandle, layer: u8) -> Framebuffer {
        let mut fb = Framebuffer::new();
        draw::header(&mut fb, font, "GPU", layer);

        match self.gpu.borrow_mut().query() {
            Ok(stats) => draw_stats(&mut fb, font, &stats),
            Err(e) => {
                debug!("gpu query failed: {e}");
                draw::placeholder(&mut fb, font, "NO NVIDIA GPU");
            }
        }
        fb
    }
}

fn draw_stats(fb: &mut Framebuffer, font: FontHandle, stats: &GpuStats) {
    let name: String = stats
        .short_name()
        .chars()
        .take(font.max_chars(128))
        .collect();
    draw::text(fb, font, 0, 16, &name);

    draw::text(fb, font, 0, 28, &format!("UTIL {:4.0}%", stats.gpu_util));
    draw::progress_bar(fb, BAR_X, 28, BAR_W, BAR_H, stats.gpu_util);

    let vram = if stats.memory_total > 0.0 {
        stats.memory_used / stats.memory_total * 100.0
    } else {
        0.0
    };
    draw::text(fb, font, 0, 40, &format!("VRAM {vram:4.0}%"));
    draw::progress_bar(fb, BAR_X, 40, BAR_W, BAR_H, vram);

    let power = stats.power_percent();
    draw::text(fb, font, 0, 52, &format!("PWR  {power:4.0}%"));
    draw::progress_bar(fb, BAR_X, 52, BAR_W, BAR_H, power);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::gpu::parse_gpu_csv;

    #[test]
    fn stats_fill_all_bars() {
        let stats =
            parse_gpu_csv("NVIDIA GeForce RTX 3080, 54, 100, 9, 10240, 10240, 320, 320").unwrap();
        let mut fb = Framebuffer::new();
        draw_stats(&mut fb, FontHandle::default(), &stats);
        // Every bar is full: the column just inside the right edge is lit.
        for y in [28 + 4, 40 + 4, 52 + 4] {
            assert!(fb.pixel((BAR_X + BAR_W - 1) as usize, y));
        }
    }
}
