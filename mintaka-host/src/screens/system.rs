use mintaka_core::Framebuffer;
use tracing::debug;

use super::{FontHandle, SharedGpu, draw};
use crate::metrics::SystemMetrics;

const BAR_X: i32 = 68;
const BAR_W: i32 = 59;
const BAR_H: i32 = 9;

/// CPU and RAM load with temperatures.
pub struct SystemScreen {
    metrics: SystemMetrics,
    gpu: SharedGpu,
}

impl SystemScreen {
    pub fn new(gpu: SharedGpu) -> Self {
        Self {
            metrics: SystemMetrics::new(),
            gpu,
        }
    }

    pub fn render(&mut self, font: FontHandle, layer: u8) -> Framebuffer {
        let mut fb = Framebuffer::new();
        draw::header(&mut fb, font, "SYSTEM", layer);

        let cm = self.metrics.cpu_memory();
        draw::text(&mut fb, font, 0, 16, &format!("CPU  {:5.1}%", cm.cpu_percent));
        draw::progress_bar(&mut fb, BAR_X, 16, BAR_W, BAR_H, cm.cpu_percent);

        let ram = cm.ram_percent();
        draw::text(&mut fb, font, 0, 28, &format!("RAM  {ram:5.1}%"));
        draw::progress_bar(&mut fb, BAR_X, 28, BAR_W, BAR_H, ram);

        draw::text(
            &mut fb,
            font,
            0,
            42,
            &format!("MEM: {:.1}/{:.1} GB", cm.used_gib(), cm.total_gib()),
        );

        let cpu_temp = self.metrics.cpu_temperature().map(|t| format!("CPU: {t:.0}C"));
        let gpu_temp = match self.gpu.borrow_mut().query() {
            Ok(stats) => Some(format!("GPU: {:.0}C", stats.temperature)),
            Err(e) => {
                debug!("gpu temperature unavailable: {e}");
                None
            }
        };
        match (cpu_temp, gpu_temp) {
            (Some(cpu), Some(gpu)) => {
                draw::text(&mut fb, font, 0, 54, &cpu);
                draw::text_right(&mut fb, font, 128, 54, &gpu);
            }
            (Some(only), None) | (None, Some(only)) => draw::text(&mut fb, font, 0, 54, &only),
            (None, None) => {}
        }

        fb
    }
}
