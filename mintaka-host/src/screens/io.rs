use mintaka_core::{Framebuffer, RateEstimator};
use tracing::debug;

use super::{FontHandle, draw};
use crate::metrics::{
    ByteCounters, CommandRunner, NetworkMetrics, PublicIpCache, disk_counters, lan_ipv4,
};

/// Per-second rates for one pair of byte counters.
#[derive(Default)]
struct RatePair {
    out: RateEstimator,
    inbound: RateEstimator,
}

impl RatePair {
    /// Returns `(out, in)` in bytes per second.
    fn record(&mut self, counters: ByteCounters) -> (f64, f64) {
        (
            self.out.record(counters.out_bytes),
            self.inbound.record(counters.in_bytes),
        )
    }

    fn current(&self) -> (f64, f64) {
        (self.out.rate(), self.inbound.rate())
    }
}

/// Network and disk throughput plus local/public addresses.
pub struct IoScreen {
    network: NetworkMetrics,
    net_rates: RatePair,
    disk_rates: RatePair,
    public_ip: Option<PublicIpCache>,
}

impl IoScreen {
    pub fn new(runner: CommandRunner, public_ip: bool) -> Self {
        Self {
            network: NetworkMetrics::new(),
            net_rates: RatePair::default(),
            disk_rates: RatePair::default(),
            public_ip: public_ip.then(|| PublicIpCache::new(runner)),
        }
    }

    pub fn render(&mut self, font: FontHandle, layer: u8) -> Framebuffer {
        let mut fb = Framebuffer::new();
        draw::header(&mut fb, font, "IO", layer);

        let (up, down) = self.net_rates.record(self.network.counters());
        let (write, read) = match disk_counters() {
            Ok(counters) => self.disk_rates.record(counters),
            Err(e) => {
                debug!("disk counters unavailable: {e}");
                self.disk_rates.current()
            }
        };

        draw::text(&mut fb, font, 0, 16, &format!("UP {}", draw::format_rate(up)));
        draw::text_right(&mut fb, font, 128, 16, &format!("DN {}", draw::format_rate(down)));
        draw::text(&mut fb, font, 0, 28, &format!("DR {}", draw::format_rate(read)));
        draw::text_right(&mut fb, font, 128, 28, &format!("DW {}", draw::format_rate(write)));

        if let Some(ip) = lan_ipv4() {
            draw::text(&mut fb, font, 0, 42, &format!("LAN {ip}"));
        }
        if let Some(ip) = self.public_ip.as_mut().and_then(PublicIpCache::get) {
            draw::text(&mut fb, font, 0, 54, &format!("WAN {ip}"));
        }

        fb
    }
}
