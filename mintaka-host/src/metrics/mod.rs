//! Data sources behind the screens.
//!
//! Every query returns `Result<_, QueryError>`; screens decide what to
//! draw when one fails.

pub mod art;
pub mod command;
pub mod gpu;
pub mod media;
pub mod net;
pub mod system;

pub use art::{ART_SIZE, ArtCache, Thumbnail};
pub use command::{CommandRunner, QueryError};
pub use gpu::{GpuMonitor, GpuStats};
pub use media::{MediaInfo, MediaQuery};
pub use net::{PublicIpCache, lan_ipv4};
pub use system::{ByteCounters, CpuMemory, NetworkMetrics, SystemMetrics, disk_counters};
