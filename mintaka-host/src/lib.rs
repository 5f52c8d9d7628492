//! # mintaka-host — OLED dashboard for the Mintaka macropad
//!
//! Renders system, GPU, IO and media screens on the host and streams
//! them to the keyboard's 128×64 display over raw HID. The device
//! picks the screen with its encoder; the host follows its reports.
//!
//! ## Screens
//!
//! | Index | Screen | Sources                               |
//! |-------|--------|---------------------------------------|
//! | 0     | System | sysinfo, `nvidia-smi` temperature     |
//! | 1     | GPU    | `nvidia-smi`                          |
//! | 2     | IO     | sysinfo, `/proc/diskstats`, `curl`    |
//! | 3     | Media  | `playerctl`, album art, audio capture |

pub mod config;
pub mod metrics;
pub mod screens;
pub mod service;
