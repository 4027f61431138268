//! Platform socket primitives
//!
//! One implementation of [`PlatformSocket`](dstream_core::PlatformSocket)
//! per target family, selected at build time. Link-layer capture helpers
//! (filter attach, device bind, interface index) exist on Linux only.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::{init_network, Socket};
    } else if #[cfg(windows)] {
        mod windows;
        pub use windows::{init_network, Socket};
    } else {
        compile_error!("Unsupported platform");
    }
}
