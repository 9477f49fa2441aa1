//! Tracy profiling support.
//!
//! With the `tracy` feature the tick's `tracing` spans are streamed to a Tracy
//! client and every day and month start gets a frame mark. Without it these
//! functions compile to nothing.
//!
//! Build with `cargo build -p v2sim --features tracy` and pass `--tracy` to
//! the runner.

/// Frame boundaries shown in Tracy's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFrame {
    Daily,
    Monthly,
}

/// Maps a `log` filter onto the closest `tracing` level.
pub fn span_level(filter: log::LevelFilter) -> tracing::Level {
    match filter {
        log::LevelFilter::Off | log::LevelFilter::Error => tracing::Level::ERROR,
        log::LevelFilter::Warn => tracing::Level::WARN,
        log::LevelFilter::Info => tracing::Level::INFO,
        log::LevelFilter::Debug => tracing::Level::DEBUG,
        log::LevelFilter::Trace => tracing::Level::TRACE,
    }
}

/// Installs the Tracy subscriber, capturing spans at `level` and above.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
#[cfg(feature = "tracy")]
pub fn init_tracy(level: tracing::Level) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(tracing_tracy::TracyLayer::default())
        .with(LevelFilter::from_level(level))
        .init();
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy(_level: tracing::Level) {
    log::warn!("Built without the tracy feature; profiling is disabled");
}

#[cfg(feature = "tracy")]
#[inline]
pub fn frame_mark(frame: TickFrame) {
    match frame {
        TickFrame::Daily => tracy_client::secondary_frame_mark!("daily"),
        TickFrame::Monthly => tracy_client::secondary_frame_mark!("monthly"),
    }
}

#[cfg(not(feature = "tracy"))]
#[inline]
pub fn frame_mark(_frame: TickFrame) {}
