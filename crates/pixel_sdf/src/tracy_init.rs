//! Tracy profiler initialization.

use tracing_subscriber::prelude::*;
use tracing_tracy::TracyLayer;

/// Installs a Tracy layer as the global tracing subscriber.
///
/// Call once at startup, before the first generation. Band and stage spans
/// show up once the Tracy profiler connects.
pub fn init_tracy() {
  tracing_subscriber::registry()
    .with(TracyLayer::default())
    .init();
}
