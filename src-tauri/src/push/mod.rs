// Push notification delivery, foreground mirroring and tap routing.
//
// The core (everything except `tauri_bridge`) is platform-agnostic and talks
// to the OS, the push service, the backend and the webview only through the
// traits in `platform`.

pub mod backend;
pub mod channel;
pub mod config;
pub mod dedup;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod mirror;
pub mod payload;
pub mod platform;
pub mod registrar;
pub mod route;
pub mod router;
pub mod subsystem;
pub mod tauri_bridge;

pub use error::{PushError, PushResult};
pub use route::{resolve_route, RouteTarget};
pub use subsystem::{Listeners, PushDeps, PushSubsystem};
