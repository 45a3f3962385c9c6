//! Session capture over the Chrome DevTools Protocol.
//!
//! Attaches to an already-authenticated browser started with
//! `--remote-debugging-port`, navigates its first page to a URL that triggers
//! the birthday API call, and harvests the tokens and cookies of the first
//! matching request.
//!
//! - **`targets`**: page discovery through the bridge's `/json/list` endpoint.
//! - **`cdp`**: WebSocket client with command/response correlation and an
//!   event stream.
//! - **`form`**: narrow `key=value` token extraction from raw form bodies.
//! - **`capture`**: the capture flow itself.

pub mod capture;
pub mod cdp;
pub mod error;
pub mod form;
pub mod targets;

pub use capture::{capture_session, CaptureConfig};
pub use cdp::{CdpClient, CdpEvent, EventStream};
pub use error::SessionError;
pub use form::extract_form_value;
pub use targets::{first_page, list_targets, DebugTarget};
