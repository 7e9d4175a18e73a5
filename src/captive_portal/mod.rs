//! Web form for collecting WiFi credentials.
//!
//! | Path    | Method | Response                       |
//! |---------|--------|--------------------------------|
//! | `/`     | GET    | landing page, chunked          |
//! | `/wifi` | GET    | credentials form, chunked      |
//! | `/wifi` | POST   | plain-text acknowledgment      |

mod capture;
mod html;
mod pages;

#[cfg(target_os = "espidf")]
mod handlers;
#[cfg(target_os = "espidf")]
mod server;

pub use capture::{
    accept_submission, content_len, parse_form, read_body, CaptureError, CaptureSlot, ACK_MESSAGE,
    MAX_FORM_BODY,
};
pub use pages::{stream_page, Page, PageSource, CHUNK_SIZE};
#[cfg(target_os = "espidf")]
pub use server::EspPortal;

/// Something that serves the portal routes while started.
pub trait Portal {
    /// Start serving; submissions are published into `slot`.
    fn start(&mut self, slot: CaptureSlot) -> anyhow::Result<()>;

    /// Stop serving. No-op if not started.
    fn stop(&mut self);
}
