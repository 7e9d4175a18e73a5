//! HTTP route handlers.

use std::path::{Path, PathBuf};

use esp_idf_svc::{
    http::{
        server::{EspHttpConnection, EspHttpServer, Request},
        Headers, Method,
    },
    io::{Read, Write},
};

use super::{
    accept_submission, content_len, stream_page, CaptureError, CaptureSlot, Page, ACK_MESSAGE,
};

/// Register all portal routes.
pub fn register_routes(
    server: &mut EspHttpServer<'static>,
    page_root: PathBuf,
    slot: CaptureSlot,
) -> anyhow::Result<()> {
    let index_root = page_root.clone();
    server.fn_handler::<anyhow::Error, _>("/", Method::Get, move |req| {
        handle_page(req, &index_root, Page::Index)
    })?;

    server.fn_handler::<anyhow::Error, _>("/wifi", Method::Get, move |req| {
        handle_page(req, &page_root, Page::WifiForm)
    })?;

    server.fn_handler::<anyhow::Error, _>("/wifi", Method::Post, move |req| {
        handle_wifi_post(req, &slot)
    })?;

    Ok(())
}

fn handle_page(
    req: Request<&mut EspHttpConnection<'_>>,
    root: &Path,
    page: Page,
) -> anyhow::Result<()> {
    let mut resp = req.into_response(200, Some("OK"), &[("Content-Type", "text/html")])?;
    let source = stream_page(root, page, |chunk| {
        resp.write_all(chunk)?;
        Ok(())
    })?;
    log::debug!("Served {} from {:?}", page.file_name(), source);
    Ok(())
}

fn handle_wifi_post(
    mut req: Request<&mut EspHttpConnection<'_>>,
    slot: &CaptureSlot,
) -> anyhow::Result<()> {
    let declared = content_len(req.content_len());
    let result = accept_submission(slot, declared, |buf| req.read(buf));

    match result {
        Ok(_) => {
            let mut resp = req.into_response(200, Some("OK"), &[("Content-Type", "text/plain")])?;
            resp.write_all(ACK_MESSAGE.as_bytes())?;
            Ok(())
        }
        // the connection is gone, nothing to acknowledge
        Err(e @ CaptureError::ReceiveTruncated { .. }) => Err(e.into()),
        Err(e) => {
            log::warn!("Rejected submission: {e}");
            let mut resp =
                req.into_response(400, Some("Bad Request"), &[("Content-Type", "text/plain")])?;
            resp.write_all(e.to_string().as_bytes())?;
            Ok(())
        }
    }
}
