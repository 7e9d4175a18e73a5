//! Static portal pages, streamed in small chunks.

use std::{fs::File, io::Read, path::Path};

use super::html;

/// Largest chunk handed to the connection at once.
pub const CHUNK_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// `GET /`
    Index,
    /// `GET /wifi`
    WifiForm,
}

/// Where a served page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    File,
    BuiltIn,
}

impl Page {
    pub fn file_name(self) -> &'static str {
        match self {
            Page::Index => "index.html",
            Page::WifiForm => "wifi.html",
        }
    }

    fn built_in(self) -> &'static str {
        match self {
            Page::Index => html::INDEX_HTML,
            Page::WifiForm => html::WIFI_HTML,
        }
    }
}

/// Stream `page` from `root`, or its built-in copy if the file can't be opened.
pub fn stream_page(
    root: &Path,
    page: Page,
    mut send: impl FnMut(&[u8]) -> anyhow::Result<()>,
) -> anyhow::Result<PageSource> {
    let path = root.join(page.file_name());
    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("Failed to open {}: {e}, serving built-in page", path.display());
            for chunk in page.built_in().as_bytes().chunks(CHUNK_SIZE) {
                send(chunk)?;
            }
            return Ok(PageSource::BuiltIn);
        }
    };

    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        send(&buf[..n])?;
    }
    Ok(PageSource::File)
}
