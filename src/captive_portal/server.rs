//! `EspHttpServer` hosting the portal routes.

use std::path::PathBuf;

use esp_idf_svc::http::server::{Configuration, EspHttpServer};

use super::{handlers, CaptureSlot, Portal};

pub struct EspPortal {
    page_root: PathBuf,
    server: Option<EspHttpServer<'static>>,
}

impl EspPortal {
    pub fn new(page_root: PathBuf) -> Self {
        Self {
            page_root,
            server: None,
        }
    }
}

impl Portal for EspPortal {
    fn start(&mut self, slot: CaptureSlot) -> anyhow::Result<()> {
        if self.server.is_some() {
            log::warn!("Portal already running");
            return Ok(());
        }

        let config = Configuration {
            stack_size: 8192,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&config)?;
        handlers::register_routes(&mut server, self.page_root.clone(), slot)?;

        log::info!("Web server started");
        self.server = Some(server);
        Ok(())
    }

    fn stop(&mut self) {
        if self.server.take().is_some() {
            log::info!("Web server stopped");
        }
    }
}
