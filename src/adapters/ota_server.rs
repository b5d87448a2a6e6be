//! HTTP firmware upload endpoint.
//!
//! `POST /update` with the raw image as the body. The body is streamed
//! into the shared [`OtaManager`] in 1 KiB chunks. Only this handler
//! locks the manager; the main loop watches its [`OtaMonitor`] for a
//! finished image, drives the outputs off and restarts.
//!
//! [`OtaMonitor`]: crate::ota::OtaMonitor

use std::sync::MutexGuard;

use anyhow::anyhow;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::{Headers, Method};
use esp_idf_svc::io::{Read, Write};
use log::{info, warn};

use crate::ota::{OtaManager, SharedOta};

const CHUNK_SIZE: usize = 1024;

fn lock(ota: &SharedOta) -> anyhow::Result<MutexGuard<'_, OtaManager>> {
    ota.lock().map_err(|_| anyhow!("OTA manager lock poisoned"))
}

/// Start the update server on `port`. Keep the returned server alive for
/// as long as updates should be accepted.
pub fn start(port: u16, ota: SharedOta) -> anyhow::Result<EspHttpServer<'static>> {
    let conf = Configuration {
        http_port: port,
        stack_size: 10 * 1024,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    server.fn_handler::<anyhow::Error, _>("/update", Method::Post, move |mut req| {
        let total = req
            .content_len()
            .and_then(|len| u32::try_from(len).ok())
            .unwrap_or(0);
        if let Err(e) = lock(&ota)?.begin(total) {
            warn!(target: "Core", "OTA rejected: {e}");
            req.into_status_response(400)?
                .write_all(e.to_string().as_bytes())?;
            return Ok(());
        }

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = match req.read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    lock(&ota)?.abort();
                    return Err(anyhow!("OTA receive failed: {e:?}"));
                }
            };
            if n == 0 {
                break;
            }
            if let Err(e) = lock(&ota)?.write_chunk(&buf[..n]) {
                warn!(target: "Core", "OTA write failed: {e}");
                req.into_status_response(500)?
                    .write_all(e.to_string().as_bytes())?;
                return Ok(());
            }
        }

        if let Err(e) = lock(&ota)?.finalize() {
            warn!(target: "Core", "OTA end failed: {e}");
            req.into_status_response(500)?
                .write_all(e.to_string().as_bytes())?;
            return Ok(());
        }
        req.into_ok_response()?.write_all(b"OK, rebooting")?;
        Ok(())
    })?;

    info!(target: "Core", "OTA server listening on port {}", port);
    Ok(server)
}
