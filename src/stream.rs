//! MJPEG preview of the frame currently being labeled.
//!
//! The server holds a single latest-frame slot; pushing a frame swaps
//! the whole encoded buffer under one lock, so a viewer thread always
//! reads either the previous complete frame or the new one. Any number
//! of viewers can connect, and one of them dropping off only closes
//! its own connection.

use std::io::{self, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use log::{debug, info, warn};

const BOUNDARY: &str = "maskset-frame";
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Anything that can receive the latest composited frame.
/// Pushes are fire-and-forget; a sink never reports back.
pub trait FrameSink {
    fn push(&self, frame: &RgbImage);
}

/// Sink that drops every frame, for headless runs and tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn push(&self, _frame: &RgbImage) {}
}

type FrameSlot = Arc<Mutex<Option<Arc<Vec<u8>>>>>;

/// HTTP server streaming the latest pushed frame as
/// `multipart/x-mixed-replace` JPEG parts.
pub struct MjpegServer {
    slot: FrameSlot,
    running: Arc<AtomicBool>,
    port: u16,
    accept_handle: Option<JoinHandle<()>>,
}

impl MjpegServer {
    /// Bind and start serving in a background thread. Pass port 0 to
    /// let the OS pick one; [`port`](Self::port) reports the choice.
    pub fn start(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .with_context(|| format!("binding preview server on port {port}"))?;
        let port = listener.local_addr()?.port();
        // Non-blocking accept so shutdown() can stop the loop
        listener.set_nonblocking(true)?;

        let slot: FrameSlot = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let accept_slot = Arc::clone(&slot);
        let accept_running = Arc::clone(&running);
        let accept_handle = thread::spawn(move || {
            while accept_running.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        debug!("viewer connected: {addr}");
                        let slot = Arc::clone(&accept_slot);
                        let running = Arc::clone(&accept_running);
                        thread::spawn(move || {
                            if let Err(e) = serve_viewer(stream, slot, running) {
                                debug!("viewer {addr} disconnected: {e}");
                            }
                        });
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        thread::sleep(FRAME_INTERVAL);
                    }
                    Err(e) => warn!("preview accept failed: {e}"),
                }
            }
        });

        info!("preview stream on http://0.0.0.0:{port}/");
        Ok(Self {
            slot,
            running,
            port,
            accept_handle: Some(accept_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting viewers and join the accept loop. Viewer threads
    /// notice the flag on their next frame tick and drain themselves.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }
    }
}

impl FrameSink for MjpegServer {
    fn push(&self, frame: &RgbImage) {
        let mut encoded = Vec::new();
        if let Err(e) = JpegEncoder::new(&mut encoded).encode_image(frame) {
            warn!("dropping preview frame: {e}");
            return;
        }
        *self.slot.lock().unwrap() = Some(Arc::new(encoded));
    }
}

impl Drop for MjpegServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve_viewer(mut stream: TcpStream, slot: FrameSlot, running: Arc<AtomicBool>) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.0 200 OK\r\n\
         Content-Type: multipart/x-mixed-replace; boundary={BOUNDARY}\r\n\r\n"
    )?;

    let mut last_sent: Option<Arc<Vec<u8>>> = None;
    while running.load(Ordering::Relaxed) {
        // Clone the Arc out under the lock; the swap in push() and this
        // read are the whole exchange protocol.
        let current = slot.lock().unwrap().clone();
        if let Some(frame) = current {
            let fresh = last_sent
                .as_ref()
                .map_or(true, |prev| !Arc::ptr_eq(prev, &frame));
            if fresh {
                write!(
                    stream,
                    "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                    frame.len()
                )?;
                stream.write_all(&frame)?;
                stream.write_all(b"\r\n")?;
                stream.flush()?;
                last_sent = Some(frame);
            }
        }
        thread::sleep(FRAME_INTERVAL);
    }
    Ok(())
}
