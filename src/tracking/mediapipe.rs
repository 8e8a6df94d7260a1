//! MediaPipe FaceMesh helper client
//!
//! Talks JSON over UDP to the `scripts/facemesh_server.py` Python helper, which
//! owns the camera and the FaceMesh model. Each detection is a request
//! datagram carrying a request id; the helper answers with one datagram per
//! face found in its latest camera frame, each echoing the id.

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use crate::config::MediaPipeConfig;
use crate::error::{FacePaintError, TrackingError};
use crate::tracking::{LandmarkDetector, RawFace};

/// Detection request sent to the helper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpRequest {
    pub request: u64,
}

/// One reply datagram from the helper.
///
/// A reply carries one face, so a request is answered with `count`
/// datagrams (or a single one with `count = 0` when no face was found).
#[derive(Debug, Clone, Deserialize)]
pub struct MpFacePacket {
    /// Echo of the request id
    pub request: u64,
    /// Faces found for this request
    #[serde(default)]
    pub count: usize,
    /// Position of this face within the reply
    #[serde(default)]
    pub index: usize,
    /// `[x, y, z]` landmarks in pixel space
    #[serde(default)]
    pub landmarks: Option<RawFace>,
    /// Helper-side failure (camera read, inference)
    #[serde(default)]
    pub error: Option<String>,
}

/// Collects the per-face datagrams of one reply
#[derive(Debug)]
struct FaceAssembly {
    slots: Vec<Option<RawFace>>,
    filled: usize,
}

impl FaceAssembly {
    fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
            filled: 0,
        }
    }

    fn insert(&mut self, index: usize, face: RawFace) {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(face);
                self.filled += 1;
            }
            Some(_) => tracing::debug!("Duplicate helper datagram for face {}", index),
            None => tracing::debug!(
                "Helper face index {} out of range ({} faces)",
                index,
                self.slots.len()
            ),
        }
    }

    fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    fn into_faces(self) -> Vec<RawFace> {
        self.slots.into_iter().flatten().collect()
    }
}

/// MediaPipe helper detector
pub struct MpDetector {
    socket: UdpSocket,
    timeout: Duration,
    next_request: AtomicU64,
    /// One request/response exchange at a time
    exchange: Mutex<()>,
}

impl MpDetector {
    /// Bind the local socket and connect it to the helper
    pub async fn connect(config: &MediaPipeConfig) -> Result<Self, FacePaintError> {
        let socket = UdpSocket::bind(&config.listen_address).await.map_err(|e| {
            TrackingError::Connection(format!(
                "Failed to bind to {}: {}",
                config.listen_address, e
            ))
        })?;

        let helper = format!("{}:{}", config.host, config.port);
        socket.connect(&helper).await.map_err(|e| {
            TrackingError::Connection(format!("Failed to connect to {}: {}", helper, e))
        })?;

        tracing::info!("MediaPipe detector using helper at {}", helper);

        Ok(Self {
            socket,
            timeout: Duration::from_millis(config.request_timeout_ms),
            next_request: AtomicU64::new(0),
            exchange: Mutex::new(()),
        })
    }

    async fn request(&self) -> Result<Vec<RawFace>, TrackingError> {
        let _exchange = self.exchange.lock().await;
        let id = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;

        let body = serde_json::to_vec(&MpRequest { request: id })
            .map_err(|e| TrackingError::Parse(format!("JSON encode error: {}", e)))?;
        self.socket
            .send(&body)
            .await
            .map_err(|e| TrackingError::Connection(format!("Send error: {}", e)))?;

        let timeout_ms = self.timeout.as_millis() as u64;
        tokio::time::timeout(self.timeout, self.receive(id))
            .await
            .map_err(|_| TrackingError::Timeout(timeout_ms))?
    }

    /// Wait for every face of the reply to `id`. Late answers to earlier
    /// requests and malformed datagrams are skipped.
    async fn receive(&self, id: u64) -> Result<Vec<RawFace>, TrackingError> {
        let mut buf = vec![0u8; 65536];
        let mut assembly: Option<FaceAssembly> = None;
        loop {
            let size = self
                .socket
                .recv(&mut buf)
                .await
                .map_err(|e| TrackingError::Connection(format!("Receive error: {}", e)))?;

            let packet: MpFacePacket = match serde_json::from_slice(&buf[..size]) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::warn!("Skipping malformed helper datagram: {}", e);
                    continue;
                }
            };

            if packet.request != id {
                tracing::debug!(
                    "Dropping late helper response {} (waiting for {})",
                    packet.request,
                    id
                );
                continue;
            }
            if let Some(message) = packet.error {
                return Err(TrackingError::Connection(message));
            }

            let parts = assembly.get_or_insert_with(|| FaceAssembly::new(packet.count));
            if let Some(face) = packet.landmarks {
                parts.insert(packet.index, face);
            }
            if parts.is_complete() {
                break;
            }
        }
        Ok(assembly.map(FaceAssembly::into_faces).unwrap_or_default())
    }
}

impl LandmarkDetector for MpDetector {
    fn estimate_faces(&self) -> BoxFuture<'_, Result<Vec<RawFace>, TrackingError>> {
        self.request().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(points: usize, seed: f32) -> RawFace {
        (0..points)
            .map(|i| [seed + i as f32, 2.0 * i as f32, -1.0])
            .collect()
    }

    /// The datagrams the helper sends for one reply
    fn reply(request: u64, faces: &[RawFace]) -> Vec<String> {
        if faces.is_empty() {
            return vec![serde_json::json!({ "request": request, "count": 0 }).to_string()];
        }
        faces
            .iter()
            .enumerate()
            .map(|(index, landmarks)| {
                serde_json::json!({
                    "request": request,
                    "count": faces.len(),
                    "index": index,
                    "landmarks": landmarks,
                })
                .to_string()
            })
            .collect()
    }

    /// Fake helper answering every request with `faces`. Before each reply it
    /// sends `noise` datagrams: a reply to an older id and a malformed one.
    async fn spawn_helper(faces: Vec<RawFace>, noise: bool) -> std::net::SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            loop {
                let (size, peer) = socket.recv_from(&mut buf).await.unwrap();
                let req: MpRequest = serde_json::from_slice(&buf[..size]).unwrap();
                if noise {
                    for stale in reply(req.request.saturating_sub(1), &[]) {
                        socket.send_to(stale.as_bytes(), peer).await.unwrap();
                    }
                    socket.send_to(b"{not json", peer).await.unwrap();
                }
                for datagram in reply(req.request, &faces) {
                    socket.send_to(datagram.as_bytes(), peer).await.unwrap();
                }
            }
        });
        addr
    }

    fn config_for(addr: std::net::SocketAddr) -> MediaPipeConfig {
        MediaPipeConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            listen_address: "127.0.0.1:0".to_string(),
            request_timeout_ms: 2000,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_packet() {
        let datagrams = reply(7, &[face(3, 0.0), face(3, 10.0)]);
        let pkt: MpFacePacket = serde_json::from_str(&datagrams[1]).unwrap();
        assert_eq!(pkt.request, 7);
        assert_eq!(pkt.count, 2);
        assert_eq!(pkt.index, 1);
        let landmarks = pkt.landmarks.unwrap();
        assert_eq!(landmarks.len(), 3);
        assert!((landmarks[2][0] - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_no_faces() {
        let pkt: MpFacePacket = serde_json::from_str(r#"{"request":1}"#).unwrap();
        assert_eq!(pkt.count, 0);
        assert!(pkt.landmarks.is_none());
        assert!(FaceAssembly::new(pkt.count).is_complete());
    }

    #[test]
    fn test_assembly_orders_by_index() {
        let mut assembly = FaceAssembly::new(2);
        assembly.insert(1, face(1, 5.0));
        assert!(!assembly.is_complete());
        // Duplicates and out-of-range indices do not count
        assembly.insert(1, face(1, 9.0));
        assembly.insert(4, face(1, 9.0));
        assert!(!assembly.is_complete());
        assembly.insert(0, face(1, 1.0));
        assert!(assembly.is_complete());

        let faces = assembly.into_faces();
        assert_eq!(faces[0][0][0], 1.0);
        assert_eq!(faces[1][0][0], 5.0);
    }

    #[tokio::test]
    async fn test_request_response() {
        let addr = spawn_helper(vec![face(3, 0.0)], false).await;
        let detector = MpDetector::connect(&config_for(addr)).await.unwrap();

        let faces = detector.estimate_faces().await.unwrap();
        assert_eq!(faces.len(), 1);
        let faces = detector.estimate_faces().await.unwrap();
        assert_eq!(faces[0][1], [1.0, 2.0, -1.0]);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let addr = spawn_helper(Vec::new(), false).await;
        let detector = MpDetector::connect(&config_for(addr)).await.unwrap();
        assert!(detector.estimate_faces().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_three_full_faces() {
        let faces: Vec<RawFace> = (0..3).map(|i| face(468, i as f32 * 1000.0)).collect();
        for datagram in reply(1, &faces) {
            assert!(datagram.len() < 65507, "datagram of {} bytes", datagram.len());
        }

        let addr = spawn_helper(faces, false).await;
        let detector = MpDetector::connect(&config_for(addr)).await.unwrap();

        let received = detector.estimate_faces().await.unwrap();
        assert_eq!(received.len(), 3);
        assert!(received.iter().all(|f| f.len() == 468));
        assert_eq!(received[2][0][0], 2000.0);
    }

    #[tokio::test]
    async fn test_late_and_malformed_datagrams_skipped() {
        let addr = spawn_helper(vec![face(3, 0.0), face(3, 1.0)], true).await;
        let detector = MpDetector::connect(&config_for(addr)).await.unwrap();

        for _ in 0..2 {
            let faces = detector.estimate_faces().await.unwrap();
            assert_eq!(faces.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_helper_error_is_tracking_error() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (size, peer) = socket.recv_from(&mut buf).await.unwrap();
            let req: MpRequest = serde_json::from_slice(&buf[..size]).unwrap();
            let body = serde_json::json!({ "request": req.request, "error": "camera closed" });
            socket.send_to(body.to_string().as_bytes(), peer).await.unwrap();
        });

        let detector = MpDetector::connect(&config_for(addr)).await.unwrap();
        let err = detector.estimate_faces().await.unwrap_err();
        assert!(err.to_string().contains("camera closed"));
    }

    #[tokio::test]
    async fn test_timeout_without_helper() {
        // Bound but silent peer
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = config_for(silent.local_addr().unwrap());
        config.request_timeout_ms = 50;

        let detector = MpDetector::connect(&config).await.unwrap();
        let err = detector.estimate_faces().await.unwrap_err();
        assert!(matches!(err, TrackingError::Timeout(50)));
    }
}
