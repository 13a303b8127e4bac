//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a scratch webroot, populates it
//! with media files, builds the index, and wires up the full
//! [`AppContext`]. The [`with_server`] constructor starts Axum on a random
//! port for HTTP-level testing.

use std::net::SocketAddr;
use std::sync::Arc;

use mediasrv::config::Config;
use mediasrv::digest::Digest;
use mediasrv::index::{MediaIndex, SharedIndex};
use mediasrv::server::{create_router, AppContext};
use tempfile::TempDir;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary webroot.
pub struct TestHarness {
    pub ctx: AppContext,
    pub webroot: TempDir,
    /// Digest of each media file, in the order given to the constructor.
    pub digests: Vec<Digest>,
}

impl TestHarness {
    /// Create a harness whose webroot holds one file per content blob,
    /// each named by its own hex digest as the collector would leave it.
    pub fn with_media(contents: &[&[u8]]) -> Self {
        let webroot = TempDir::new().expect("failed to create webroot");

        let mut digests = Vec::new();
        for content in contents {
            let digest = Digest::from_reader(*content).expect("failed to hash content");
            std::fs::write(webroot.path().join(digest.to_hex()), content)
                .expect("failed to write media file");
            digests.push(digest);
        }

        let index = MediaIndex::build(webroot.path()).expect("failed to build index");
        let mut config = Config::default();
        config.media.webroot = webroot.path().to_path_buf();

        let ctx = AppContext {
            config: Arc::new(config),
            index: SharedIndex::new(index),
        };

        Self {
            ctx,
            webroot,
            digests,
        }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server(contents: &[&[u8]]) -> (Self, SocketAddr) {
        let harness = Self::with_media(contents);
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        (harness, addr)
    }
}

/// Build a protocol frame carrying the given digests.
pub fn frame(digests: &[Digest]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"MTHS\x00\x01");
    for d in digests {
        body.extend_from_slice(d.as_bytes());
    }
    body
}
