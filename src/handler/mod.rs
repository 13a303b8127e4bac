//! Request handler for the media presence protocol.
//!
//! Transport-independent: the HTTP gateway hands over the method, the peer
//! address string, the relevant header values, and the fully-buffered body;
//! this module runs the precondition checks, the protocol codec, and the
//! index intersection, and reports one terminal [`Outcome`] per request.
//! Nothing is retried; a rejected client is expected to resend under
//! corrected conditions.

use crate::digest::Digest;
use crate::index::MediaIndex;
use crate::protocol;
use bytes::Bytes;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One inbound request as seen at the transport boundary.
pub struct MediaRequest<'a> {
    pub method: &'a str,
    /// Remote address as `host:port`.
    pub remote_addr: &'a str,
    pub user_agent: &'a str,
    pub referer: &'a str,
    pub body: &'a [u8],
}

/// Peer identity derived per request for validation and logging. Never used
/// for indexing.
#[derive(Debug, PartialEq, Eq)]
pub struct PeerContext {
    /// Remote host with the port stripped.
    pub host: String,
}

impl PeerContext {
    /// Split `host:port` into its host part. IPv6 literals keep their
    /// brackets (`[::1]:5000` becomes `[::1]`).
    pub fn from_remote_addr(remote_addr: &str) -> Option<Self> {
        let (host, port) = remote_addr.rsplit_once(':')?;
        if host.is_empty() || port.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
        })
    }
}

/// Terminal result of handling one request. Every variant maps to exactly
/// one transport status.
#[derive(Debug)]
pub enum Outcome {
    /// Well-formed request answered with a protocol frame.
    Served {
        body: Bytes,
        matched: usize,
        requested: usize,
    },
    /// Transport verb was not POST; the body was never read.
    MethodRejected,
    /// Referer header absent or empty.
    OriginRejected,
    /// Remote address did not split into host and port.
    PeerUnresolvable,
    /// Body failed protocol decoding; no protocol frame is sent back.
    ProtocolRejected,
}

/// Run one request through the precondition checks, the codec, and the
/// index intersection.
///
/// The referer check is a best-effort heuristic against anonymous
/// cross-site probing of the index. The value is client-supplied and
/// unauthenticated, so this is deliberately not a security boundary.
pub fn handle(index: &MediaIndex, request: &MediaRequest) -> Outcome {
    if request.method != "POST" {
        debug!("Rejected {} request from {}", request.method, request.remote_addr);
        return Outcome::MethodRejected;
    }

    if request.referer.is_empty() {
        debug!("Rejected request without referer from {}", request.remote_addr);
        return Outcome::OriginRejected;
    }

    let peer = match PeerContext::from_remote_addr(request.remote_addr) {
        Some(peer) => peer,
        None => {
            warn!("Unresolvable remote address: {:?}", request.remote_addr);
            return Outcome::PeerUnresolvable;
        }
    };

    let requested = match protocol::decode_request(request.body) {
        Ok(digests) => digests,
        Err(e) => {
            warn!("Rejected request from {}: {}", peer.host, e);
            return Outcome::ProtocolRejected;
        }
    };

    // Intersect with the current snapshot, deduplicating repeats in the
    // request. Sorted so the response bytes are deterministic.
    let mut seen = HashSet::new();
    let mut matched: Vec<Digest> = requested
        .iter()
        .filter(|d| index.contains(d) && seen.insert(**d))
        .copied()
        .collect();
    matched.sort_unstable();

    let body = protocol::encode_response(&matched);

    info!(
        "{} '{}' '{}' {}/{} {}",
        peer.host,
        request.user_agent,
        request.referer,
        matched.len(),
        requested.len(),
        body.len()
    );

    Outcome::Served {
        matched: matched.len(),
        requested: requested.len(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MediaIndex;
    use crate::protocol::{decode_request, HEADER_LEN};
    use assert_matches::assert_matches;

    fn digest(fill: u8) -> Digest {
        Digest::from_bytes([fill; Digest::LEN])
    }

    fn request_body(digests: &[Digest]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"MTHS\x00\x01");
        for d in digests {
            body.extend_from_slice(d.as_bytes());
        }
        body
    }

    fn request<'a>(body: &'a [u8]) -> MediaRequest<'a> {
        MediaRequest {
            method: "POST",
            remote_addr: "192.0.2.7:54321",
            user_agent: "Minetest/5.8.0",
            referer: "https://game.example/",
            body,
        }
    }

    #[test]
    fn rejects_non_post_method() {
        let index = MediaIndex::default();
        let body = request_body(&[]);
        let mut req = request(&body);
        req.method = "GET";
        assert_matches!(handle(&index, &req), Outcome::MethodRejected);
    }

    #[test]
    fn rejects_empty_referer() {
        let index = MediaIndex::default();
        let body = request_body(&[]);
        let mut req = request(&body);
        req.referer = "";
        assert_matches!(handle(&index, &req), Outcome::OriginRejected);
    }

    #[test]
    fn rejects_unresolvable_peer() {
        let index = MediaIndex::default();
        let body = request_body(&[]);
        let mut req = request(&body);
        req.remote_addr = "not-an-address";
        assert_matches!(handle(&index, &req), Outcome::PeerUnresolvable);
    }

    #[test]
    fn rejects_malformed_body() {
        let index = MediaIndex::default();
        let req = request(b"XXXX\x00\x01");
        assert_matches!(handle(&index, &req), Outcome::ProtocolRejected);
    }

    #[test]
    fn serves_intersection_of_request_and_index() {
        // Index holds h1, h2, h3; client asks for [h1, h4, h2].
        let (h1, h2, h3, h4) = (digest(1), digest(2), digest(3), digest(4));
        let index: MediaIndex = [h1, h2, h3].into_iter().collect();

        let body = request_body(&[h1, h4, h2]);
        let outcome = handle(&index, &request(&body));

        let Outcome::Served {
            body,
            matched,
            requested,
        } = outcome
        else {
            panic!("expected Served");
        };
        assert_eq!((matched, requested), (2, 3));

        let answered: HashSet<Digest> = decode_request(&body).unwrap().into_iter().collect();
        assert_eq!(answered, [h1, h2].into_iter().collect());
    }

    #[test]
    fn response_is_subset_of_request_and_index() {
        let index: MediaIndex = [digest(1), digest(9)].into_iter().collect();
        let sent = [digest(1), digest(2), digest(9), digest(7)];
        let body = request_body(&sent);

        let Outcome::Served { body, .. } = handle(&index, &request(&body)) else {
            panic!("expected Served");
        };
        for d in decode_request(&body).unwrap() {
            assert!(sent.contains(&d));
            assert!(index.contains(&d));
        }
    }

    #[test]
    fn duplicates_in_request_answered_once() {
        let index: MediaIndex = [digest(5)].into_iter().collect();
        let body = request_body(&[digest(5), digest(5), digest(5)]);

        let Outcome::Served {
            body,
            matched,
            requested,
        } = handle(&index, &request(&body))
        else {
            panic!("expected Served");
        };
        assert_eq!((matched, requested), (1, 3));
        assert_eq!(decode_request(&body).unwrap(), vec![digest(5)]);
    }

    #[test]
    fn empty_request_gets_empty_framed_response() {
        let index: MediaIndex = [digest(1)].into_iter().collect();
        let body = request_body(&[]);

        let Outcome::Served {
            body,
            matched,
            requested,
        } = handle(&index, &request(&body))
        else {
            panic!("expected Served");
        };
        assert_eq!((matched, requested), (0, 0));
        assert_eq!(body.len(), HEADER_LEN);
    }

    #[test]
    fn no_match_still_emits_framing() {
        let index: MediaIndex = [digest(1)].into_iter().collect();
        let body = request_body(&[digest(8), digest(9)]);

        let Outcome::Served { body, matched, .. } = handle(&index, &request(&body)) else {
            panic!("expected Served");
        };
        assert_eq!(matched, 0);
        assert_eq!(&body[..], b"MTHS\x00\x01");
    }

    #[test]
    fn ipv6_peer_resolves() {
        let peer = PeerContext::from_remote_addr("[::1]:5000").unwrap();
        assert_eq!(peer.host, "[::1]");
    }
}
