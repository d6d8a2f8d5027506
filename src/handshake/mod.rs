// RTMP handshake engine

mod crypto;

pub use crypto::*;

use std::time::Instant;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::utils::ms_time_wrapped;
use crate::vecbuf::VecBuf;

/// Protocol version byte
pub const RTMP_VERSION: u8 = 3;

/// Size of a handshake packet
pub const RTMP_SIG_SIZE: usize = 1536;

/// Handshake error
///
/// The engine does not close the transport itself; the session layer
/// decides what to do with a failed handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("protocol version mismatch: got {0}")]
    VersionMismatch(u8),

    #[error("response verification failed")]
    VerificationFailed,

    #[error("could not determine the client digest scheme")]
    SchemeDiscoveryFailed,
}

/// Reported on handshake success
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandshakeOutcome {
    /// Seconds from the session epoch to the moment our request was
    /// sent
    pub init_time: f64,

    /// Round trip delay measured over the handshake, in seconds
    pub round_trip: f64,
}

enum HandshakeState {
    WaitVersion,
    WaitRequest,
    WaitResponse,
    Done,
    Failed,
}

struct CryptoState {
    compat_version: CompatVersion,
    scheme: Option<usize>,
    strict: bool,
}

/// The handshake protocol
///
/// Interaction goes like this:
///   * cl: ()->v+CLHS sent->(v+SVHS rcvd)->SVHS sent->(CLHS rcvd) OK!
///   * sv: ()->(v rcvd)->v+SVHS sent->(CLHS rcvd)->CLHS sent->(SVHS rcvd) OK!
///
/// where:
///   * v    - version packet
///   * SVHS - server handshake packet
///   * CLHS - client handshake packet
///
/// Byte-fed: `data_received` consumes wire bytes and returns the
/// bytes to send back, plus the outcome once the exchange completes.
/// Bytes past the handshake stay buffered for the chunk layer.
pub struct Handshaker {
    role: HandshakeRole,
    epoch: Instant,

    // None selects the plain variant
    crypto: Option<CryptoState>,

    state: HandshakeState,
    buf: VecBuf,

    own_request: Vec<u8>,
    ts_init: Option<Instant>,
}

impl Handshaker {
    /// Creates a plain handshaker
    pub fn new_plain(role: HandshakeRole, epoch: Instant) -> Handshaker {
        Handshaker {
            role,
            epoch,
            crypto: None,
            state: HandshakeState::WaitVersion,
            buf: VecBuf::new(),
            own_request: Vec::new(),
            ts_init: None,
        }
    }

    /// Creates a crypto-validating handshaker
    pub fn new_crypto(role: HandshakeRole, epoch: Instant) -> Handshaker {
        let crypto = match role {
            HandshakeRole::Client => {
                // pick the scheme matching our advertised version;
                // with none available, degrade to plain packets
                let scheme = find_client_offset_scheme(DEFAULT_CLIENT_COMPAT_VERSION);
                CryptoState {
                    compat_version: if scheme.is_some() {
                        DEFAULT_CLIENT_COMPAT_VERSION
                    } else {
                        NO_VERSION
                    },
                    scheme,
                    strict: true,
                }
            }
            HandshakeRole::Server => CryptoState {
                compat_version: DEFAULT_SERVER_COMPAT_VERSION,
                scheme: None,
                strict: true,
            },
        };

        Handshaker {
            role,
            epoch,
            crypto: Some(crypto),
            state: HandshakeState::WaitVersion,
            buf: VecBuf::new(),
            own_request: Vec::new(),
            ts_init: None,
        }
    }

    fn epoch_time_ms(&self) -> u32 {
        ms_time_wrapped(self.epoch.elapsed().as_secs_f64())
    }

    /// Starts the exchange. The client speaks first; for a server
    /// this returns nothing.
    pub fn start(&mut self) -> Vec<u8> {
        if self.role != HandshakeRole::Client {
            return Vec::new();
        }

        self.own_request = self.generate_request(None).unwrap_or_default();
        self.ts_init = Some(Instant::now());

        let mut out = vec![RTMP_VERSION];
        out.extend_from_slice(&self.own_request);
        out
    }

    /// Feeds received bytes
    ///
    /// Returns the bytes to write back and, once the handshake
    /// completes, the outcome. Remaining bytes are kept for
    /// `take_leftover`.
    pub fn data_received(
        &mut self,
        data: &[u8],
    ) -> Result<(Vec<u8>, Option<HandshakeOutcome>), HandshakeError> {
        self.buf.write(data.to_vec());

        let mut out = Vec::new();

        loop {
            match self.state {
                HandshakeState::WaitVersion => {
                    if self.buf.is_empty() {
                        return Ok((out, None));
                    }

                    let version = self.buf.read(1).map(|b| b[0]).unwrap_or(0);

                    if version != RTMP_VERSION {
                        self.state = HandshakeState::Failed;
                        return Err(HandshakeError::VersionMismatch(version));
                    }

                    self.state = HandshakeState::WaitRequest;
                }
                HandshakeState::WaitRequest => {
                    if self.buf.len() < RTMP_SIG_SIZE {
                        return Ok((out, None));
                    }

                    let peer_request = match self.buf.read(RTMP_SIG_SIZE) {
                        Ok(r) => r.to_vec(),
                        Err(_) => return Ok((out, None)),
                    };

                    if self.role == HandshakeRole::Server {
                        self.own_request = self.generate_request(Some(&peer_request))?;
                        self.ts_init = Some(Instant::now());

                        out.push(RTMP_VERSION);
                        out.extend_from_slice(&self.own_request);
                    }

                    out.extend_from_slice(&self.generate_response(&peer_request));

                    self.state = HandshakeState::WaitResponse;
                }
                HandshakeState::WaitResponse => {
                    if self.buf.len() < RTMP_SIG_SIZE {
                        return Ok((out, None));
                    }

                    let response = match self.buf.read(RTMP_SIG_SIZE) {
                        Ok(r) => r.to_vec(),
                        Err(_) => return Ok((out, None)),
                    };

                    if !self.verify_response(&response) {
                        self.state = HandshakeState::Failed;
                        return Err(HandshakeError::VerificationFailed);
                    }

                    self.state = HandshakeState::Done;

                    let now = Instant::now();
                    let ts_init = self.ts_init.unwrap_or(now);

                    return Ok((
                        out,
                        Some(HandshakeOutcome {
                            init_time: ts_init.duration_since(self.epoch).as_secs_f64(),
                            round_trip: now.duration_since(ts_init).as_secs_f64(),
                        }),
                    ));
                }
                HandshakeState::Done | HandshakeState::Failed => {
                    return Ok((out, None));
                }
            }
        }
    }

    /// Returns true once the exchange has completed
    pub fn is_done(&self) -> bool {
        matches!(self.state, HandshakeState::Done)
    }

    /// Hands over the bytes received past the handshake
    pub fn take_leftover(&mut self) -> VecBuf {
        std::mem::take(&mut self.buf)
    }

    // Base 1536-byte request: timestamp, compat version (zero for
    // plain), random tail
    fn generate_base_request(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(RTMP_SIG_SIZE);

        let mut ts = [0u8; 4];
        BigEndian::write_u32(&mut ts, self.epoch_time_ms());
        packet.extend_from_slice(&ts);

        match &self.crypto {
            Some(crypto) => {
                let (v0, v1, v2, v3) = crypto.compat_version;
                packet.extend_from_slice(&[v0, v1, v2, v3]);
            }
            None => packet.extend_from_slice(&[0, 0, 0, 0]),
        }

        packet.extend_from_slice(&generate_random_bytes(RTMP_SIG_SIZE - 8));
        packet
    }

    fn generate_request(&mut self, context: Option<&[u8]>) -> Result<Vec<u8>, HandshakeError> {
        let base_request = self.generate_base_request();

        let scheme = match &mut self.crypto {
            None => return Ok(base_request),
            Some(crypto) => {
                if self.role == HandshakeRole::Server {
                    crypto.scheme = match context {
                        Some(peer_request) => discover_client_scheme(
                            peer_request,
                            crypto.strict,
                        )?,
                        None => None,
                    };
                }

                match crypto.scheme {
                    Some(scheme) => scheme,
                    None => return Ok(base_request),
                }
            }
        };

        Ok(make_digest_request(&base_request, scheme, self.role))
    }

    // Echo of the peer request with our timestamp in bytes 4..8
    fn generate_simple_response(&self, peer_request: &[u8]) -> Vec<u8> {
        let mut response = Vec::with_capacity(RTMP_SIG_SIZE);

        response.extend_from_slice(&peer_request[0..4]);

        let mut ts = [0u8; 4];
        BigEndian::write_u32(&mut ts, self.epoch_time_ms());
        response.extend_from_slice(&ts);

        response.extend_from_slice(&peer_request[8..]);
        response
    }

    fn generate_response(&self, peer_request: &[u8]) -> Vec<u8> {
        match self.crypto.as_ref().and_then(|c| c.scheme) {
            Some(scheme) => make_digest_response(peer_request, scheme, self.role),
            None => self.generate_simple_response(peer_request),
        }
    }

    fn verify_simple_response(&self, response: &[u8]) -> bool {
        response.len() == RTMP_SIG_SIZE
            && response[0..4] == self.own_request[0..4]
            && response[8..] == self.own_request[8..]
    }

    fn verify_response(&self, response: &[u8]) -> bool {
        match &self.crypto {
            Some(crypto) => match crypto.scheme {
                Some(scheme) => verify_digest_response(
                    &self.own_request,
                    response,
                    scheme,
                    self.role,
                    crypto.strict,
                ),
                None => self.verify_simple_response(response),
            },
            None => self.verify_simple_response(response),
        }
    }
}

// Figures out which digest scheme the client used: first the one its
// compat version indicates, then all remaining known ones
fn discover_client_scheme(
    peer_request: &[u8],
    strict: bool,
) -> Result<Option<usize>, HandshakeError> {
    let client_version = (
        peer_request[4],
        peer_request[5],
        peer_request[6],
        peer_request[7],
    );

    if client_version == NO_VERSION {
        return Ok(None);
    }

    let indicated = find_client_offset_scheme(client_version);

    if let Some(scheme) = indicated {
        if check_peer_scheme(scheme, peer_request, HandshakeRole::Server) {
            return Ok(Some(scheme));
        }
    }

    for scheme in 0..SCHEME_COUNT {
        if Some(scheme) == indicated {
            continue;
        }

        if check_peer_scheme(scheme, peer_request, HandshakeRole::Server) {
            return Ok(Some(scheme));
        }
    }

    if strict {
        return Err(HandshakeError::SchemeDiscoveryFailed);
    }

    Ok(Some(OFFSET_SCHEME_1))
}

// Tests
