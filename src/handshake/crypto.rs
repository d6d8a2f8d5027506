// Crypto handshake primitives

use hmac::{Hmac, Mac};
use sha2::Sha256;

use std::sync::LazyLock;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use super::RTMP_SIG_SIZE;

// Digest length of SHA256
pub const SHA256DL: usize = 32;

pub const GENUINE_FMS: &str = "Genuine Adobe Flash Media Server 001";
pub const GENUINE_FP: &str = "Genuine Adobe Flash Player 001";

// Shared key suffix, floating around the net for a long time
static RANDOM_CRUD: LazyLock<Vec<u8>> = LazyLock::new(|| {
    hex::decode("f0eec24a8068bee82e00d0d1029e7e576eec5d2d29806fab93b8e636cfeb31ae")
        .unwrap_or_default()
});

static GENUINE_FMS_PLUS_CRUD: LazyLock<Vec<u8>> = LazyLock::new(|| {
    let mut v: Vec<u8> = GENUINE_FMS.bytes().collect();
    v.extend_from_slice(&RANDOM_CRUD);
    v
});

static GENUINE_FP_PLUS_CRUD: LazyLock<Vec<u8>> = LazyLock::new(|| {
    let mut v: Vec<u8> = GENUINE_FP.bytes().collect();
    v.extend_from_slice(&RANDOM_CRUD);
    v
});

/// Handshake peer role
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeRole {
    Client,
    Server,
}

impl HandshakeRole {
    /// Key prefix this role signs its own request digests with
    pub fn own_key_short(&self) -> &'static [u8] {
        match self {
            HandshakeRole::Client => GENUINE_FP.as_bytes(),
            HandshakeRole::Server => GENUINE_FMS.as_bytes(),
        }
    }

    /// Full key this role derives its response digest keys from
    pub fn own_key_full(&self) -> &'static [u8] {
        match self {
            HandshakeRole::Client => &GENUINE_FP_PLUS_CRUD,
            HandshakeRole::Server => &GENUINE_FMS_PLUS_CRUD,
        }
    }

    /// Key prefix the peer signs its request digests with
    pub fn other_key_short(&self) -> &'static [u8] {
        match self {
            HandshakeRole::Client => GENUINE_FMS.as_bytes(),
            HandshakeRole::Server => GENUINE_FP.as_bytes(),
        }
    }

    /// Full key the peer derives its response digest keys from
    pub fn other_key_full(&self) -> &'static [u8] {
        match self {
            HandshakeRole::Client => &GENUINE_FMS_PLUS_CRUD,
            HandshakeRole::Server => &GENUINE_FP_PLUS_CRUD,
        }
    }
}

/// Four-byte compat version carried in bytes 4..8 of a crypto
/// handshake request
pub type CompatVersion = (u8, u8, u8, u8);

pub const DEFAULT_SERVER_COMPAT_VERSION: CompatVersion = (3, 0, 1, 1);
pub const DEFAULT_CLIENT_COMPAT_VERSION: CompatVersion = (10, 0, 32, 2);
pub const NO_VERSION: CompatVersion = (0, 0, 0, 0);

pub const OFFSET_SCHEME_1: usize = 0;
pub const OFFSET_SCHEME_2: usize = 1;
pub const SCHEME_COUNT: usize = 2;

// Offset schemes, sorted by the client's minimum version in
// descending order
const SCHEMES_BY_CLIENT_VER: [(CompatVersion, usize); 2] = [
    ((10, 0, 32, 0), OFFSET_SCHEME_2),
    ((9, 0, 115, 0), OFFSET_SCHEME_1),
];

/// Locates the 32-byte digest inside a request, per scheme
pub fn scheme_digest_offset(scheme: usize, data: &[u8]) -> usize {
    let (pos, shift) = match scheme {
        OFFSET_SCHEME_1 => (8, 12),
        _ => (772, 776),
    };

    let sum: usize = data[pos..pos + 4].iter().map(|b| *b as usize).sum();
    sum % 728 + shift
}

/// Picks the digest offset scheme matching a client version
pub fn find_client_offset_scheme(version: CompatVersion) -> Option<usize> {
    for (min_version, scheme) in SCHEMES_BY_CLIENT_VER {
        if version >= min_version {
            return Some(scheme);
        }
    }
    None
}

/// Calculates HMAC-SHA256
pub fn calc_hmac(message: &[u8], key: &[u8]) -> Vec<u8> {
    let mut mac: Hmac<Sha256> = Hmac::new_from_slice(key).expect("HMAC can take key of any size");

    mac.update(message);

    mac.finalize().into_bytes().to_vec()
}

/// Compares 2 signatures
/// Returns true only if the 2 signatures are equal
pub fn compare_signatures(sig1: &[u8], sig2: &[u8]) -> bool {
    if sig1.len() != sig2.len() {
        return false;
    }

    let mut result = true;

    for i in 0..sig1.len() {
        result = result && (sig1[i] == sig2[i]);
    }

    result
}

/// Fills a buffer with random bytes
pub fn generate_random_bytes(count: usize) -> Vec<u8> {
    let mut bytes = vec![0; count];

    let mut rng = StdRng::from_os_rng();
    rng.fill_bytes(&mut bytes);

    bytes
}

/// Verifies that the digest embedded in a peer request matches the
/// given scheme
pub fn check_peer_scheme(scheme: usize, data: &[u8], role: HandshakeRole) -> bool {
    if data.len() != RTMP_SIG_SIZE {
        return false;
    }

    let offset = scheme_digest_offset(scheme, data);

    let mut message = Vec::with_capacity(RTMP_SIG_SIZE - SHA256DL);
    message.extend_from_slice(&data[..offset]);
    message.extend_from_slice(&data[offset + SHA256DL..]);

    let digest = calc_hmac(&message, role.other_key_short());

    compare_signatures(&data[offset..offset + SHA256DL], &digest)
}

/// Inserts this role's digest into a truncated base request
///
/// The base request is cut to 1504 bytes, the digest of the cut
/// request is computed with the role's short key and spliced in at
/// the scheme offset, restoring the full 1536 bytes.
pub fn make_digest_request(base_request: &[u8], scheme: usize, role: HandshakeRole) -> Vec<u8> {
    let request = &base_request[..RTMP_SIG_SIZE - SHA256DL];

    let offset = scheme_digest_offset(scheme, request);
    let digest = calc_hmac(request, role.own_key_short());

    let mut out = Vec::with_capacity(RTMP_SIG_SIZE);
    out.extend_from_slice(&request[..offset]);
    out.extend_from_slice(&digest);
    out.extend_from_slice(&request[offset..]);
    out
}

/// Builds a crypto response to a peer request: 1504 random bytes
/// signed with a key derived from the peer's embedded digest
pub fn make_digest_response(peer_request: &[u8], scheme: usize, role: HandshakeRole) -> Vec<u8> {
    let offset = scheme_digest_offset(scheme, peer_request);
    let peer_digest = &peer_request[offset..offset + SHA256DL];

    let digest_key = calc_hmac(peer_digest, role.own_key_full());

    let mut response = generate_random_bytes(RTMP_SIG_SIZE - SHA256DL);
    let digest = calc_hmac(&response, &digest_key);

    response.extend_from_slice(&digest);
    response
}

/// Verifies the peer's response to our digest request
pub fn verify_digest_response(
    own_request: &[u8],
    response: &[u8],
    scheme: usize,
    role: HandshakeRole,
    strict: bool,
) -> bool {
    if response.len() != RTMP_SIG_SIZE {
        return false;
    }

    let offset = scheme_digest_offset(scheme, own_request);
    let req_digest = &own_request[offset..offset + SHA256DL];

    let digest_key = calc_hmac(req_digest, role.other_key_full());
    let digest = calc_hmac(&response[..RTMP_SIG_SIZE - SHA256DL], &digest_key);

    if !strict {
        return true;
    }

    compare_signatures(&response[RTMP_SIG_SIZE - SHA256DL..], &digest)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_offsets_in_range() {
        let data = generate_random_bytes(RTMP_SIG_SIZE);

        let o1 = scheme_digest_offset(OFFSET_SCHEME_1, &data);
        assert!((12..740).contains(&o1));

        let o2 = scheme_digest_offset(OFFSET_SCHEME_2, &data);
        assert!((776..1504).contains(&o2));
    }

    #[test]
    fn test_find_client_offset_scheme() {
        assert_eq!(
            find_client_offset_scheme((10, 0, 32, 2)),
            Some(OFFSET_SCHEME_2)
        );
        assert_eq!(
            find_client_offset_scheme((9, 0, 115, 0)),
            Some(OFFSET_SCHEME_1)
        );
        assert_eq!(find_client_offset_scheme((1, 0, 0, 0)), None);
    }

    #[test]
    fn test_digest_request_verifies() {
        let base = generate_random_bytes(RTMP_SIG_SIZE);

        for scheme in [OFFSET_SCHEME_1, OFFSET_SCHEME_2] {
            let request = make_digest_request(&base, scheme, HandshakeRole::Client);

            assert_eq!(request.len(), RTMP_SIG_SIZE);

            // the server validates the client digest
            assert!(check_peer_scheme(scheme, &request, HandshakeRole::Server));

            // the other scheme must not match
            let other = 1 - scheme;
            assert!(!check_peer_scheme(other, &request, HandshakeRole::Server));
        }
    }

    #[test]
    fn test_digest_response_roundtrip() {
        let scheme = OFFSET_SCHEME_2;

        let base = generate_random_bytes(RTMP_SIG_SIZE);
        let client_request = make_digest_request(&base, scheme, HandshakeRole::Client);

        // server responds to the client request
        let response = make_digest_response(&client_request, scheme, HandshakeRole::Server);

        // the client verifies the server response against its own request
        assert!(verify_digest_response(
            &client_request,
            &response,
            scheme,
            HandshakeRole::Client,
            true,
        ));

        // a tampered response fails strict verification
        let mut bad = response.clone();
        bad[100] ^= 0xff;
        assert!(!verify_digest_response(
            &client_request,
            &bad,
            scheme,
            HandshakeRole::Client,
            true,
        ));

        // but passes in relaxed mode
        assert!(verify_digest_response(
            &client_request,
            &bad,
            scheme,
            HandshakeRole::Client,
            false,
        ));
    }
}
