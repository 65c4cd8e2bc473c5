use std::sync::Arc;

use sqids::Sqids;

/// Reversible mapping between record ids and short codes.
///
/// This is obfuscation only. Codes do not look sequential, but anyone
///  holding the alphabet can enumerate them.
#[derive(Clone)]
pub struct ShareCodec {
    sqids: Arc<Sqids>,
}

impl std::fmt::Debug for ShareCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareCodec").finish_non_exhaustive()
    }
}

impl Default for ShareCodec {
    fn default() -> Self {
        Self {
            sqids: Arc::new(Sqids::default()),
        }
    }
}

impl ShareCodec {
    pub fn encode(&self, id: u64) -> Option<String> {
        match self.sqids.encode(&[id]) {
            Ok(code) => Some(code),
            Err(e) => {
                tracing::error!(id, error = %e, "failed to encode share code");
                None
            }
        }
    }

    /// Decode a code into its id.
    ///
    /// Only the canonical spelling of an id is accepted: the code must
    ///  carry exactly one number and re-encode to itself.
    pub fn decode(&self, code: &str) -> Option<u64> {
        if code.is_empty() {
            return None;
        }
        match self.sqids.decode(code).as_slice() {
            [id] if self.encode(*id).as_deref() == Some(code) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inverts_encode() {
        let codec = ShareCodec::default();
        for id in [0, 1, 2, 3, 99, 12_345, u32::MAX as u64] {
            let code = codec.encode(id).unwrap();
            assert_eq!(codec.decode(&code), Some(id));
        }
    }

    #[test]
    fn test_codes_do_not_look_sequential() {
        let codec = ShareCodec::default();
        let a = codec.encode(1).unwrap();
        let b = codec.encode(2).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, "1");
        assert_ne!(b, "2");
    }

    #[test]
    fn test_rejects_malformed_codes() {
        let codec = ShareCodec::default();
        assert_eq!(codec.decode(""), None);
        assert_eq!(codec.decode("!!"), None);
        assert_eq!(codec.decode("../etc"), None);

        let pair = Sqids::default().encode(&[1, 2]).unwrap();
        assert_eq!(codec.decode(&pair), None);
    }
}
