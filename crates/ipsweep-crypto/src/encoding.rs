//! Candidate encoding: IPv4 keys to dotted-decimal ASCII

/// Longest possible candidate, `"255.255.255.255"`
pub const MAX_CANDIDATE_LEN: usize = 15;

/// Decimal digits of one octet, left-aligned in a 3-byte slot
#[derive(Debug, Clone, Copy)]
struct Octet {
    digits: [u8; 3],
    len: u8,
}

/// Lookup table from byte value to its decimal text
struct OctetTable([Octet; 256]);

impl OctetTable {
    const fn new() -> Self {
        let mut table = [Octet { digits: [0; 3], len: 0 }; 256];
        let mut value = 0;
        while value < 256 {
            let v = value as u8;
            table[value] = if v >= 100 {
                Octet {
                    digits: [b'0' + v / 100, b'0' + v / 10 % 10, b'0' + v % 10],
                    len: 3,
                }
            } else if v >= 10 {
                Octet {
                    digits: [b'0' + v / 10, b'0' + v % 10, 0],
                    len: 2,
                }
            } else {
                Octet {
                    digits: [b'0' + v, 0, 0],
                    len: 1,
                }
            };
            value += 1;
        }
        Self(table)
    }

    #[inline(always)]
    fn get(&self, value: u8) -> &[u8] {
        let octet = &self.0[value as usize];
        &octet.digits[..octet.len as usize]
    }
}

static OCTETS: OctetTable = OctetTable::new();

/// Reusable encoder that writes candidates into a fixed scratch buffer.
///
/// Encoding never allocates; the returned slice borrows the internal buffer
/// and is valid until the next call to [`CandidateEncoder::encode`].
#[derive(Debug, Clone)]
pub struct CandidateEncoder {
    buf: [u8; MAX_CANDIDATE_LEN],
    len: usize,
}

impl CandidateEncoder {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self {
            buf: [0; MAX_CANDIDATE_LEN],
            len: 0,
        }
    }

    /// Encode `key` as `a.b.c.d`, most significant octet first
    #[inline]
    pub fn encode(&mut self, key: u32) -> &[u8] {
        let [a, b, c, d] = key.to_be_bytes();
        let mut pos = 0;

        pos = self.push_octet(pos, a);
        self.buf[pos] = b'.';
        pos = self.push_octet(pos + 1, b);
        self.buf[pos] = b'.';
        pos = self.push_octet(pos + 1, c);
        self.buf[pos] = b'.';
        pos = self.push_octet(pos + 1, d);

        self.len = pos;
        &self.buf[..pos]
    }

    #[inline(always)]
    fn push_octet(&mut self, pos: usize, value: u8) -> usize {
        let digits = OCTETS.get(value);
        let end = pos + digits.len();
        self.buf[pos..end].copy_from_slice(digits);
        end
    }

    /// Bytes of the most recent candidate
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Most recent candidate as an owned string
    pub fn to_candidate_string(&self) -> String {
        // Encoded bytes are always ASCII digits and dots
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl Default for CandidateEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a single key into a fresh string
pub fn encode_ipv4(key: u32) -> String {
    let mut encoder = CandidateEncoder::new();
    encoder.encode(key);
    encoder.to_candidate_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::net::Ipv4Addr;

    #[test]
    fn test_encode_known_keys() {
        let mut encoder = CandidateEncoder::new();
        assert_eq!(encoder.encode(0x01020304), b"1.2.3.4");
        assert_eq!(encoder.encode(0), b"0.0.0.0");
        assert_eq!(encoder.encode(u32::MAX), b"255.255.255.255");
        assert_eq!(encoder.encode(0x0a00ff64), b"10.0.255.100");
    }

    #[test]
    fn test_max_length_fits_buffer() {
        let mut encoder = CandidateEncoder::new();
        assert_eq!(encoder.encode(u32::MAX).len(), MAX_CANDIDATE_LEN);
    }

    #[test]
    fn test_reuse_does_not_leak_previous_bytes() {
        let mut encoder = CandidateEncoder::new();
        encoder.encode(u32::MAX);
        assert_eq!(encoder.encode(0x01000009), b"1.0.0.9");
        assert_eq!(encoder.as_bytes(), b"1.0.0.9");
        assert_eq!(encoder.to_candidate_string(), "1.0.0.9");
    }

    #[test]
    fn test_octet_boundaries_match_std() {
        let mut encoder = CandidateEncoder::new();
        for octet in [0u32, 1, 9, 10, 11, 99, 100, 101, 199, 200, 249, 250, 255] {
            for shift in [0, 8, 16, 24] {
                let key = octet << shift;
                let expected = Ipv4Addr::from(key).to_string();
                assert_eq!(encoder.encode(key), expected.as_bytes());
            }
        }
    }

    #[test]
    fn test_random_keys_match_std() {
        let mut rng = rand::thread_rng();
        let mut encoder = CandidateEncoder::new();
        for _ in 0..10_000 {
            let key: u32 = rng.gen();
            let expected = Ipv4Addr::from(key).to_string();
            assert_eq!(encoder.encode(key), expected.as_bytes(), "key {key:#010x}");
        }
    }

    #[test]
    fn test_no_leading_zeros() {
        let mut encoder = CandidateEncoder::new();
        for key in (0..=u32::MAX).step_by(65_521) {
            let parts: Vec<&[u8]> = encoder.encode(key).split(|b| *b == b'.').collect();
            assert_eq!(parts.len(), 4);
            for part in parts {
                assert!(!part.is_empty() && part.len() <= 3);
                assert!(part.len() == 1 || part[0] != b'0');
                let value: u32 = std::str::from_utf8(part).unwrap().parse().unwrap();
                assert!(value <= 255);
            }
        }
    }

    #[test]
    fn test_encode_ipv4_helper() {
        assert_eq!(encode_ipv4(0xc0a80001), "192.168.0.1");
    }
}
