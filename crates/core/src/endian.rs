//! Single source of truth for swapping `f64` buffers to/from big-endian.
//!
//! The file codec, the wire handshake, and every chunk that crosses a network
//! boundary all go through these two functions so the byte-swap logic never
//! drifts out of sync between call sites.

/// Byte-swaps every `f64` in `doubles` to big-endian, in place, on
/// little-endian hosts. A no-op on big-endian hosts. Applying this twice is
/// the identity.
pub fn doubles_to_be(doubles: &mut [f64]) {
    if cfg!(target_endian = "big") {
        return;
    }
    for d in doubles.iter_mut() {
        *d = f64::from_bits(d.to_bits().swap_bytes());
    }
}

/// Byte-swaps every `f64` in `doubles` from big-endian back to native order,
/// in place. A no-op on big-endian hosts.
pub fn doubles_from_be(doubles: &mut [f64]) {
    // The swap is its own inverse.
    doubles_to_be(doubles);
}

/// Byte-swaps the first `len / 8` doubles stored in `bytes` to big-endian,
/// in place, treating `bytes` as a raw `f64` array. `len` is rounded down to
/// the nearest multiple of 8.
pub fn bytes_to_be_f64(bytes: &mut [u8]) {
    if cfg!(target_endian = "big") {
        return;
    }
    for chunk in bytes.chunks_exact_mut(8) {
        let word = u64::from_ne_bytes(chunk.try_into().expect("chunk of 8"));
        chunk.copy_from_slice(&word.swap_bytes().to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_identity() {
        let mut values = [0.0_f64, 1.5, -3.25, std::f64::consts::PI];
        let original = values;
        doubles_to_be(&mut values);
        doubles_from_be(&mut values);
        assert_eq!(values, original);
    }

    #[test]
    fn bytes_to_be_f64_matches_f64_swap() {
        let mut doubles = [1.0_f64, -2.0, 3.5];
        let mut bytes = Vec::new();
        for d in doubles {
            bytes.extend_from_slice(&d.to_ne_bytes());
        }
        bytes_to_be_f64(&mut bytes);
        doubles_to_be(&mut doubles);
        let mut expected = Vec::new();
        for d in doubles {
            expected.extend_from_slice(&d.to_ne_bytes());
        }
        assert_eq!(bytes, expected);
    }
}
