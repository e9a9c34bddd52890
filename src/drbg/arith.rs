//! Big-endian modular arithmetic on DRBG state buffers.

/// `acc = (acc + addend) mod 2^(8 * acc.len())`, both big-endian.
///
/// A shorter `addend` is aligned to the least significant end of `acc`.
pub(crate) fn add_be(acc: &mut [u8], addend: &[u8]) {
    let mut carry = 0u16;
    let mut rhs = addend.iter().rev();
    for byte in acc.iter_mut().rev() {
        let sum = u16::from(*byte) + u16::from(rhs.next().copied().unwrap_or(0)) + carry;
        *byte = sum as u8;
        carry = sum >> 8;
    }
}

/// `acc = (acc + val) mod 2^(8 * acc.len())`.
pub(crate) fn add_be_u64(acc: &mut [u8], val: u64) {
    add_be(acc, &val.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_be() {
        let mut v = vec![0x00, 0x00, 0x00, 0x01];
        add_be(&mut v, &[0x00, 0x00, 0x00, 0x02]);
        assert_eq!(v, vec![0x00, 0x00, 0x00, 0x03]);

        // Addition with carry
        let mut v = vec![0x00, 0x00, 0x00, 0xFF];
        add_be(&mut v, &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(v, vec![0x00, 0x00, 0x01, 0x00]);

        // Carry ripples through the whole buffer and wraps
        let mut v = vec![0xFF, 0xFF, 0xFF, 0xFF];
        add_be(&mut v, &[0x01]);
        assert_eq!(v, vec![0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_add_be_is_not_xor() {
        let mut v = vec![0x00, 0x81];
        add_be(&mut v, &[0x00, 0x81]);
        assert_eq!(v, vec![0x01, 0x02]);
    }

    #[test]
    fn test_add_be_short_addend_aligns_low() {
        let mut v = vec![0x10, 0x00, 0xF0];
        add_be(&mut v, &[0x01, 0x20]);
        assert_eq!(v, vec![0x10, 0x02, 0x10]);
    }

    #[test]
    fn test_add_be_u64() {
        let mut v = vec![0x00; 16];
        add_be_u64(&mut v, 256);
        assert_eq!(v[14], 0x01);
        assert_eq!(v[15], 0x00);

        let mut v = vec![0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        add_be_u64(&mut v, 1);
        assert_eq!(v, vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
