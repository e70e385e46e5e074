/// djb2 string hash (`h * 33 + c`, seeded with 5381).
///
/// `const` so instrumented code can bake function identifiers into the binary.
#[must_use]
pub const fn djb2(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        hash = hash.wrapping_mul(33).wrapping_add(bytes[i] as u32);
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 5381 * 33 + 97);
        assert_eq!(djb2(b"main"), 2_090_499_946);
    }

    #[test]
    fn test_djb2_in_const_context() {
        const MAIN: u32 = djb2(b"main");
        assert_eq!(MAIN, djb2("main".as_bytes()));
    }
}
