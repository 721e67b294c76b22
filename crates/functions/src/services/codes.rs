//! Customer-facing codes: readable order references and discount codes.

use rand::Rng;

const UPPER_ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_upper_alnum(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .filter_map(|_| {
            UPPER_ALNUM
                .get(rng.random_range(0..UPPER_ALNUM.len()))
                .map(|b| char::from(*b))
        })
        .collect()
}

/// Encode a number in upper-case base 36.
fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        let digit = usize::try_from(n % 36).unwrap_or(0);
        if let Some(b) = UPPER_ALNUM.get((digit + 26) % 36) {
            digits.push(char::from(*b));
        }
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// Order reference shown to customers: `RUK-` + last 6 digits of the
/// millisecond timestamp + 4 random upper-case alphanumerics.
#[must_use]
pub fn readable_order_id(now_millis: i64) -> String {
    let stamp = format!("{:06}", now_millis.rem_euclid(1_000_000));
    format!("RUK-{stamp}{}", random_upper_alnum(4))
}

/// Newsletter welcome code: `WELCOME10-XXXX-YYYYYY`, four random characters
/// then the last six base-36 digits of the millisecond timestamp.
#[must_use]
pub fn discount_code(now_millis: i64) -> String {
    let stamp = base36(u64::try_from(now_millis).unwrap_or(0));
    let tail = stamp
        .get(stamp.len().saturating_sub(6)..)
        .unwrap_or(&stamp);
    format!("WELCOME10-{}-{tail}", random_upper_alnum(4))
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn base36_uses_digits_then_letters() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "Z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(1_295), "ZZ");
    }

    #[test]
    fn readable_order_id_shape() {
        let id = readable_order_id(1_760_000_123_456);
        assert_eq!(id.len(), 14);
        assert!(id.starts_with("RUK-123456"));
        assert!(
            id[10..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn readable_order_id_pads_small_timestamps() {
        assert!(readable_order_id(42).starts_with("RUK-000042"));
    }

    #[test]
    fn discount_code_shape() {
        let code = discount_code(1_760_000_123_456);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "WELCOME10");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[2], &base36(1_760_000_123_456)[2..]);
    }
}
