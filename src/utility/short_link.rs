/*
Short links

Recipe ids are written in base 36 with the alphabet below, no sign and no
padding. The codec only accepts lowercase input.

    0      -> "0"
    35     -> "z"
    36     -> "10"
    999999 -> "lflr"
*/

use crate::{
    constants::{RECIPE_PATH_PREFIX, SHORT_LINK_PREFIX},
    error::InvalidArgument,
    schema::Uuid,
};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE: i64 = 36;

pub fn encode(number: i64) -> Result<String, InvalidArgument> {
    if number < 0 {
        return Err(InvalidArgument::new("Number can't be negative"));
    }
    if number == 0 {
        return Ok(String::from("0"));
    }

    let mut digits: Vec<u8> = vec![];
    let mut n = number;
    while n > 0 {
        digits.push(ALPHABET[(n % BASE) as usize]);
        n /= BASE;
    }
    digits.reverse();

    String::from_utf8(digits).map_err(|_| InvalidArgument::new("Invalid digit"))
}

pub fn decode(value: &str) -> Result<i64, InvalidArgument> {
    if value.is_empty() {
        return Err(InvalidArgument::new("Empty short link"));
    }

    value.bytes().try_fold(0i64, |acc, byte| {
        let digit = digit_value(byte)
            .ok_or_else(|| InvalidArgument::new(format!("Invalid character '{}'", byte as char)))?;

        acc.checked_mul(BASE)
            .and_then(|acc| acc.checked_add(digit))
            .ok_or_else(|| InvalidArgument::new("Short link out of range"))
    })
}

fn digit_value(byte: u8) -> Option<i64> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as i64),
        b'a'..=b'z' => Some((byte - b'a') as i64 + 10),
        _ => None,
    }
}

/// Path a recipe is shared under, `/s/rs` for recipe 1000.
pub fn short_link_path(recipe_id: Uuid) -> Result<String, InvalidArgument> {
    Ok(format!("{SHORT_LINK_PREFIX}{}", encode(recipe_id.into())?))
}

/// Canonical path of the recipe a short code points to.
pub fn resolve_short_link(code: &str) -> Result<(Uuid, String), InvalidArgument> {
    let id = decode(code)?;
    let id = Uuid::try_from(id).map_err(|_| InvalidArgument::new("Recipe id out of range"))?;

    Ok((id, format!("{RECIPE_PATH_PREFIX}{id}/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode(0).unwrap(), "0");
        assert_eq!(encode(35).unwrap(), "z");
        assert_eq!(encode(36).unwrap(), "10");
        assert_eq!(encode(1295).unwrap(), "zz");
        assert_eq!(encode(999999).unwrap(), "lflr");
    }

    #[test]
    fn decode_inverts_encode() {
        for n in [0, 1, 35, 36, 1295, 999999, i64::MAX] {
            assert_eq!(decode(&encode(n).unwrap()).unwrap(), n);
        }
    }

    #[test]
    fn encode_inverts_decode_for_canonical_strings() {
        for s in ["0", "1", "z", "10", "zz", "lflr", "recipe"] {
            assert_eq!(encode(decode(s).unwrap()).unwrap(), s);
        }
    }

    #[test]
    fn negative_numbers_are_rejected() {
        assert!(encode(-1).is_err());
        assert!(encode(i64::MIN).is_err());
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert!(decode("").is_err());
        assert!(decode("#").is_err());
        assert!(decode("-1").is_err());
        assert!(decode("ab c").is_err());
    }

    #[test]
    fn uppercase_is_rejected() {
        assert!(decode("Z").is_err());
        assert!(decode("lfLr").is_err());
    }

    #[test]
    fn overflow_is_rejected() {
        // i64::MAX is "1y2p0ij32e8e7"
        assert_eq!(decode("1y2p0ij32e8e7").unwrap(), i64::MAX);
        assert!(decode("1y2p0ij32e8e8").is_err());
        assert!(decode("zzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn short_link_round_trip() {
        let path = short_link_path(1296).unwrap();
        assert_eq!(path, "/s/100");

        let code = path.trim_start_matches(SHORT_LINK_PREFIX);
        assert_eq!(resolve_short_link(code).unwrap(), (1296, "/recipes/1296/".to_string()));
    }

    #[test]
    fn short_link_beyond_id_range_is_rejected() {
        let code = encode(i64::from(i32::MAX) + 1).unwrap();
        assert!(resolve_short_link(&code).is_err());
    }

    #[test]
    fn negative_recipe_id_has_no_short_link() {
        assert!(short_link_path(-5).is_err());
    }
}
