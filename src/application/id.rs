use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 8;

/// Short opaque id: the creation timestamp in base36 followed by eight
/// random base36 characters.
pub fn generate_paste_id(now_ms: i64) -> String {
    let mut id = to_base36(now_ms.max(0) as u64);
    let random = Uuid::new_v4();
    id.extend(
        random
            .as_bytes()
            .iter()
            .take(RANDOM_SUFFIX_LEN)
            .map(|byte| ALPHABET[usize::from(*byte) % ALPHABET.len()] as char),
    );
    id
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
