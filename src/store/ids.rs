use uuid::Uuid;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Characters drawn from one v4 UUID (62^21 < 2^128).
const CHARS_PER_UUID: usize = 21;

/// Random alphanumeric document id of the given length.
pub fn auto_id(length: usize) -> String {
    let mut id = String::with_capacity(length);
    while id.len() < length {
        let mut entropy = Uuid::new_v4().as_u128();
        for _ in 0..CHARS_PER_UUID.min(length - id.len()) {
            id.push(ALPHABET[(entropy % 62) as usize] as char);
            entropy /= 62;
        }
    }
    id
}
