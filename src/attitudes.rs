//! Meanings of attitude codes

/// A vote in favour of a domain
pub const UPVOTE: u8 = 0;

/// A vote against a domain
pub const DOWNVOTE: u8 = 1;

/// Rating weight of an attitude code. Unknown codes weigh nothing.
pub fn weight(attitude: u8) -> i64 {
    match attitude {
        UPVOTE => 1,
        DOWNVOTE => -1,
        _ => 0,
    }
}
