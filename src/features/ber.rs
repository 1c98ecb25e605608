/// Building Energy Ratings from best to worst; the index is the ordinal code.
pub const BER_ORDER: [&str; 16] = [
    "A1", "A2", "A3", "B1", "B2", "B3", "C1", "C2", "C3", "D1", "D2", "E1", "E2", "F", "G",
    "Exempt",
];

/// Code for blank or unrecognised ratings. Rows carrying it are kept.
pub const BER_MISSING: i32 = -1;

pub fn encode_ber(rating: &str) -> i32 {
    BER_ORDER
        .iter()
        .position(|&known| known == rating)
        .map_or(BER_MISSING, |idx| idx as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_encode_in_order() {
        assert_eq!(encode_ber("A1"), 0);
        assert_eq!(encode_ber("C2"), 7);
        assert_eq!(encode_ber("Exempt"), 15);
    }

    #[test]
    fn unknown_ratings_use_sentinel() {
        assert_eq!(encode_ber(""), BER_MISSING);
        assert_eq!(encode_ber("c2"), BER_MISSING);
        assert_eq!(encode_ber("SI_666"), BER_MISSING);
        assert_ne!(BER_MISSING, encode_ber("A1"));
    }
}
