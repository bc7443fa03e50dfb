//! District name normalization.

/// Title-cases a district name: the first letter of every run of letters
/// is upper-cased and the rest of the run lower-cased. Any non-letter
/// (space, hyphen, apostrophe, digit) starts a new run.
#[must_use]
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;

    for ch in name.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_case_input() {
        assert_eq!(title_case("LUCKNOW"), "Lucknow");
    }

    #[test]
    fn multi_word_input() {
        assert_eq!(title_case("sant kabir NAGAR"), "Sant Kabir Nagar");
    }

    #[test]
    fn punctuation_starts_new_word() {
        assert_eq!(title_case("lakhimpur-kheri"), "Lakhimpur-Kheri");
        assert_eq!(title_case("o'brien"), "O'Brien");
    }

    #[test]
    fn digits_start_new_word() {
        assert_eq!(title_case("ward 3rd"), "Ward 3Rd");
    }

    #[test]
    fn is_idempotent() {
        let once = title_case("GAUTAM BUDDHA NAGAR");
        assert_eq!(title_case(&once), once);
    }
}
