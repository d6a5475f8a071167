/// Reduces raw OCR text to the digits of a `YYYYMMDD` candidate.
///
/// Order matters: hyphens (the watermark's date separators) go first, then
/// the lowercase `z` that one engine reads in place of `2` is mapped back,
/// and finally everything that is not an ASCII digit is dropped. The result
/// may be empty and is not guaranteed to be 8 digits long.
pub fn canonicalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|&c| c != '-')
        .map(|c| if c == 'z' { '2' } else { c })
        .filter(|c| c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_separators() {
        assert_eq!(canonicalize("2024-09-01"), "20240901");
    }

    #[test]
    fn test_fixes_z_misread() {
        assert_eq!(canonicalize("z024-09-01 "), "20240901");
        // Only lowercase z is a known confusion
        assert_eq!(canonicalize("Z024-09-01"), "0240901");
    }

    #[test]
    fn test_drops_noise() {
        assert_eq!(canonicalize("20240901garbage"), "20240901");
        assert_eq!(canonicalize("  2024.09.01\n"), "20240901");
        assert_eq!(canonicalize("abc"), "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   \n"), "");
    }

    #[test]
    fn test_idempotent_on_digits() {
        for s in ["20240901", "0", "123", ""] {
            let once = canonicalize(s);
            assert_eq!(once, s);
            assert_eq!(canonicalize(&once), once);
        }
    }

    #[test]
    fn test_never_emits_non_digits() {
        let inputs = [
            "--",
            "2024-09-01",
            "z-z-z",
            "é2024—09—01",
            "\t12:34:56 PM",
            "ｚ２０２４",
            "zzzz-zz-zz",
        ];
        for input in inputs {
            let out = canonicalize(input);
            assert!(out.chars().all(|c| c.is_ascii_digit()), "{:?} -> {:?}", input, out);
        }
    }
}
