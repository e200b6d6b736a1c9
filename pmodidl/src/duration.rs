//! Durées au format UPnP (`H+:MM:SS[.F+]` ou `H+:MM:SS[.F0/F1]`)

/// Convertit une durée UPnP en millisecondes
///
/// Les formes acceptées sont `H:MM:SS`, `MM:SS` et `SS`, suivies d'une
/// fraction décimale (`.250`) ou rationnelle (`.1/4`). Retourne `None` si la
/// chaîne n'est pas une durée.
///
/// # Exemple
///
/// ```
/// use pmodidl::parse_duration;
///
/// assert_eq!(parse_duration("0:03:25.500"), Some(205_500));
/// assert_eq!(parse_duration("NOT_IMPLEMENTED"), None);
/// ```
pub fn parse_duration(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (clock, fraction) = match value.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (value, None),
    };

    let mut seconds: u64 = 0;
    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    for part in parts {
        let n: u64 = part.trim_start_matches('+').parse().ok()?;
        seconds = seconds * 60 + n;
    }

    let millis = match fraction {
        None => 0,
        Some(f) => match f.split_once('/') {
            Some((num, den)) => {
                let num: u64 = num.parse().ok()?;
                let den: u64 = den.parse().ok()?;
                if den == 0 || num >= den {
                    return None;
                }
                num * 1000 / den
            }
            None => {
                if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                let digits: String = f.chars().chain("000".chars()).take(3).collect();
                digits.parse().ok()?
            }
        },
    };

    Some(seconds * 1000 + millis)
}

/// Formate une durée en millisecondes au format `H:MM:SS`
pub fn format_duration(millis: u64) -> String {
    let total = millis / 1000;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("1:02:03"), Some(3_723_000));
        assert_eq!(parse_duration("02:03"), Some(123_000));
        assert_eq!(parse_duration("42"), Some(42_000));
        assert_eq!(parse_duration("0:00:01.5"), Some(1_500));
        assert_eq!(parse_duration("0:00:01.1/4"), Some(1_250));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration("0:00:01.3/0"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(205_999), "0:03:25");
        assert_eq!(format_duration(3_723_000), "1:02:03");
    }
}
