//! Deterministic cleanup of raw transaction descriptions.

/// Bank-statement boilerplate that carries no category signal.
const STOPWORDS: &[&str] = &[
    "pos",
    "visa",
    "debit",
    "credit",
    "purchase",
    "auth",
    "card",
    "transaction",
    "withdrawal",
    "deposit",
    "online",
    "transfer",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

fn is_digits_only(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
}

/// Normalise a raw description into its token basis.
///
/// Total and pure: any input produces a (possibly empty) token sequence,
/// and the same input always produces the same output. Lowercases, splits
/// on non-alphanumeric runs, then drops tokens shorter than two
/// characters, digit-only tokens (card numbers, dates, terminal ids), and
/// statement stopwords.
pub fn normalize(raw: &str) -> Vec<String> {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .filter(|t| !is_digits_only(t))
        .filter(|t| !is_stopword(t))
        .map(|t| t.to_string())
        .collect()
}

/// Canonical single-string form of a normalised description, used as the
/// key for exact-description override lookups.
pub fn normalized_key(raw: &str) -> String {
    normalize(raw).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits() {
        assert_eq!(normalize("WHOLE Foods-Market"), vec!["whole", "foods", "market"]);
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn deterministic() {
        let input = "POS PURCHASE #4417 Grocery Mart";
        assert_eq!(normalize(input), normalize(input));
    }

    #[test]
    fn drops_digit_runs_and_short_tokens() {
        assert_eq!(normalize("grocery mart #4417 a $12.99"), vec!["grocery", "mart"]);
    }

    #[test]
    fn drops_statement_stopwords() {
        assert_eq!(normalize("VISA DEBIT PURCHASE taxi ride"), vec!["taxi", "ride"]);
    }

    #[test]
    fn survives_punctuation_soup() {
        assert_eq!(normalize(";;;***///"), Vec::<String>::new());
        assert_eq!(normalize("uber;trip,2024"), vec!["uber", "trip"]);
    }

    #[test]
    fn normalized_key_joins_tokens() {
        assert_eq!(normalized_key("Grocery Mart #4"), "grocery mart");
        assert_eq!(normalized_key("Grocery Mart #12"), "grocery mart");
        assert_eq!(normalized_key("###"), "");
    }
}
