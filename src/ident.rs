use once_cell::sync::Lazy;
use regex::Regex;

// Letter or underscore, then letters, decimal digits or underscores.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{Nd}_]*$").expect("identifier pattern is valid")
});

pub fn is_identifier(key: &str) -> bool {
    IDENTIFIER.is_match(key)
}
