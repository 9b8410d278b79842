//! # Inflection
//!
//! English noun inflection for table and foreign-key names.
//!
//! Only the last `_`-separated segment of a name is inflected, so
//! `register_sale` pluralises to `register_sales` and `order_lines`
//! singularises to `order_line`. The rule set follows the conventional
//! Rails inflector closely enough that table names line up with what
//! other tooling expects from the same upstream data.

/// Words with the same singular and plural form.
const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
];

/// (singular, plural) pairs that no suffix rule covers.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
];

/// `CamelCase` → `snake_case`.
///
/// ## Example
/// ```rust
/// use vend_core::inflect::underscore;
///
/// assert_eq!(underscore("RegisterSale"), "register_sale");
/// assert_eq!(underscore("HTTPClient"), "http_client");
/// ```
pub fn underscore(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(word.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '-' | ' ' | ':') {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Pluralises the last segment of a snake_case name.
///
/// Already-plural words are returned unchanged.
pub fn pluralize(word: &str) -> String {
    map_last_segment(word, pluralize_segment)
}

/// Singularises the last segment of a snake_case name.
pub fn singularize(word: &str) -> String {
    map_last_segment(word, singularize_segment)
}

fn map_last_segment(word: &str, inflect: fn(&str) -> String) -> String {
    match word.rfind('_') {
        Some(idx) => format!("{}{}", &word[..=idx], inflect(&word[idx + 1..])),
        None => inflect(word),
    }
}

fn strip(word: &str, suffix_len: usize) -> &str {
    &word[..word.len() - suffix_len]
}

fn ends_with_any(word: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| word.ends_with(s))
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// `y` preceded by a consonant or by `qu` inflects through `ies`.
fn consonant_before(word: &str, suffix_len: usize) -> bool {
    let stem = strip(word, suffix_len);
    stem.ends_with("qu") || stem.chars().last().is_some_and(|c| !is_vowel(c))
}

fn pluralize_segment(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if word == *singular || word == *plural {
            return plural.to_string();
        }
    }

    if word.ends_with("quiz") {
        return format!("{}zes", word);
    }
    if word == "ox" || word == "oxen" {
        return "oxen".to_string();
    }
    if word == "mice" || word == "lice" {
        return word.to_string();
    }
    if word == "mouse" || word == "louse" {
        return format!("{}ice", &word[..1]);
    }
    if ends_with_any(word, &["matrix", "vertex", "index"]) {
        return format!("{}ices", strip(word, 2));
    }
    if ends_with_any(word, &["alias", "status", "bus"]) {
        return format!("{}es", word);
    }
    if ends_with_any(word, &["x", "ch", "ss", "sh"]) {
        return format!("{}es", word);
    }
    if word.ends_with('y') && consonant_before(word, 1) {
        return format!("{}ies", strip(word, 1));
    }
    if word.ends_with("hive") {
        return format!("{}s", word);
    }
    if word.ends_with("fe") && !strip(word, 2).ends_with('f') {
        return format!("{}ves", strip(word, 2));
    }
    if ends_with_any(word, &["lf", "rf"]) {
        return format!("{}ves", strip(word, 1));
    }
    if word.ends_with("sis") {
        return format!("{}es", strip(word, 2));
    }
    if ends_with_any(word, &["ta", "ia"]) {
        return word.to_string();
    }
    if ends_with_any(word, &["tum", "ium"]) {
        return format!("{}a", strip(word, 2));
    }
    if ends_with_any(word, &["buffalo", "tomato"]) {
        return format!("{}es", word);
    }
    if ends_with_any(word, &["octopi", "viri"]) {
        return word.to_string();
    }
    if ends_with_any(word, &["octopus", "virus"]) {
        return format!("{}i", strip(word, 2));
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    format!("{}s", word)
}

fn singularize_segment(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if word == *plural || word == *singular {
            return singular.to_string();
        }
    }

    if word.ends_with("databases") {
        return strip(word, 1).to_string();
    }
    if word.ends_with("quizzes") {
        return strip(word, 3).to_string();
    }
    if word.ends_with("matrices") {
        return format!("{}ix", strip(word, 4));
    }
    if ends_with_any(word, &["vertices", "indices"]) {
        return format!("{}ex", strip(word, 4));
    }
    if word == "oxen" {
        return "ox".to_string();
    }
    if ends_with_any(word, &["aliases", "statuses", "buses"]) {
        return strip(word, 2).to_string();
    }
    if ends_with_any(word, &["alias", "status", "bus", "octopus", "virus"]) {
        return word.to_string();
    }
    if ends_with_any(word, &["octopi", "viri"]) {
        return format!("{}us", strip(word, 1));
    }
    if word == "axes" || ends_with_any(word, &["testes", "crises"]) {
        return format!("{}is", strip(word, 2));
    }
    if word.ends_with("shoes") {
        return strip(word, 1).to_string();
    }
    if word.ends_with("oes") {
        return strip(word, 2).to_string();
    }
    if word == "mice" || word == "lice" {
        return format!("{}ouse", &word[..1]);
    }
    if ends_with_any(word, &["xes", "ches", "sses", "shes"]) {
        return strip(word, 2).to_string();
    }
    if word.ends_with("movies") {
        return strip(word, 1).to_string();
    }
    if word.ends_with("ies") && consonant_before(word, 3) {
        return format!("{}y", strip(word, 3));
    }
    if ends_with_any(word, &["lves", "rves"]) {
        return format!("{}f", strip(word, 3));
    }
    if ends_with_any(word, &["tives", "hives"]) {
        return strip(word, 1).to_string();
    }
    if word.ends_with("ves") && !strip(word, 3).ends_with('f') {
        return format!("{}fe", strip(word, 3));
    }
    if ends_with_any(
        word,
        &[
            "analyses",
            "bases",
            "diagnoses",
            "parentheses",
            "prognoses",
            "synopses",
            "theses",
        ],
    ) {
        return format!("{}is", strip(word, 2));
    }
    if ends_with_any(word, &["ta", "ia"]) {
        return format!("{}um", strip(word, 1));
    }
    if word.ends_with("news") || word.ends_with("ss") {
        return word.to_string();
    }
    if word.ends_with('s') {
        return strip(word, 1).to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("Outlet"), "outlet");
        assert_eq!(underscore("PaymentType"), "payment_type");
        assert_eq!(underscore("RegisterSale"), "register_sale");
        assert_eq!(underscore("register_sale"), "register_sale");
        assert_eq!(underscore("HTTPClient"), "http_client");
        assert_eq!(underscore("Vend::Product"), "vend_product");
    }

    #[test]
    fn test_pluralize_vend_names() {
        assert_eq!(pluralize("outlet"), "outlets");
        assert_eq!(pluralize("product"), "products");
        assert_eq!(pluralize("customer"), "customers");
        assert_eq!(pluralize("payment_type"), "payment_types");
        assert_eq!(pluralize("register"), "registers");
        assert_eq!(pluralize("register_sale"), "register_sales");
        assert_eq!(pluralize("tax"), "taxes");
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("inventory"), "inventories");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("status"), "statuses");
    }

    #[test]
    fn test_pluralize_is_idempotent_on_plurals() {
        assert_eq!(pluralize("register_sale_products"), "register_sale_products");
        assert_eq!(pluralize("taxes"), "taxes");
        assert_eq!(pluralize("people"), "people");
        assert_eq!(pluralize("series"), "series");
    }

    #[test]
    fn test_pluralize_irregular_forms() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("child"), "children");
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("shelf"), "shelves");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("analysis"), "analyses");
        assert_eq!(pluralize("index"), "indices");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("orders"), "order");
        assert_eq!(singularize("register_sales"), "register_sale");
        assert_eq!(singularize("taxes"), "tax");
        assert_eq!(singularize("inventories"), "inventory");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("statuses"), "status");
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("shelves"), "shelf");
        assert_eq!(singularize("wives"), "wife");
        assert_eq!(singularize("order"), "order");
        assert_eq!(singularize("class"), "class");
    }
}
