//! Safe-click policy (§4.E): destructive actions are never clicked; beats
//! default to hover and only the CTA beat considers clicking at all.

const DENY_PATTERNS: &[&str] = &[
    "buy",
    "checkout",
    "pay",
    "subscribe",
    "cart",
    "sign in",
    "signin",
    "log in",
    "login",
    "password",
    "add to cart",
    "register",
    "create account",
];

const ALLOW_PATTERNS: &[&str] = &["learn more", "pricing", "features", "contact", "book demo"];

/// Candidate clickable element, as scraped from the DOM.
#[derive(Debug, Clone, Default)]
pub struct ClickCandidate {
    pub text: String,
    pub aria_label: String,
    pub title: String,
    pub href: Option<String>,
    pub same_origin: bool,
}

/// Whether `candidate` passes the safe-click classifier (§4.E "Safe-click policy").
pub fn is_safe_click(candidate: &ClickCandidate) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        candidate.text,
        candidate.aria_label,
        candidate.title,
        candidate.href.as_deref().unwrap_or("")
    )
    .to_lowercase();

    if DENY_PATTERNS.iter().any(|pat| haystack.contains(pat)) {
        return false;
    }
    if !candidate.same_origin {
        return false;
    }
    ALLOW_PATTERNS.iter().any(|pat| haystack.contains(pat))
}

/// Score a candidate for CTA-worthiness: higher is better, 0 means ineligible.
/// Used by `moveToCTAandHover` to pick among several allowed candidates.
pub fn score_cta(candidate: &ClickCandidate) -> u32 {
    if !is_safe_click(candidate) {
        return 0;
    }
    let text = candidate.text.to_lowercase();
    ALLOW_PATTERNS
        .iter()
        .enumerate()
        .find(|(_, pat)| text.contains(**pat))
        .map(|(i, _)| (ALLOW_PATTERNS.len() - i) as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, same_origin: bool) -> ClickCandidate {
        ClickCandidate {
            text: text.to_string(),
            same_origin,
            ..Default::default()
        }
    }

    #[test]
    fn denies_checkout_even_if_text_also_matches_allow_list() {
        let c = candidate("Pricing - Buy Now", true);
        assert!(!is_safe_click(&c));
    }

    #[test]
    fn denies_cross_origin_even_if_text_is_allowed() {
        let c = candidate("Learn more", false);
        assert!(!is_safe_click(&c));
    }

    #[test]
    fn allows_pricing_same_origin() {
        let c = candidate("See Pricing", true);
        assert!(is_safe_click(&c));
    }

    #[test]
    fn denies_unlisted_text() {
        let c = candidate("Newsletter Signup", true);
        assert!(!is_safe_click(&c));
    }

    #[test]
    fn denies_sign_in_with_space_variant() {
        let c = candidate("Sign In to your account", true);
        assert!(!is_safe_click(&c));
    }
}
