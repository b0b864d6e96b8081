//! Content generation for a new community: description, posts, market
//! items, avatar and cover. Pure functions from a [`Profile`](crate::profile::Profile)
//! to strings/bytes; no network access.

pub mod assets;
pub mod descriptions;
pub mod market;
pub mod posts;

use std::sync::OnceLock;

use regex::Regex;

pub use assets::{generate_avatar, generate_cover};
pub use descriptions::{generate_description, GroupDescription};
pub use market::{generate_market_items, MarketItemTemplate};
pub use posts::{generate_posts, PostTemplate};

/// VK currency id for RUB.
pub const CURRENCY_RUB: u32 = 1;

/// VK public page category "Бизнес и услуги".
pub const PUBLIC_CATEGORY_BUSINESS: u32 = 1;

/// VK public page subcategory "Красота и здоровье".
pub const PUBLIC_SUBCATEGORY_BEAUTY_HEALTH: u32 = 1;

/// VK market category "Красота и здоровье".
pub const MARKET_CATEGORY_BEAUTY_HEALTH: u32 = 1;

/// Formats whole rubles the ru-RU way: non-breaking-space thousands
/// separator plus the ruble sign, e.g. `2 500 ₽`.
pub fn format_price(price: u32) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push('\u{a0}');
        }
        grouped.push(ch);
    }
    grouped.push('\u{a0}');
    grouped.push('₽');
    grouped
}

/// Formats an 11-digit phone number as `X (XXX) XXX-XX-XX`. Anything that
/// does not match is returned as-is.
pub fn format_phone(phone: &str) -> String {
    static PHONE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PHONE_RE
        .get_or_init(|| Regex::new(r"(\d)(\d{3})(\d{3})(\d{2})(\d{2})").expect("valid pattern"));
    re.replace(phone, "$1 ($2) $3-$4-$5").into_owned()
}

/// Joins technique tags with commas for display.
pub fn join_techniques(techniques: &[String]) -> String {
    techniques.join(", ")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(500), "500\u{a0}₽");
        assert_eq!(format_price(2500), "2\u{a0}500\u{a0}₽");
        assert_eq!(format_price(125000), "125\u{a0}000\u{a0}₽");
        assert_eq!(format_price(1250000), "1\u{a0}250\u{a0}000\u{a0}₽");
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("79161234567"), "7 (916) 123-45-67");
        // Unparseable numbers pass through unchanged.
        assert_eq!(format_phone("112"), "112");
    }

    #[test]
    fn test_join_techniques() {
        let techniques = vec!["классический".to_string(), "лимфодренажный".to_string()];
        assert_eq!(
            join_techniques(&techniques),
            "классический, лимфодренажный"
        );
    }
}
