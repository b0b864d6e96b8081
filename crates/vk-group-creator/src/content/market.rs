//! Market item text, one item per priced service.

use crate::profile::Profile;

use super::{format_phone, format_price, join_techniques, MARKET_CATEGORY_BEAUTY_HEALTH};

/// One generated marketplace item.
#[derive(Debug, Clone)]
pub struct MarketItemTemplate {
    pub title: String,
    pub description: String,
    /// Price in whole rubles.
    pub price: u32,
    pub category_id: u32,
}

/// Generates one market item per pricing entry.
pub fn generate_market_items(profile: &Profile) -> Vec<MarketItemTemplate> {
    profile
        .pricing
        .iter()
        .map(|item| MarketItemTemplate {
            title: item.title.clone(),
            description: item_description(profile, &item.title, item.price),
            price: item.price,
            category_id: MARKET_CATEGORY_BEAUTY_HEALTH,
        })
        .collect()
}

fn item_description(profile: &Profile, title: &str, price: u32) -> String {
    let setting = if profile.is_home_visit {
        "Выезд на дом"
    } else {
        "Уютный кабинет"
    };

    let mut text = format!(
        "{}\n\n\
         Профессиональный массаж от опытного специалиста {}.\n\n\
         Что входит:\n\
         ✅ Консультация и диагностика\n\
         ✅ Профессиональный массаж\n\
         ✅ Качественные масла\n\
         ✅ Рекомендации по уходу\n\n\
         Техники: {}\n\
         Продолжительность: {}\n\
         Стоимость: {}\n\n\
         Запись: {}",
        title,
        profile.name,
        join_techniques(&profile.techniques),
        duration_for(title),
        format_price(price),
        format_phone(&profile.phone),
    );
    if let Some(ref telegram) = profile.telegram {
        text.push_str(" или ");
        text.push_str(telegram);
    }
    text.push_str(&format!(
        "\n\nПреимущества:\n\
         • Индивидуальный подход\n\
         • Профессиональное оборудование\n\
         • {}\n\
         • Конфиденциальность\n\n\
         #массаж #{} #{} #здоровье #релакс",
        setting, profile.city, profile.area
    ));
    text
}

/// Infers the session length from the service title; 60 minutes when the
/// title carries no hint.
fn duration_for(title: &str) -> &'static str {
    if title.contains("30") {
        "30 минут"
    } else if title.contains("45") {
        "45 минут"
    } else if title.contains("90") {
        "90 минут"
    } else {
        "60 минут"
    }
}
