//! Community title and description text.

use std::fmt::Write;

use crate::profile::Profile;

use super::{
    format_phone, format_price, join_techniques, PUBLIC_CATEGORY_BUSINESS,
    PUBLIC_SUBCATEGORY_BEAUTY_HEALTH,
};

/// Generated community identity: title, long description and the VK public
/// page category pair.
#[derive(Debug, Clone)]
pub struct GroupDescription {
    pub title: String,
    pub description: String,
    pub public_category: u32,
    pub public_subcategory: u32,
}

/// Builds the community title and description from a profile. Home-visit
/// practitioners get the "на дому" variant; office-based ones get the
/// cabinet variant with the address line.
pub fn generate_description(profile: &Profile) -> GroupDescription {
    let description = if profile.is_home_visit {
        home_visit_description(profile)
    } else {
        office_description(profile)
    };

    GroupDescription {
        title: format!("Массаж • {} • {}", profile.city, profile.name),
        description,
        public_category: PUBLIC_CATEGORY_BUSINESS,
        public_subcategory: PUBLIC_SUBCATEGORY_BEAUTY_HEALTH,
    }
}

fn home_visit_description(profile: &Profile) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "🏠 {} - Массаж на дому в {}\n",
        profile.name, profile.city
    );
    let _ = writeln!(text, "📍 Район: {}", profile.area);
    contact_lines(&mut text, profile);
    services_block(&mut text, profile);
    let _ = writeln!(text, "Техники: {}\n", join_techniques(&profile.techniques));
    text.push_str(
        "Преимущества:\n\
         ✅ Выезд на дом в удобное время\n\
         ✅ Профессиональное оборудование\n\
         ✅ Индивидуальный подход\n\
         ✅ Конфиденциальность\n\n",
    );
    session_block(&mut text);
    booking_line(&mut text, profile);
    let _ = write!(
        text,
        "#массаж #{} #{} #массажнадом #здоровье #релакс",
        profile.city, profile.area
    );
    text
}

fn office_description(profile: &Profile) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "🏢 {} - Массажный кабинет в {}\n",
        profile.name, profile.city
    );
    if let Some(ref address) = profile.address {
        let _ = writeln!(text, "📍 Адрес: {}", address);
    }
    contact_lines(&mut text, profile);
    services_block(&mut text, profile);
    let _ = writeln!(text, "Техники: {}\n", join_techniques(&profile.techniques));
    text.push_str(
        "Преимущества:\n\
         ✅ Уютный кабинет\n\
         ✅ Профессиональное оборудование\n\
         ✅ Индивидуальный подход\n\
         ✅ Комфортная атмосфера\n\n",
    );
    session_block(&mut text);
    booking_line(&mut text, profile);
    let _ = write!(
        text,
        "#массаж #{} #{} #массажныйкабинет #здоровье #релакс",
        profile.city, profile.area
    );
    text
}

fn contact_lines(text: &mut String, profile: &Profile) {
    let _ = writeln!(text, "📞 Телефон: {}", format_phone(&profile.phone));
    if let Some(ref telegram) = profile.telegram {
        let _ = writeln!(text, "💬 Telegram: {}", telegram);
    }
    text.push('\n');
}

fn services_block(text: &mut String, profile: &Profile) {
    text.push_str("Услуги:\n");
    for item in &profile.pricing {
        let _ = writeln!(text, "• {} - {}", item.title, format_price(item.price));
    }
    text.push('\n');
}

fn session_block(text: &mut String) {
    text.push_str(
        "Как проходит сеанс:\n\
         1. Консультация и определение проблемных зон\n\
         2. Выбор техники массажа\n\
         3. Процедура с использованием качественных масел\n\
         4. Рекомендации по уходу\n\n\
         Показания:\n\
         • Стресс и усталость\n\
         • Боли в спине и шее\n\
         • Напряжение в мышцах\n\
         • Нарушение сна\n\n\
         Противопоказания:\n\
         • Острые воспалительные процессы\n\
         • Высокая температура\n\
         • Кожные заболевания\n\
         • Беременность (требуется консультация)\n\n",
    );
}

fn booking_line(text: &mut String, profile: &Profile) {
    let _ = write!(text, "Запись: {}", format_phone(&profile.phone));
    if let Some(ref telegram) = profile.telegram {
        let _ = write!(text, " или {}", telegram);
    }
    text.push_str("\n\n");
}
