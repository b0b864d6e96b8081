//! Editorial plan for a freshly created community: two posts published
//! right away, the rest time-shifted over the first week.

use std::fmt::Write;

use crate::profile::Profile;

use super::{format_phone, format_price, join_techniques};

/// One planned wall post.
#[derive(Debug, Clone)]
pub struct PostTemplate {
    pub content: String,
    pub publish_immediately: bool,
    /// Days to wait before publication. Only set for deferred posts.
    pub delay_days: Option<u32>,
}

/// Generates the full post plan: 2 immediate posts and 3 deferred ones
/// (2, 5 and 7 days out).
pub fn generate_posts(profile: &Profile) -> Vec<PostTemplate> {
    vec![
        PostTemplate {
            content: welcome_post(profile),
            publish_immediately: true,
            delay_days: None,
        },
        PostTemplate {
            content: services_post(profile),
            publish_immediately: true,
            delay_days: None,
        },
        PostTemplate {
            content: techniques_post(profile),
            publish_immediately: false,
            delay_days: Some(2),
        },
        PostTemplate {
            content: health_post(profile),
            publish_immediately: false,
            delay_days: Some(5),
        },
        PostTemplate {
            content: booking_post(profile),
            publish_immediately: false,
            delay_days: Some(7),
        },
    ]
}

fn welcome_post(profile: &Profile) -> String {
    let location = if profile.is_home_visit {
        format!("Выезжаю на дом в районе {}", profile.area)
    } else {
        format!("Принимаю в кабинете, район {}", profile.area)
    };

    format!(
        "👋 Добро пожаловать!\n\n\
         Меня зовут {}, я профессиональный массажист в городе {}.\n\
         {}.\n\n\
         Здесь вы найдёте актуальные цены, отзывы и полезные материалы о массаже.\n\n\
         Запись: {}",
        profile.name,
        profile.city,
        location,
        format_phone(&profile.phone)
    )
}

fn services_post(profile: &Profile) -> String {
    let mut text = String::from("💆 Услуги и цены:\n\n");
    for item in &profile.pricing {
        let _ = writeln!(text, "• {} — {}", item.title, format_price(item.price));
    }
    let _ = write!(
        text,
        "\nЗапись: {}",
        format_phone(&profile.phone)
    );
    if let Some(ref telegram) = profile.telegram {
        let _ = write!(text, " или {}", telegram);
    }
    text
}

fn techniques_post(profile: &Profile) -> String {
    format!(
        "🙌 Какие техники я использую\n\n\
         {}.\n\n\
         Техника подбирается индивидуально после короткой консультации: \
         расскажите, что беспокоит, и мы составим план сеанса.",
        join_techniques(&profile.techniques)
    )
}

fn health_post(_profile: &Profile) -> String {
    "🩺 Когда массаж помогает\n\n\
     • Стресс и усталость\n\
     • Боли в спине и шее\n\
     • Напряжение в мышцах\n\
     • Нарушение сна\n\n\
     Есть и противопоказания: острые воспалительные процессы, высокая температура, \
     кожные заболевания. Если сомневаетесь — напишите, подскажу."
        .to_string()
}

fn booking_post(profile: &Profile) -> String {
    let mut text = format!(
        "📅 Открыта запись на следующую неделю!\n\n\
         Телефон: {}",
        format_phone(&profile.phone)
    );
    if let Some(ref telegram) = profile.telegram {
        let _ = write!(text, "\nTelegram: {}", telegram);
    }
    text.push_str("\n\nПервым трём записавшимся — скидка 10%.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::test_profiles::home_visit_profile;

    #[test]
    fn test_post_plan_shape() {
        let posts = generate_posts(&home_visit_profile());
        assert_eq!(posts.len(), 5);

        let immediate: Vec<_> = posts.iter().filter(|p| p.publish_immediately).collect();
        let deferred: Vec<_> = posts.iter().filter(|p| !p.publish_immediately).collect();
        assert_eq!(immediate.len(), 2);
        assert_eq!(deferred.len(), 3);

        for post in &immediate {
            assert!(post.delay_days.is_none());
        }
        for post in &deferred {
            assert!(post.delay_days.is_some());
        }
    }

    #[test]
    fn test_deferred_delays_increase() {
        let posts = generate_posts(&home_visit_profile());
        let delays: Vec<u32> = posts.iter().filter_map(|p| p.delay_days).collect();
        assert_eq!(delays, vec![2, 5, 7]);
    }

    #[test]
    fn test_posts_carry_contact_info() {
        let posts = generate_posts(&home_visit_profile());
        assert!(posts[0].content.contains("Анна Иванова"));
        assert!(posts[0].content.contains("7 (916) 123-45-67"));
        assert!(posts[1].content.contains("2\u{a0}500\u{a0}₽"));
        assert!(posts[2].content.contains("классический, спортивный"));
    }

    #[test]
    fn test_home_visit_wording() {
        let posts = generate_posts(&home_visit_profile());
        assert!(posts[0].content.contains("Выезжаю на дом"));

        let mut profile = home_visit_profile();
        profile.is_home_visit = false;
        profile.address = Some("адрес".to_string());
        let posts = generate_posts(&profile);
        assert!(posts[0].content.contains("Принимаю в кабинете"));
    }
}
