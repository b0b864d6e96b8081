//! The freelancer profile submitted through the intake form.

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// A single priced service, e.g. "Классический массаж 60 мин" for 2500 RUB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingItem {
    pub title: String,
    /// Price in whole rubles.
    pub price: u32,
}

/// Profile data collected from the intake form. Immutable once submitted;
/// jobs reference it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub city: String,
    pub area: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    pub techniques: Vec<String>,
    pub pricing: Vec<PricingItem>,
    pub is_home_visit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Profile {
    /// Validates form-level invariants before a job is accepted.
    ///
    /// An address is mandatory only for office-based practitioners
    /// (`is_home_visit == false`).
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyField("name"));
        }
        if self.city.trim().is_empty() {
            return Err(ProfileError::EmptyField("city"));
        }
        if self.area.trim().is_empty() {
            return Err(ProfileError::EmptyField("area"));
        }
        if self.phone.trim().is_empty() {
            return Err(ProfileError::EmptyField("phone"));
        }
        if self.techniques.iter().all(|t| t.trim().is_empty()) {
            return Err(ProfileError::NoTechniques);
        }
        if self.pricing.is_empty() {
            return Err(ProfileError::NoPricing);
        }
        for item in &self.pricing {
            if item.price == 0 {
                return Err(ProfileError::InvalidPrice {
                    title: item.title.clone(),
                });
            }
        }
        if !self.is_home_visit && self.address.as_deref().map_or(true, |a| a.trim().is_empty()) {
            return Err(ProfileError::MissingAddress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> Profile {
        Profile {
            name: "Анна Иванова".to_string(),
            city: "Москва".to_string(),
            area: "Хамовники".to_string(),
            phone: "79161234567".to_string(),
            telegram: Some("@anna_massage".to_string()),
            techniques: vec!["классический".to_string(), "спортивный".to_string()],
            pricing: vec![PricingItem {
                title: "Classic 60min".to_string(),
                price: 2500,
            }],
            is_home_visit: true,
            address: None,
        }
    }

    #[test]
    fn test_valid_home_visit_profile() {
        assert!(sample_profile().validate().is_ok());
    }

    #[test]
    fn test_office_profile_requires_address() {
        let mut profile = sample_profile();
        profile.is_home_visit = false;
        profile.address = None;
        assert_eq!(profile.validate(), Err(ProfileError::MissingAddress));

        profile.address = Some("  ".to_string());
        assert_eq!(profile.validate(), Err(ProfileError::MissingAddress));

        profile.address = Some("ул. Льва Толстого, 16".to_string());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut profile = sample_profile();
        profile.name = String::new();
        assert_eq!(profile.validate(), Err(ProfileError::EmptyField("name")));

        let mut profile = sample_profile();
        profile.phone = "   ".to_string();
        assert_eq!(profile.validate(), Err(ProfileError::EmptyField("phone")));
    }

    #[test]
    fn test_techniques_required() {
        let mut profile = sample_profile();
        profile.techniques = vec![];
        assert_eq!(profile.validate(), Err(ProfileError::NoTechniques));

        profile.techniques = vec!["".to_string()];
        assert_eq!(profile.validate(), Err(ProfileError::NoTechniques));
    }

    #[test]
    fn test_pricing_required_and_positive() {
        let mut profile = sample_profile();
        profile.pricing = vec![];
        assert_eq!(profile.validate(), Err(ProfileError::NoPricing));

        profile.pricing = vec![PricingItem {
            title: "Экспресс".to_string(),
            price: 0,
        }];
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_profile_serde_roundtrip() {
        let profile = sample_profile();
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(profile, back);
        // Optional address is omitted entirely, not serialized as null.
        assert!(!json.contains("address"));
    }
}
