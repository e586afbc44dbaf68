//! Static service and package catalog.
//!
//! The catalog is defined once at process start and never mutated. All three
//! session/intent creators price through the functions here so the three
//! endpoints cannot drift apart.

use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Face,
    Body,
    Brazilian,
}

impl Category {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "face" => Some(Self::Face),
            "body" => Some(Self::Body),
            "brazilian" => Some(Self::Brazilian),
            _ => None,
        }
    }
}

/// A single bookable treatment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub price: Decimal,
    pub popular: bool,
}

/// A prepaid multi-session bundle. `sessions` are paid for; `bonus_sessions`
/// are granted on top and never billed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Package {
    pub id: &'static str,
    pub name: &'static str,
    pub price_per_session: Decimal,
    pub sessions: u32,
    pub bonus_sessions: u32,
    pub popular: bool,
}

static SERVICES: Lazy<Vec<Service>> = Lazy::new(|| {
    vec![
        Service {
            id: "brazilian",
            name: "Brazilian Wax",
            category: Category::Brazilian,
            price: dec!(75),
            popular: true,
        },
        Service {
            id: "bikini-line",
            name: "Bikini Line Wax",
            category: Category::Brazilian,
            price: dec!(40),
            popular: false,
        },
        Service {
            id: "eyebrows",
            name: "Eyebrow Wax",
            category: Category::Face,
            price: dec!(25),
            popular: false,
        },
        Service {
            id: "upper-lip",
            name: "Upper Lip Wax",
            category: Category::Face,
            price: dec!(15),
            popular: false,
        },
        Service {
            id: "full-face",
            name: "Full Face Wax",
            category: Category::Face,
            price: dec!(60),
            popular: true,
        },
        Service {
            id: "underarms",
            name: "Underarm Wax",
            category: Category::Body,
            price: dec!(25),
            popular: false,
        },
        Service {
            id: "full-legs",
            name: "Full Legs Wax",
            category: Category::Body,
            price: dec!(90),
            popular: false,
        },
        Service {
            id: "full-arms",
            name: "Full Arms Wax",
            category: Category::Body,
            price: dec!(55),
            popular: false,
        },
    ]
});

static PACKAGES: Lazy<Vec<Package>> = Lazy::new(|| {
    vec![
        Package {
            id: "brazilian-9",
            name: "Brazilian Wax Package (9 + 3 Free)",
            price_per_session: dec!(61),
            sessions: 9,
            bonus_sessions: 3,
            popular: true,
        },
        Package {
            id: "brazilian-6",
            name: "Brazilian Wax Package (6 + 1 Free)",
            price_per_session: dec!(65),
            sessions: 6,
            bonus_sessions: 1,
            popular: false,
        },
        Package {
            id: "underarm-9",
            name: "Underarm Wax Package (9 + 3 Free)",
            price_per_session: dec!(20),
            sessions: 9,
            bonus_sessions: 3,
            popular: false,
        },
        Package {
            id: "bikini-line-9",
            name: "Bikini Line Package (9 + 3 Free)",
            price_per_session: dec!(35),
            sessions: 9,
            bonus_sessions: 3,
            popular: false,
        },
        Package {
            id: "full-legs-6",
            name: "Full Legs Package (6 + 1 Free)",
            price_per_session: dec!(80),
            sessions: 6,
            bonus_sessions: 1,
            popular: false,
        },
    ]
});

pub fn all_services() -> &'static [Service] {
    &SERVICES
}

pub fn all_packages() -> &'static [Package] {
    &PACKAGES
}

pub fn service_by_id(id: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.id == id)
}

pub fn package_by_id(id: &str) -> Option<&'static Package> {
    PACKAGES.iter().find(|p| p.id == id)
}

pub fn services_by_category(category: Category) -> Vec<&'static Service> {
    SERVICES.iter().filter(|s| s.category == category).collect()
}

/// Total price of a package in currency units: only paid sessions are billed.
pub fn package_total(package: &Package) -> Decimal {
    package.price_per_session * Decimal::from(package.sessions)
}

/// Total price of a package in integer minor units (cents).
pub fn package_total_cents(package: &Package) -> i64 {
    // Catalog prices are whole-cent decimals, so this conversion is exact.
    (package_total(package) * dec!(100))
        .to_i64()
        .unwrap_or_default()
}

/// Sessions the customer actually receives, bonus included.
pub fn total_sessions(package: &Package) -> u32 {
    package.sessions + package.bonus_sessions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<&str> = all_services()
            .iter()
            .map(|s| s.id)
            .chain(all_packages().iter().map(|p| p.id))
            .collect();
        let len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        // Service and package ids share a namespace in checkout metadata.
        assert_eq!(ids.len(), len, "duplicate catalog id");
    }

    #[test]
    fn brazilian_package_prices_to_54900_cents() {
        let pkg = package_by_id("brazilian-9").expect("catalog package");
        assert_eq!(package_total(pkg), dec!(549));
        assert_eq!(package_total_cents(pkg), 54_900);
        assert_eq!(total_sessions(pkg), 12);
    }

    #[test]
    fn bonus_sessions_are_not_billed() {
        for pkg in all_packages() {
            assert_eq!(
                package_total_cents(pkg),
                (pkg.price_per_session * Decimal::from(pkg.sessions) * dec!(100))
                    .to_i64()
                    .unwrap()
            );
        }
    }

    #[test]
    fn lookups() {
        assert!(package_by_id("brazilian-9").is_some());
        assert!(package_by_id("no-such-package").is_none());
        assert_eq!(service_by_id("brazilian").unwrap().name, "Brazilian Wax");

        let face = services_by_category(Category::Face);
        assert!(face.iter().all(|s| s.category == Category::Face));
        assert!(face.iter().any(|s| s.id == "eyebrows"));
    }

    #[test]
    fn category_parse() {
        assert_eq!(Category::parse("Brazilian"), Some(Category::Brazilian));
        assert_eq!(Category::parse("FACE"), Some(Category::Face));
        assert_eq!(Category::parse("nails"), None);
    }
}
