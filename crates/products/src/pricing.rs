//! Price rows and discount resolution.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, Entity, Timestamps};

use crate::reference::AttributeId;
use crate::validate;
use crate::variation::ProductVariationId;

catalog_core::uuid_id!(ProductPriceId, "ProductPriceId");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDraft {
    pub variation_id: ProductVariationId,
    pub attribute_ids: Vec<AttributeId>,
    pub unit_price: Decimal,
    /// Percentage off, 0..=100.
    pub discount: Option<Decimal>,
    pub discount_start_date: Option<NaiveDate>,
    pub discount_end_date: Option<NaiveDate>,
}

impl PriceDraft {
    pub fn new(variation_id: ProductVariationId, unit_price: Decimal) -> Self {
        Self {
            variation_id,
            attribute_ids: Vec::new(),
            unit_price,
            discount: None,
            discount_start_date: None,
            discount_end_date: None,
        }
    }

    pub fn with_discount(mut self, percent: Decimal, start: NaiveDate, end: NaiveDate) -> Self {
        self.discount = Some(percent);
        self.discount_start_date = Some(start);
        self.discount_end_date = Some(end);
        self
    }
}

/// A priced entry of a variation, narrowed by a subset of its attributes
/// (stored as [`PriceAttribute`] records).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub id: ProductPriceId,
    pub variation_id: ProductVariationId,
    pub unit_price: Decimal,
    pub discount: Option<Decimal>,
    pub discount_start_date: Option<NaiveDate>,
    pub discount_end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl ProductPrice {
    pub fn create(draft: &PriceDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let unit_price = validate::fixed_point("unit_price", draft.unit_price, 10, 2)?;

        let discount = match draft.discount {
            Some(d) => {
                if d < Decimal::ZERO || d > Decimal::ONE_HUNDRED {
                    return Err(DomainError::validation(format!(
                        "discount must be between 0 and 100 (got {d})"
                    )));
                }
                Some(validate::fixed_point("discount", d, 5, 2)?)
            }
            None => None,
        };

        if let (Some(start), Some(end)) = (draft.discount_start_date, draft.discount_end_date) {
            if end < start {
                return Err(DomainError::validation(format!(
                    "discount_end_date ({end}) is before discount_start_date ({start})"
                )));
            }
        }

        Ok(Self {
            id: ProductPriceId::new(),
            variation_id: draft.variation_id,
            unit_price,
            discount,
            discount_start_date: draft.discount_start_date,
            discount_end_date: draft.discount_end_date,
            timestamps: Timestamps::at(now),
        })
    }

    pub fn discount_is_active(&self, today: NaiveDate) -> bool {
        discount_is_active(self.discount, self.discount_start_date, self.discount_end_date, today)
    }

    pub fn effective_price(&self, today: NaiveDate) -> Decimal {
        effective_price(
            self.unit_price,
            self.discount,
            self.discount_start_date,
            self.discount_end_date,
            today,
        )
    }
}

impl Entity for ProductPrice {
    type Id = ProductPriceId;

    fn id(&self) -> &ProductPriceId {
        &self.id
    }

    fn recorded(&self) -> Timestamps {
        self.timestamps
    }
}

impl core::fmt::Display for ProductPrice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Price for ProductVariation ID: {}", self.variation_id)
    }
}

/// Price ↔ Attribute relation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAttribute {
    pub price_id: ProductPriceId,
    pub attribute_id: AttributeId,
    pub created_at: DateTime<Utc>,
}

/// A discount applies only when set and `start <= today <= end`; an open-ended
/// window never applies.
pub fn discount_is_active(
    discount: Option<Decimal>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    match (discount, start, end) {
        (Some(_), Some(start), Some(end)) => start <= today && today <= end,
        _ => false,
    }
}

/// Price after resolving the discount window for `today`, rounded to cents.
pub fn effective_price(
    unit_price: Decimal,
    discount: Option<Decimal>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Decimal {
    match discount {
        Some(percent) if discount_is_active(discount, start, end, today) => {
            let factor = Decimal::ONE - percent / Decimal::ONE_HUNDRED;
            (unit_price * factor).round_dp(2)
        }
        _ => unit_price,
    }
}

/// A price row may only narrow its variation: every attribute it names must be
/// one of the variation's attributes.
pub fn ensure_attribute_subset(
    price_attributes: &[AttributeId],
    variation_attributes: &[AttributeId],
) -> DomainResult<()> {
    let allowed: HashSet<&AttributeId> = variation_attributes.iter().collect();
    match price_attributes.iter().find(|a| !allowed.contains(a)) {
        Some(missing) => Err(DomainError::invariant(format!(
            "attribute {missing} is not part of the price row's variation"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hundred() -> Decimal {
        Decimal::new(10000, 2)
    }

    #[test]
    fn no_discount_is_unit_price_exactly() {
        let p = effective_price(hundred(), None, None, None, date(2024, 1, 1));
        assert_eq!(p, hundred());
        assert_eq!(p.to_string(), "100.00");
    }

    #[test]
    fn active_discount_applies() {
        let p = effective_price(
            hundred(),
            Some(Decimal::from(20)),
            Some(date(2024, 1, 1)),
            Some(date(2024, 1, 31)),
            date(2024, 1, 15),
        );
        assert_eq!(p, Decimal::new(8000, 2));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = date(2024, 1, 1);
        let end = date(2024, 1, 31);
        let d = Some(Decimal::from(20));
        assert_eq!(effective_price(hundred(), d, Some(start), Some(end), start), Decimal::from(80));
        assert_eq!(effective_price(hundred(), d, Some(start), Some(end), end), Decimal::from(80));
    }

    #[test]
    fn discount_outside_window_is_ignored() {
        let d = Some(Decimal::from(20));
        let start = Some(date(2024, 1, 1));
        let end = Some(date(2024, 1, 31));
        assert_eq!(effective_price(hundred(), d, start, end, date(2023, 12, 31)), hundred());
        assert_eq!(effective_price(hundred(), d, start, end, date(2024, 2, 1)), hundred());
    }

    #[test]
    fn open_ended_window_is_inactive() {
        let d = Some(Decimal::from(20));
        assert_eq!(effective_price(hundred(), d, Some(date(2024, 1, 1)), None, date(2024, 6, 1)), hundred());
        assert_eq!(effective_price(hundred(), d, None, None, date(2024, 6, 1)), hundred());
    }

    #[test]
    fn result_is_rounded_to_cents() {
        let p = effective_price(
            Decimal::new(999, 2),
            Some(Decimal::new(3333, 2)),
            Some(date(2024, 1, 1)),
            Some(date(2024, 1, 2)),
            date(2024, 1, 1),
        );
        assert_eq!(p.scale(), 2);
        assert_eq!(p, Decimal::new(666, 2));
    }

    #[test]
    fn discount_above_hundred_is_rejected() {
        let draft = PriceDraft::new(ProductVariationId::new(), hundred()).with_discount(
            Decimal::from(150),
            date(2024, 1, 1),
            date(2024, 1, 31),
        );
        match ProductPrice::create(&draft, Utc::now()) {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("discount")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn negative_discount_is_rejected() {
        let mut draft = PriceDraft::new(ProductVariationId::new(), hundred());
        draft.discount = Some(Decimal::from(-5));
        assert!(ProductPrice::create(&draft, Utc::now()).is_err());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let draft = PriceDraft::new(ProductVariationId::new(), hundred()).with_discount(
            Decimal::from(10),
            date(2024, 2, 1),
            date(2024, 1, 1),
        );
        assert!(matches!(
            ProductPrice::create(&draft, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn single_day_window_is_valid() {
        let day = date(2024, 3, 3);
        let draft = PriceDraft::new(ProductVariationId::new(), hundred()).with_discount(Decimal::from(50), day, day);
        let price = ProductPrice::create(&draft, Utc::now()).unwrap();
        assert!(price.discount_is_active(day));
        assert_eq!(price.effective_price(day), Decimal::from(50));
    }

    #[test]
    fn attribute_subset_is_enforced() {
        let size = AttributeId::new();
        let color = AttributeId::new();
        let other = AttributeId::new();
        assert!(ensure_attribute_subset(&[size], &[size, color]).is_ok());
        assert!(ensure_attribute_subset(&[], &[size]).is_ok());
        assert!(matches!(
            ensure_attribute_subset(&[size, other], &[size, color]),
            Err(DomainError::Invariant(_))
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn money() -> impl Strategy<Value = Decimal> {
            (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
        }

        fn percent() -> impl Strategy<Value = Decimal> {
            (0i64..=10_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: without a discount the unit price passes through untouched.
            #[test]
            fn no_discount_is_identity(unit in money(), offset in -400i64..400) {
                let today = date(2024, 6, 1) + chrono::Duration::days(offset);
                prop_assert_eq!(
                    effective_price(unit, None, Some(date(2024, 1, 1)), Some(date(2024, 12, 31)), today),
                    unit
                );
            }

            /// Property: an active discount never raises the price nor goes below zero.
            #[test]
            fn active_discount_is_bounded(unit in money(), pct in percent(), len in 0i64..60, pos in 0i64..60) {
                let start = date(2024, 1, 1);
                let end = start + chrono::Duration::days(len);
                let today = start + chrono::Duration::days(pos.min(len));
                let p = effective_price(unit, Some(pct), Some(start), Some(end), today);
                prop_assert!(p <= unit);
                prop_assert!(p >= Decimal::ZERO);
            }

            /// Property: outside the window the discount is ignored.
            #[test]
            fn inactive_window_is_identity(unit in money(), pct in percent(), after in 1i64..365) {
                let start = date(2024, 1, 1);
                let end = date(2024, 1, 31);
                let today = end + chrono::Duration::days(after);
                prop_assert_eq!(effective_price(unit, Some(pct), Some(start), Some(end), today), unit);
            }
        }
    }
}
