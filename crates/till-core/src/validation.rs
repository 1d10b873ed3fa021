//! # Validation Module
//!
//! Input validation for every mutating operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (till-api)                                              │
//! │  └── Type validation (JSON deserialization, whole numbers only)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rules, checked before any unit of work opens             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock_quantity >= 0), NOT NULL                             │
//! │  ├── UNIQUE (sku), UNIQUE (transaction_id), PRIMARY KEY (member_id)    │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewInventoryItem, NewMember, SaleRequest};
use crate::{BPS_SCALE, MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters after trimming
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-5KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    require_text("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates the free-text reason recorded on a stock history entry.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    require_text("reason", reason, 500)
}

/// Validates an email address (shape only: `local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    require_text("email", email, 254)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a phone number: digits plus the usual separators, 6 to 20 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    require_text("phone", phone, 32)?;

    let phone = phone.trim();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();

    if !allowed || !(6..=20).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 6 to 20 digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an absolute stock quantity.
///
/// ## Rules
/// - Must be ≥ 0. Zero is a valid stock level.
///
/// Fractional quantities never reach this function: the wire type is `i64`
/// and JSON decoding rejects `2.5`.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "newQuantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a sale line quantity (1 to [`MAX_ITEM_QUANTITY`]).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents.
pub fn validate_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a percentage in basis points (0 to 10000).
pub fn validate_bps(field: &str, bps: i64) -> ValidationResult<()> {
    if !(0..=BPS_SCALE).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }

    Ok(())
}

/// Validates a points balance or points amount.
pub fn validate_points(field: &str, points: i64) -> ValidationResult<()> {
    if points < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates a new inventory item.
pub fn validate_new_item(item: &NewInventoryItem) -> ValidationResult<()> {
    validate_sku(&item.sku)?;
    require_text("name", &item.name, 200)?;
    require_text("category", &item.category, 100)?;
    require_text("brand", &item.brand, 100)?;
    validate_cents("priceCents", item.price_cents)?;
    validate_stock_quantity(item.stock_quantity)?;

    if item.reorder_point < 0 {
        return Err(ValidationError::OutOfRange {
            field: "reorderPoint".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a new member. The tier is checked against storage later.
pub fn validate_new_member(member: &NewMember) -> ValidationResult<()> {
    require_text("name", &member.name, 200)?;
    validate_email(&member.email)?;
    validate_phone(&member.phone)?;
    require_text("tier", &member.tier, 50)?;
    Ok(())
}

/// Validates a sale request.
///
/// ## Rules
/// ```text
/// transactionId      non-empty, ≤ 100 chars
/// items              1..=100 lines
///   quantity         1..=999
///   pricePerUnit     ≥ 0
///   discountBps      0..=10000
/// money fields       ≥ 0
/// totalCents         = subtotal − discount + tax
/// memberDetails      requires memberId; points ≥ 0
/// ```
pub fn validate_sale_request(req: &SaleRequest) -> ValidationResult<()> {
    require_text("transactionId", &req.transaction_id, 100)?;

    if req.items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    if req.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for line in &req.items {
        if line.item_id.trim().is_empty() {
            return Err(ValidationError::required("itemId"));
        }
        validate_quantity(line.quantity)?;
        validate_cents("pricePerUnitCents", line.price_per_unit_cents)?;
        validate_bps("discountBps", line.discount_bps)?;
    }

    if let Some(name) = &req.customer_name {
        if name.chars().count() > 200 {
            return Err(ValidationError::TooLong {
                field: "customerName".to_string(),
                max: 200,
            });
        }
    }

    validate_cents("subtotalCents", req.subtotal_cents)?;
    validate_cents("discountCents", req.discount_cents)?;
    validate_cents("taxCents", req.tax_cents)?;
    validate_cents("totalCents", req.total_cents)?;

    let expected = req
        .subtotal_cents
        .checked_sub(req.discount_cents)
        .and_then(|net| net.checked_add(req.tax_cents))
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "totalCents".to_string(),
            min: 0,
            max: i64::MAX,
        })?;
    if req.total_cents != expected {
        return Err(ValidationError::Mismatch {
            field: "totalCents".to_string(),
            expected,
            actual: req.total_cents,
        });
    }

    if let Some(details) = &req.member_details {
        match &req.member_id {
            Some(id) if !id.trim().is_empty() => {}
            _ => return Err(ValidationError::required("memberId")),
        }
        validate_points("pointsEarned", details.points_earned)?;
        validate_points("newTotalPoints", details.new_total_points)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberDetails, PaymentMethod, SaleLineRequest};

    fn sale() -> SaleRequest {
        SaleRequest {
            transaction_id: "TX-1001".to_string(),
            customer_name: None,
            member_id: None,
            payment_method: PaymentMethod::Cash,
            items: vec![SaleLineRequest {
                item_id: "item-1".to_string(),
                quantity: 2,
                price_per_unit_cents: 500,
                discount_bps: 0,
            }],
            subtotal_cents: 1000,
            discount_cents: 100,
            tax_cents: 90,
            total_cents: 990,
            member_details: None,
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("RICE-5KG").is_ok());
        assert!(validate_sku("item_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_stock_quantity() {
        assert!(validate_stock_quantity(0).is_ok());
        assert!(validate_stock_quantity(1_000_000).is_ok());
        assert!(validate_stock_quantity(-1).is_err());
        assert!(validate_stock_quantity(i64::MIN).is_err());
    }

    #[test]
    fn test_validate_email_and_phone() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("").is_err());

        assert!(validate_phone("+62 812-3456-7890").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
    }

    #[test]
    fn test_validate_new_member() {
        let member = NewMember {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: "0812345678".to_string(),
            tier: "Gold".to_string(),
        };
        assert!(validate_new_member(&member).is_ok());

        let missing_tier = NewMember {
            tier: String::new(),
            ..member
        };
        assert_eq!(
            validate_new_member(&missing_tier),
            Err(ValidationError::required("tier"))
        );
    }

    #[test]
    fn test_valid_sale() {
        assert!(validate_sale_request(&sale()).is_ok());
    }

    #[test]
    fn test_sale_needs_items() {
        let mut req = sale();
        req.items.clear();
        assert_eq!(
            validate_sale_request(&req),
            Err(ValidationError::required("items"))
        );
    }

    #[test]
    fn test_sale_total_must_add_up() {
        let mut req = sale();
        req.total_cents = 1000;
        assert!(matches!(
            validate_sale_request(&req),
            Err(ValidationError::Mismatch { expected: 990, .. })
        ));
    }

    #[test]
    fn test_sale_total_overflow_is_out_of_range() {
        let mut req = sale();
        req.subtotal_cents = i64::MAX;
        req.discount_cents = 0;
        req.tax_cents = 1;
        req.total_cents = i64::MAX;
        assert!(matches!(
            validate_sale_request(&req),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "totalCents"
        ));

        req.tax_cents = 0;
        assert!(validate_sale_request(&req).is_ok());
    }

    #[test]
    fn test_sale_line_rules() {
        let mut req = sale();
        req.items[0].quantity = 0;
        assert!(validate_sale_request(&req).is_err());

        let mut req = sale();
        req.items[0].discount_bps = 10_001;
        assert!(validate_sale_request(&req).is_err());

        let mut req = sale();
        req.items[0].price_per_unit_cents = -1;
        assert!(validate_sale_request(&req).is_err());
    }

    #[test]
    fn test_member_details_need_member() {
        let mut req = sale();
        req.member_details = Some(MemberDetails {
            points_earned: 9,
            new_total_points: 109,
        });
        assert_eq!(
            validate_sale_request(&req),
            Err(ValidationError::required("memberId"))
        );

        req.member_id = Some("M001".to_string());
        assert!(validate_sale_request(&req).is_ok());
    }
}
