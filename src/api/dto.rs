use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::cod::{CodVerification, VerificationStatus};
use crate::domain::order::{
    NoteType, Order, OrderId, OrderItem, OrderNote, OrderStatus, PaymentMethod, StatusChange,
};
use crate::domain::phone::PhoneNumber;
use super::error::ApiError;

// ============================================================================
// Wire Payloads
// ============================================================================
//
// Responses are deserialised into loose payloads first and then checked
// field by field before they become domain entities. A record that breaks
// an invariant is rejected here instead of leaking half-filled fields into
// the rest of the crate.
//
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    pub id: Option<u64>,
    pub order_number: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub is_cash_on_delivery: Option<bool>,
    pub cod_verification: Option<CodVerificationPayload>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub total_amount: Option<Decimal>,
    pub subtotal: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub flash_sale_savings: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
    #[serde(default)]
    pub notes: Vec<OrderNotePayload>,
    #[serde(default)]
    pub status_history: Vec<StatusChangePayload>,
    pub created_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CodVerificationPayload {
    pub verification_status: Option<String>,
    pub verified_by: Option<String>,
    pub verification_date: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub paid_by: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemPayload {
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct OrderNotePayload {
    pub note_type: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub is_internal: bool,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangePayload {
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
    pub changed_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Paginated list envelope; records stay raw so each can fail on its own
#[derive(Debug, Deserialize)]
pub struct OrderListPayload {
    #[serde(default)]
    pub results: Vec<Value>,
    pub count: u64,
}

// ============================================================================
// Request Bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusUpdateRequest<'a> {
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CodNotesRequest<'a> {
    pub notes: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNote {
    pub note_type: NoteType,
    pub note: String,
    pub is_internal: bool,
}

// ============================================================================
// Payload -> Domain
// ============================================================================

/// Parse one raw JSON record into a validated order
pub fn parse_order(value: Value) -> Result<Order, ApiError> {
    let id_hint = value
        .get("id")
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());
    let payload: OrderPayload = serde_json::from_value(value)
        .map_err(|e| ApiError::malformed(&id_hint, e.to_string()))?;
    Order::try_from(payload)
}

fn required<T>(value: Option<T>, id: &str, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::malformed(id, format!("missing {field}")))
}

fn money(value: Option<Decimal>, id: &str, field: &str) -> Result<Decimal, ApiError> {
    let amount = value.unwrap_or(Decimal::ZERO);
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ApiError::malformed(id, format!("negative {field}: {amount}")));
    }
    Ok(amount)
}

fn status(raw: &str, id: &str) -> Result<OrderStatus, ApiError> {
    raw.parse::<OrderStatus>().map_err(|e| ApiError::malformed(id, e))
}

impl TryFrom<OrderPayload> for Order {
    type Error = ApiError;

    fn try_from(payload: OrderPayload) -> Result<Self, Self::Error> {
        let raw_id = required(payload.id, "<unknown>", "id")?;
        let id = raw_id.to_string();

        let order_number = required(payload.order_number, &id, "order_number")?;
        if order_number.trim().is_empty() {
            return Err(ApiError::malformed(&id, "empty order_number"));
        }

        let order_status = status(&required(payload.status, &id, "status")?, &id)?;
        let payment_method: PaymentMethod = required(payload.payment_method, &id, "payment_method")?
            .parse()
            .map_err(|e: String| ApiError::malformed(&id, e))?;

        if let Some(flag) = payload.is_cash_on_delivery {
            if flag != payment_method.is_cash_on_delivery() {
                return Err(ApiError::malformed(
                    &id,
                    format!("is_cash_on_delivery={flag} contradicts {payment_method}"),
                ));
            }
        }

        let cod_verification = match (payment_method.is_cash_on_delivery(), payload.cod_verification) {
            (true, Some(v)) => Some(parse_verification(v, &id)?),
            (true, None) => Some(CodVerification::pending()),
            (false, Some(_)) => {
                return Err(ApiError::malformed(&id, "cod_verification on a non-COD order"));
            }
            (false, None) => None,
        };

        let items = payload
            .items
            .into_iter()
            .map(|item| parse_item(item, &id))
            .collect::<Result<Vec<_>, _>>()?;
        let notes = payload
            .notes
            .into_iter()
            .map(|note| parse_note(note, &id))
            .collect::<Result<Vec<_>, _>>()?;
        let status_history = payload
            .status_history
            .into_iter()
            .map(|change| parse_status_change(change, &id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order {
            id: OrderId(raw_id),
            order_number,
            status: order_status,
            payment_method,
            cod_verification,
            customer_name: payload.customer_name.unwrap_or_default(),
            customer_phone: payload
                .customer_phone
                .filter(|p| !p.trim().is_empty())
                .map(|p| PhoneNumber::normalize(&p)),
            delivery_address: payload.delivery_address,
            subtotal: money(payload.subtotal, &id, "subtotal")?,
            delivery_fee: money(payload.delivery_fee, &id, "delivery_fee")?,
            tax_amount: money(payload.tax_amount, &id, "tax_amount")?,
            flash_sale_savings: money(payload.flash_sale_savings, &id, "flash_sale_savings")?,
            total_amount: money(
                Some(required(payload.total_amount, &id, "total_amount")?),
                &id,
                "total_amount",
            )?,
            items,
            notes,
            status_history,
            created_at: required(payload.created_at, &id, "created_at")?,
            confirmed_at: payload.confirmed_at,
            delivered_at: payload.delivered_at,
            cancelled_at: payload.cancelled_at,
        })
    }
}

fn parse_verification(payload: CodVerificationPayload, id: &str) -> Result<CodVerification, ApiError> {
    let verification_status = match payload.verification_status.as_deref().map(str::trim) {
        None | Some("pending") => VerificationStatus::Pending,
        Some("verified") => VerificationStatus::Verified,
        Some("delivered_paid") => VerificationStatus::DeliveredPaid,
        Some("rejected") => VerificationStatus::Rejected,
        Some(other) => {
            return Err(ApiError::malformed(id, format!("unknown verification status: {other}")));
        }
    };

    Ok(CodVerification {
        verification_status,
        verified_by: payload.verified_by,
        verification_date: payload.verification_date,
        verification_notes: payload.verification_notes,
        paid_by: payload.paid_by,
        paid_at: payload.paid_at,
    })
}

fn parse_item(payload: OrderItemPayload, id: &str) -> Result<OrderItem, ApiError> {
    let quantity = required(payload.quantity, id, "item quantity")?;
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| ApiError::malformed(id, format!("item quantity {quantity} below 1")))?;

    Ok(OrderItem {
        product_name: payload.product_name.unwrap_or_default(),
        quantity,
        unit_price: money(Some(required(payload.unit_price, id, "unit_price")?), id, "unit_price")?,
    })
}

fn parse_note(payload: OrderNotePayload, id: &str) -> Result<OrderNote, ApiError> {
    let note_type = match payload.note_type.as_deref() {
        None => NoteType::General,
        Some(raw) => raw.parse::<NoteType>().map_err(|e| ApiError::malformed(id, e))?,
    };

    Ok(OrderNote {
        note_type,
        note: payload.note.unwrap_or_default(),
        is_internal: payload.is_internal,
        created_by: payload.created_by.unwrap_or_else(|| "system".to_string()),
        created_at: required(payload.created_at, id, "note created_at")?,
    })
}

fn parse_status_change(payload: StatusChangePayload, id: &str) -> Result<StatusChange, ApiError> {
    let new_status = status(&required(payload.new_status, id, "new_status")?, id)?;
    // The creation entry carries no previous status.
    let previous_status = match payload.previous_status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => status(raw, id)?,
        None => new_status,
    };

    Ok(StatusChange {
        previous_status,
        new_status,
        changed_by: payload.changed_by.unwrap_or_else(|| "system".to_string()),
        notes: payload.notes.filter(|n| !n.trim().is_empty()),
        created_at: required(payload.created_at, id, "status change created_at")?,
    })
}
