//! Provider events
//!
//! Decodes the notifications the payment provider posts to the webhook
//! endpoint. Only the fields needed to correlate an event with an order are
//! read; everything else in the payload is ignored.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Metadata key carrying the order UUID.
pub const ORDER_METADATA_KEY: &str = "order_uuid";

/// Metadata key carrying the user UUID.
pub const USER_METADATA_KEY: &str = "user_uuid";

/// Event type sent when a checkout session is paid.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Event type sent when a checkout session expires unpaid.
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";

/// Event type sent when a payment attempt fails.
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Errors raised while decoding an event payload.
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload is not a well-formed event.
    #[error("malformed event payload")]
    Malformed(#[from] serde_json::Error),
}

/// A decoded provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    /// Provider-assigned event id, unique per notification.
    pub id: String,

    /// What happened.
    pub kind: ProviderEventKind,
}

/// The notifications the reconciler acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEventKind {
    /// The customer completed checkout and the payment was captured.
    CheckoutCompleted(PaymentObject),

    /// The checkout session expired without payment.
    CheckoutExpired(PaymentObject),

    /// A payment attempt was declined.
    PaymentFailed(PaymentObject),

    /// Any other event type.
    Unrecognized {
        /// Provider event type name.
        event_type: String,
    },
}

impl ProviderEventKind {
    /// Provider event type name.
    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutCompleted(_) => CHECKOUT_COMPLETED,
            Self::CheckoutExpired(_) => CHECKOUT_EXPIRED,
            Self::PaymentFailed(_) => PAYMENT_FAILED,
            Self::Unrecognized { event_type } => event_type,
        }
    }
}

/// The session or payment an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentObject {
    /// Provider id of the session or payment intent.
    pub id: String,

    /// Provider payment intent id, when known.
    pub payment_intent: Option<String>,

    /// Order named in the metadata, if present and well formed.
    pub order: Option<Uuid>,

    /// User named in the metadata, if present and well formed.
    pub user: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    id: String,
    #[serde(default)]
    payment_intent: Option<RawReference>,
    #[serde(default)]
    metadata: Option<HashMap<String, Value>>,
}

/// References arrive either as a bare id or as an expanded object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReference {
    Id(String),
    Expanded { id: String },
}

impl RawReference {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

impl RawObject {
    fn metadata_uuid(&self, key: &str) -> Option<Uuid> {
        self.metadata
            .as_ref()?
            .get(key)?
            .as_str()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
    }

    fn into_payment_object(self, is_payment_intent: bool) -> PaymentObject {
        let order = self.metadata_uuid(ORDER_METADATA_KEY);
        let user = self.metadata_uuid(USER_METADATA_KEY);

        let payment_intent = if is_payment_intent {
            Some(self.id.clone())
        } else {
            self.payment_intent.map(RawReference::into_id)
        };

        PaymentObject {
            id: self.id,
            payment_intent,
            order,
            user,
        }
    }
}

impl ProviderEvent {
    /// Decode an event from its raw JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Malformed`] if the payload, or the object of a
    /// recognised event type, does not have the expected shape.
    pub fn from_slice(payload: &[u8]) -> Result<Self, EventError> {
        let raw: RawEvent = serde_json::from_slice(payload)?;

        let object = |is_payment_intent: bool| -> Result<PaymentObject, EventError> {
            let object: RawObject = serde_json::from_value(raw.data.object.clone())?;

            Ok(object.into_payment_object(is_payment_intent))
        };

        let kind = match raw.event_type.as_str() {
            CHECKOUT_COMPLETED => ProviderEventKind::CheckoutCompleted(object(false)?),
            CHECKOUT_EXPIRED => ProviderEventKind::CheckoutExpired(object(false)?),
            PAYMENT_FAILED => ProviderEventKind::PaymentFailed(object(true)?),
            _ => ProviderEventKind::Unrecognized {
                event_type: raw.event_type.clone(),
            },
        };

        Ok(Self { id: raw.id, kind })
    }
}
