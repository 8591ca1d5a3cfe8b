//! Payment routes: intent creation and the Stripe webhook receiver

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    email::InvoiceData,
    error::ApiError,
    middleware::{AuthUser, Policy, authorize},
    models::{BookingStatus, NewPayment},
    repositories::ConfirmOutcome,
    state::AppState,
    stripe::{self, SIGNATURE_TOLERANCE_SECONDS, WebhookEvent},
};

/// Request for payment-intent creation
#[derive(Deserialize)]
pub struct CreateIntentRequest {
    pub booking_id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/payments/intent", post(create_intent))
}

/// Create a Stripe PaymentIntent for a pending booking. The charge amount
/// is the booking total converted to the minor unit (poisha).
pub async fn create_intent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .booking_repository
        .find_by_id(payload.booking_id)
        .await
        .map_err(|e| {
            error!("Failed to get booking: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Booking"))?;

    authorize(&user, Policy::Owner(booking.user_id))?;

    if matches!(
        booking.status,
        BookingStatus::Confirmed | BookingStatus::Completed
    ) {
        return Err(ApiError::Conflict("Booking already confirmed".to_string()));
    }

    let Some(stripe_client) = state.stripe_client.as_ref() else {
        error!("Payment intent requested but Stripe keys are not configured");
        return Err(ApiError::InternalServerError);
    };

    let amount = booking.total_cost * 100;
    let intent = stripe_client
        .create_payment_intent(amount, "bdt", booking.id, user.id)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(json!({
        "client_secret": intent.client_secret,
    })))
}

/// Stripe webhook receiver.
///
/// A bad signature answers 400 so the gateway retries; everything the
/// service cannot act on (unknown event type, missing metadata, a booking
/// no longer pending) is acknowledged with 200 because retrying cannot fix
/// it. The payment insert and booking confirmation commit atomically, and a
/// redelivered intent id is a no-op.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(config) = state.config.stripe.as_ref() else {
        error!("Webhook received but Stripe keys are not configured");
        return StatusCode::INTERNAL_SERVER_ERROR;
    };

    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
    else {
        warn!("Webhook without a Stripe-Signature header");
        return StatusCode::BAD_REQUEST;
    };

    let now = match std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
    {
        Ok(duration) => duration.as_secs(),
        Err(e) => {
            error!("Failed to get current time: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    if let Err(e) = stripe::verify_signature(
        &body,
        signature,
        &config.webhook_secret,
        SIGNATURE_TOLERANCE_SECONDS,
        now,
    ) {
        warn!("Rejected webhook: {}", e);
        return StatusCode::BAD_REQUEST;
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Unparseable webhook payload: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if event.event_type != "payment_intent.succeeded" {
        info!("Ignoring webhook event type {}", event.event_type);
        return StatusCode::OK;
    }

    let intent = event.data.object;

    let booking_id = match intent
        .metadata
        .get("booking_id")
        .and_then(|id| id.parse::<Uuid>().ok())
    {
        Some(id) => id,
        None => {
            warn!("Succeeded intent {} without a booking_id", intent.id);
            return StatusCode::OK;
        }
    };

    let payment = NewPayment {
        booking_id,
        amount: intent.amount,
        currency: intent.currency.clone(),
        provider_intent_id: intent.id.clone(),
        status: intent.status.clone(),
        receipt_url: intent.receipt_url(),
    };

    match state.payment_repository.confirm_booking(&payment).await {
        Ok(ConfirmOutcome::Confirmed(payment)) => {
            info!("Booking {} confirmed by intent {}", booking_id, intent.id);
            finish_confirmation(state, booking_id, payment.receipt_url).await;
            StatusCode::OK
        }
        Ok(ConfirmOutcome::AlreadyProcessed) => StatusCode::OK,
        Ok(ConfirmOutcome::InvalidState(status)) => {
            warn!(
                "Succeeded intent {} for booking {} in state {}, not confirming",
                intent.id, booking_id, status
            );
            StatusCode::OK
        }
        Err(e) => {
            error!("Failed to record payment: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Post-commit side effects of a confirmation: drop the owner's dashboard
/// cache and send the invoice email. The email is fire-and-forget.
async fn finish_confirmation(state: AppState, booking_id: Uuid, receipt_url: Option<String>) {
    let booking = match state.booking_repository.find_by_id(booking_id).await {
        Ok(Some(booking)) => booking,
        Ok(None) => {
            warn!("Confirmed booking {} vanished before notification", booking_id);
            return;
        }
        Err(e) => {
            error!("Failed to reload booking {}: {}", booking_id, e);
            return;
        }
    };

    state.invalidate_dashboard_cache(booking.user_id).await;

    let Some(email_client) = state.email_client.clone() else {
        return;
    };

    let user = match state.user_repository.find_by_id(booking.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            error!("Failed to load user for invoice: {}", e);
            return;
        }
    };

    let service_title = match state.service_repository.find_by_id(booking.service_id).await {
        Ok(Some(service)) => service.title,
        Ok(None) => return,
        Err(e) => {
            error!("Failed to load service for invoice: {}", e);
            return;
        }
    };

    let invoice = InvoiceData {
        user_email: user.email,
        user_name: user.name,
        booking_id: booking.id.to_string(),
        service_title,
        total_cost: booking.total_cost,
        duration_value: booking.duration_value,
        duration_unit: booking.duration_unit.as_str().to_string(),
        receipt_url,
        booking_date: booking.created_at,
    };

    tokio::spawn(async move {
        if let Err(e) = email_client.send_booking_invoice(&invoice).await {
            warn!("Failed to send invoice email: {}", e);
        }
    });
}
