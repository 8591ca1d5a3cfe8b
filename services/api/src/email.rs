//! Transactional email over the Resend API
//!
//! Only one message is sent: the booking invoice, after a payment is
//! confirmed. Sending is fire-and-forget; failures are logged and never
//! retried, and never fail the webhook that triggered them.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const FROM_ADDRESS: &str = "Care.xyz <billing@care.xyz>";

/// Everything the invoice template needs
#[derive(Debug, Clone)]
pub struct InvoiceData {
    pub user_email: String,
    pub user_name: String,
    pub booking_id: String,
    pub service_title: String,
    /// Whole BDT
    pub total_cost: i64,
    pub duration_value: i32,
    pub duration_unit: String,
    pub receipt_url: Option<String>,
    pub booking_date: DateTime<Utc>,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

/// Resend API client
#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    api_key: String,
}

impl EmailClient {
    /// Create a new email client
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Send the booking invoice email
    pub async fn send_booking_invoice(&self, data: &InvoiceData) -> Result<()> {
        let subject = format!("Invoice for your booking: {}", data.service_title);
        let html = render_invoice(data);

        let request = SendEmailRequest {
            from: FROM_ADDRESS,
            to: [data.user_email.as_str()],
            subject,
            html,
        };

        let response = self
            .http
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Resend returned {}: {}", status, body));
        }

        info!("Invoice email sent for booking {}", data.booking_id);
        Ok(())
    }
}

fn render_invoice(data: &InvoiceData) -> String {
    let receipt_line = match data.receipt_url.as_deref() {
        Some(url) => format!(
            r#"<p>You can view your payment receipt <a href="{}" target="_blank">here</a>.</p>"#,
            url
        ),
        None => String::new(),
    };

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #e0e0e0; border-radius: 8px;">
      <h2 style="color: #333;">Thank you for your booking, {name}!</h2>
      <p>Your booking for <strong>{service}</strong> has been confirmed.</p>

      <div style="background-color: #f9f9f9; padding: 15px; border-radius: 4px; margin: 20px 0;">
        <h3 style="margin-top: 0;">Booking Details</h3>
        <p><strong>Booking ID:</strong> {booking_id}</p>
        <p><strong>Date:</strong> {date}</p>
        <p><strong>Duration:</strong> {duration_value} {duration_unit}(s)</p>
        <p><strong>Total Cost:</strong> BDT {total_cost}</p>
      </div>

      {receipt_line}

      <p>If you have any questions, please contact our support team.</p>
      <p style="font-size: 12px; color: #888; margin-top: 30px;">Care.xyz - Caregiving Services in Bangladesh</p>
    </div>"#,
        name = data.user_name,
        service = data.service_title,
        booking_id = data.booking_id,
        date = data.booking_date.format("%d %b %Y"),
        duration_value = data.duration_value,
        duration_unit = data.duration_unit.to_lowercase(),
        total_cost = data.total_cost,
        receipt_line = receipt_line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(receipt_url: Option<String>) -> InvoiceData {
        InvoiceData {
            user_email: "user@care.xyz".to_string(),
            user_name: "Fatema Begum".to_string(),
            booking_id: "7e57d004-2b97-0e7a-b45f-5387367791cd".to_string(),
            service_title: "Professional Nursing Care".to_string(),
            total_cost: 1500,
            duration_value: 3,
            duration_unit: "HOUR".to_string(),
            receipt_url,
            booking_date: Utc::now(),
        }
    }

    #[test]
    fn invoice_renders_booking_details() {
        let html = render_invoice(&invoice(None));

        assert!(html.contains("Fatema Begum"));
        assert!(html.contains("Professional Nursing Care"));
        assert!(html.contains("BDT 1500"));
        assert!(html.contains("3 hour(s)"));
        assert!(!html.contains("receipt"));
    }

    #[test]
    fn invoice_links_the_receipt_when_present() {
        let html = render_invoice(&invoice(Some(
            "https://pay.stripe.com/receipts/x".to_string(),
        )));

        assert!(html.contains("https://pay.stripe.com/receipts/x"));
    }
}
