//! Outbound booking notifications.
//!
//! Delivery goes through the [`Mailer`] seam. The default [`LogMailer`]
//! only records messages through tracing; a real transport implements the
//! same trait. Dispatch runs in a spawned task and never reports back to
//! the request that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tutora_store::BookingDetails;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email sent (log transport)");
        debug!(body = %email.body, "Email body");
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    pub fn booking_confirmation(&self, details: &BookingDetails) -> OutgoingEmail {
        let b = &details.booking;
        let body = format!(
            "Hello {name},\n\n\
             Your class booking has been received.\n\n\
             Details:\n\
             - Subject: {subject}\n\
             - Date: {date}\n\
             - Time: {start} - {end}\n\
             - Duration: {duration} minutes\n\
             - Amount: ${amount:.2}\n\n\
             Meeting Link: {link}\n\n\
             Thank you for choosing Tutora!\n",
            name = details.student.name,
            subject = b.subject,
            date = b.date,
            start = b.start_time,
            end = b.end_time,
            duration = b.duration,
            amount = b.amount,
            link = b.meeting_link,
        );
        OutgoingEmail {
            from: self.from.clone(),
            to: details.student.email.clone(),
            subject: "Class Booking Confirmation".into(),
            body,
        }
    }

    pub fn teacher_notification(&self, details: &BookingDetails) -> OutgoingEmail {
        let b = &details.booking;
        let body = format!(
            "Hello {name},\n\n\
             You have a new class booking.\n\n\
             Details:\n\
             - Student: {student}\n\
             - Subject: {subject}\n\
             - Date: {date}\n\
             - Time: {start} - {end}\n\
             - Duration: {duration} minutes\n\n\
             Please confirm this booking in your dashboard.\n",
            name = details.teacher.name,
            student = details.student.name,
            subject = b.subject,
            date = b.date,
            start = b.start_time,
            end = b.end_time,
            duration = b.duration,
        );
        OutgoingEmail {
            from: self.from.clone(),
            to: details.teacher.email.clone(),
            subject: "New Class Booking".into(),
            body,
        }
    }

    /// Send the student confirmation and the teacher notification in the
    /// background. Each failure is logged on its own.
    pub fn dispatch_booking_created(&self, details: BookingDetails) -> JoinHandle<()> {
        let mails = [
            self.booking_confirmation(&details),
            self.teacher_notification(&details),
        ];
        let mailer = Arc::clone(&self.mailer);
        let booking = details.booking.id;

        tokio::spawn(async move {
            for mail in mails {
                let to = mail.to.clone();
                if let Err(e) = mailer.send(mail).await {
                    warn!(booking = %booking, to = %to, error = %e, "Email sending failed");
                }
            }
        })
    }
}
