//! Reader notifications
//!
//! Circulation actions notify readers after their transaction commits. Those
//! notifications are best-effort: a failure is logged and never undoes the
//! action. Only the explicit reminder endpoint reports a delivery failure.

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::reader::Reader,
};

/// A message addressed to one reader
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub reader_name: String,
    pub email: Option<String>,
    pub subject: String,
    pub body: String,
}

impl Notice {
    fn for_reader(reader: &Reader, subject: String, body: String) -> Self {
        Self {
            reader_name: reader.full_name.clone(),
            email: reader.email.clone(),
            subject,
            body,
        }
    }

    pub fn reservation_fulfilled(reader: &Reader, title: &str, due_date: NaiveDate) -> Self {
        Self::for_reader(
            reader,
            format!("Sách \"{}\" đã sẵn sàng", title),
            format!(
                "Xin chào {},\n\nYêu cầu đặt trước sách \"{}\" đã được đáp ứng. Hạn trả: {}.\n",
                reader.full_name,
                title,
                due_date.format("%d/%m/%Y")
            ),
        )
    }

    pub fn reservation_expired(reader: &Reader, title: &str) -> Self {
        Self::for_reader(
            reader,
            format!("Đặt trước sách \"{}\" đã hết hạn", title),
            format!(
                "Xin chào {},\n\nYêu cầu đặt trước sách \"{}\" đã hết hạn.\n",
                reader.full_name, title
            ),
        )
    }

    /// Reminder for a loan, worded by how far it is from its due date
    pub fn loan_reminder(
        reader: &Reader,
        title: &str,
        due_date: NaiveDate,
        days_overdue: i64,
        days_until_due: i64,
        custom_message: Option<&str>,
    ) -> Self {
        let status_line = if days_overdue > 0 {
            format!("Sách đã quá hạn {} ngày.", days_overdue)
        } else if days_until_due > 0 {
            format!("Sách sẽ đến hạn trả sau {} ngày.", days_until_due)
        } else {
            "Hôm nay là hạn trả sách.".to_string()
        };
        let mut body = format!(
            "Xin chào {},\n\nSách \"{}\" có hạn trả {}. {}\n",
            reader.full_name,
            title,
            due_date.format("%d/%m/%Y"),
            status_line
        );
        if let Some(extra) = custom_message.map(str::trim).filter(|m| !m.is_empty()) {
            body.push('\n');
            body.push_str(extra);
            body.push('\n');
        }
        Self::for_reader(reader, format!("Nhắc trả sách \"{}\"", title), body)
    }
}

/// Delivery channel for reader notices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReaderNotifier: Send + Sync {
    async fn send(&self, notice: &Notice) -> AppResult<()>;
}

/// Send a notice and swallow any failure. Returns whether it was delivered.
pub async fn notify_best_effort(notifier: &dyn ReaderNotifier, notice: &Notice) -> bool {
    match notifier.send(notice).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                reader = %notice.reader_name,
                subject = %notice.subject,
                error = %e,
                "Reader notification failed"
            );
            false
        }
    }
}

/// SMTP delivery
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, notice: &Notice) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Thư viện");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;
        let to_mailbox = Mailbox::from_str(&format!("{} <{}>", notice.reader_name, to))
            .map_err(|e| AppError::Notification(format!("Invalid reader address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(notice.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body.clone())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };
        Ok(builder.build())
    }
}

#[async_trait]
impl ReaderNotifier for EmailNotifier {
    async fn send(&self, notice: &Notice) -> AppResult<()> {
        let to = notice
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AppError::Notification(format!("Reader {} has no email address", notice.reader_name))
            })?;

        let message = self.build_message(to, notice)?;
        let mailer = self.transport()?;

        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Notification(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %to, subject = %notice.subject, "Reader notification sent");
        Ok(())
    }
}

/// Used when email is disabled: notices only reach the log
pub struct LogNotifier;

#[async_trait]
impl ReaderNotifier for LogNotifier {
    async fn send(&self, notice: &Notice) -> AppResult<()> {
        tracing::info!(
            reader = %notice.reader_name,
            subject = %notice.subject,
            "Email disabled, notification not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn reader(email: Option<&str>) -> Reader {
        Reader {
            id: Uuid::new_v4(),
            full_name: "Lê Minh Châu".to_string(),
            card_number: "HS0100".to_string(),
            email: email.map(str::to_string),
            phone: None,
            reader_type_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_reminder_wording() {
        let r = reader(Some("chau@example.com"));
        let late = Notice::loan_reminder(&r, "Số đỏ", due(), 4, 0, None);
        assert!(late.body.contains("quá hạn 4 ngày"));
        assert!(late.body.contains("15/01/2024"));

        let soon = Notice::loan_reminder(&r, "Số đỏ", due(), 0, 2, Some("  Vui lòng trả sớm.  "));
        assert!(soon.body.contains("sau 2 ngày"));
        assert!(soon.body.ends_with("Vui lòng trả sớm.\n"));

        let today = Notice::loan_reminder(&r, "Số đỏ", due(), 0, 0, Some(" "));
        assert!(today.body.contains("Hôm nay"));
    }

    #[test]
    fn test_best_effort_swallows_failure() {
        let mut mock = MockReaderNotifier::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Err(AppError::Notification("smtp down".to_string())));

        let notice = Notice::reservation_expired(&reader(None), "Số đỏ");
        let delivered = tokio_test::block_on(notify_best_effort(&mock, &notice));
        assert!(!delivered);
    }

    #[test]
    fn test_best_effort_reports_delivery() {
        let mut mock = MockReaderNotifier::new();
        mock.expect_send()
            .withf(|n| n.subject.contains("sẵn sàng"))
            .times(1)
            .returning(|_| Ok(()));

        let notice = Notice::reservation_fulfilled(&reader(Some("a@b.vn")), "Số đỏ", due());
        assert!(tokio_test::block_on(notify_best_effort(&mock, &notice)));
    }

    #[test]
    fn test_email_notifier_requires_address() {
        let notifier = EmailNotifier::new(EmailConfig::default());
        let notice = Notice::reservation_expired(&reader(None), "Số đỏ");
        let err = tokio_test::block_on(notifier.send(&notice)).unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));
    }

    #[test]
    fn test_log_notifier_always_succeeds() {
        let notice = Notice::reservation_expired(&reader(None), "Số đỏ");
        assert!(tokio_test::block_on(LogNotifier.send(&notice)).is_ok());
    }
}
