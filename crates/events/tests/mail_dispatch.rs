//! Mail failures are written to `mail_logs` and never surface as errors.

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use learnhub_db::repositories::MailLogRepo;
use learnhub_events::{EmailConfig, EmailDelivery, MailDispatcher, MailRenderer, TemplatedMail};

fn config() -> EmailConfig {
    EmailConfig {
        smtp_host: "localhost".to_string(),
        smtp_port: 2525,
        from_address: "noreply@learnhub.local".to_string(),
        smtp_user: None,
        smtp_password: None,
        template_dir: None,
    }
}

fn mail(email: &str) -> TemplatedMail {
    TemplatedMail {
        email: email.to_string(),
        subject: "Enrolled: CPR".to_string(),
        template: "course_enrolled.html".to_string(),
        context: json!({
            "display_name": "Sam",
            "title": "CPR",
            "site_name": "LearnHub",
            "link": "https://learn.example.org/courses/1",
        }),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_send_is_logged(pool: PgPool) {
    let delivery = EmailDelivery::new(config(), MailRenderer::new().unwrap());
    let dispatcher = MailDispatcher::new(pool.clone(), Some(Arc::new(delivery)));
    assert!(dispatcher.is_enabled());

    let sent = dispatcher.dispatch(&mail("not-an-email")).await;
    assert!(!sent);

    let logs = MailLogRepo::list(&pool, 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].to_email, "not-an-email");
    assert_eq!(logs[0].template, "course_enrolled.html");
    assert_eq!(logs[0].context["title"], "CPR");
    assert!(logs[0].error.contains("address"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_disabled_dispatcher_skips_without_logging(pool: PgPool) {
    let dispatcher = MailDispatcher::new(pool.clone(), None);
    assert!(!dispatcher.is_enabled());

    assert!(!dispatcher.dispatch(&mail("sam@example.org")).await);
    assert!(MailLogRepo::list(&pool, 10).await.unwrap().is_empty());
}
