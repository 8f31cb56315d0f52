//! Demo handlers for the job types a typical web app pushes off the
//! request path: emails, in-app notifications and outbound webhooks.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use courier_core::error::{CourierError, HandlerError};
use courier_core::job::{CourierJob, JobInfo, JobPriority};
use courier_runtime::{EnqueueOptions, JobQueue};

/// Payload of an `email` job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailArgs {
    pub to: String,
    #[serde(default)]
    pub subject: String,
}

/// Sends (logs) a transactional email.
pub struct SendEmail;

impl CourierJob for SendEmail {
    type Args = EmailArgs;

    fn info() -> JobInfo {
        JobInfo {
            name: "email",
            priority: JobPriority::Medium,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    fn execute(args: Self::Args) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>> {
        Box::pin(async move {
            if !args.to.contains('@') {
                return Err(CourierError::handler(format!(
                    "invalid recipient '{}'",
                    args.to
                )));
            }
            tracing::info!(to = %args.to, subject = %args.subject, "Sending email");
            Ok(())
        })
    }
}

/// Register the demo handlers on a queue.
pub fn register_handlers(queue: &JobQueue, http: reqwest::Client) {
    queue.register::<SendEmail>();

    queue.register_fn("notification", deliver_notification);

    queue.register_fn("webhook", move |data: Value| {
        let http = http.clone();
        async move { deliver_webhook(&http, data).await }
    });
}

async fn deliver_notification(data: Value) -> Result<(), HandlerError> {
    let user = data
        .get("user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| CourierError::handler("notification requires a user_id"))?;
    let message = data.get("message").and_then(Value::as_str).unwrap_or("");
    tracing::info!(user_id = %user, message = %message, "Delivering notification");
    Ok(())
}

async fn deliver_webhook(http: &reqwest::Client, data: Value) -> Result<(), HandlerError> {
    let url = data
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| CourierError::handler("webhook requires a url"))?;
    let body = data.get("body").cloned().unwrap_or(Value::Null);

    let response = http
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| CourierError::handler(format!("webhook request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CourierError::handler(format!(
            "webhook returned HTTP {}",
            status.as_u16()
        )));
    }

    tracing::info!(url = %url, status = status.as_u16(), "Webhook delivered");
    Ok(())
}

/// Enqueue `count` demo jobs with a spread of types and priorities.
pub fn seed_jobs(queue: &JobQueue, count: usize, webhook_url: Option<&str>) -> usize {
    let priorities = [JobPriority::Low, JobPriority::Medium, JobPriority::High];

    for i in 0..count {
        let options = EnqueueOptions::new().with_priority(priorities[i % priorities.len()]);
        match (i % 3, webhook_url) {
            (0, _) => queue.enqueue_with(
                "email",
                serde_json::json!({ "to": format!("user{}@example.com", i), "subject": "Welcome" }),
                options,
            ),
            (1, Some(url)) => queue.enqueue_with(
                "webhook",
                serde_json::json!({ "url": url, "body": { "event": "demo", "seq": i } }),
                options,
            ),
            _ => queue.enqueue_with(
                "notification",
                serde_json::json!({ "user_id": format!("user-{}", i), "message": "Hello" }),
                options.with_delay(Duration::from_secs(10)),
            ),
        };
    }

    count
}

#[cfg(test)]
mod tests {
    use courier_core::config::QueueConfig;

    use super::*;

    fn queue() -> JobQueue {
        let queue = JobQueue::new(QueueConfig::default());
        register_handlers(&queue, reqwest::Client::new());
        queue
    }

    #[test]
    fn test_handlers_registered() {
        let queue = queue();
        assert!(queue.has_handler("email"));
        assert!(queue.has_handler("notification"));
        assert!(queue.has_handler("webhook"));
    }

    #[tokio::test]
    async fn test_email_and_notification_succeed() {
        let queue = queue();
        queue.enqueue("email", serde_json::json!({ "to": "a@x.com" }));
        queue.enqueue(
            "notification",
            serde_json::json!({ "user_id": "u1", "message": "hi" }),
        );

        let report = queue.tick().await;
        assert_eq!(report.succeeded, 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payloads_fail() {
        let queue = queue();
        let email = queue.enqueue("email", serde_json::json!({ "to": "nobody" }));
        let webhook = queue.enqueue("webhook", serde_json::json!({}));

        let report = queue.tick().await;
        assert_eq!(report.retried, 2);
        assert_eq!(
            queue.get(email).unwrap().error.as_deref(),
            Some("invalid recipient 'nobody'")
        );
        assert_eq!(
            queue.get(webhook).unwrap().error.as_deref(),
            Some("webhook requires a url")
        );
    }

    #[test]
    fn test_seed_jobs_without_webhook() {
        let queue = JobQueue::new(QueueConfig::default());
        assert_eq!(seed_jobs(&queue, 6, None), 6);

        let stats = queue.stats();
        assert_eq!(stats.pending, 6);
        assert_eq!(stats.by_type.get("email"), Some(&2));
        assert_eq!(stats.by_type.get("notification"), Some(&4));
        assert!(stats.by_type.get("webhook").is_none());
    }

    #[test]
    fn test_seed_jobs_with_webhook() {
        let queue = JobQueue::new(QueueConfig::default());
        seed_jobs(&queue, 3, Some("http://127.0.0.1:9/hook"));

        let stats = queue.stats();
        assert_eq!(stats.by_type.get("webhook"), Some(&1));
    }
}
