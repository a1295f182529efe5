use crate::{
    error::{GeminiError, Result},
    gemini::ImageClient,
    logger,
    models::{BatchResult, GenerationIntent, ImageReference, ModelTier, ResolvedImage},
};
use chrono::Utc;
use futures::future::join_all;
use std::time::Duration;
use uuid::Uuid;

const ALL_FAILED_FALLBACK: &str = "all image generations failed, check the settings or API key";

impl ImageClient {
    /// Dispatches `intent.requested_count` independent generations at once and
    /// waits for every one of them. Partial failure still yields `Ok`; only a
    /// batch with zero successes is an error, carrying the first failure's
    /// message in dispatch order.
    pub async fn run_batch(&self, intent: &GenerationIntent) -> Result<BatchResult> {
        if intent.requested_count == 0 {
            return Err(GeminiError::InvalidIntent(
                "requested count must be at least 1".into(),
            ));
        }

        // Configuration and intent problems fail the call, not every attempt.
        let builder = self.builder()?;
        let tier = intent.tier()?;
        builder.build(intent)?;

        let dropped_reference_images = intent.excess_reference_images(tier);
        if dropped_reference_images > 0 {
            log::warn!(
                "{} allows {} reference images, dropping the last {}",
                tier.display_name(),
                tier.max_reference_images(),
                dropped_reference_images
            );
        }

        let batch_id = Uuid::new_v4().to_string();
        log::info!(
            "Batch {} dispatching {} request(s) to {}",
            batch_id,
            intent.requested_count,
            tier.backend_id()
        );

        let timer = logger::timer(&format!("batch {}", batch_id));
        let attempts = (0..intent.requested_count).map(move |_| async move {
            let request = builder.build(intent)?;
            self.attempt(&request).await
        });
        let outcomes = join_all(attempts).await;
        let elapsed = timer.finish();

        let mut result = aggregate(intent, tier, outcomes, elapsed)?;
        result.batch_id = batch_id;
        result.dropped_reference_images = dropped_reference_images;
        log::info!("Batch {}: {}", result.batch_id, result.summary());
        Ok(result)
    }
}

/// Folds settled attempts, in dispatch order, into one batch result.
pub(crate) fn aggregate(
    intent: &GenerationIntent,
    tier: ModelTier,
    outcomes: Vec<Result<ImageReference>>,
    elapsed: Duration,
) -> Result<BatchResult> {
    let created_at = Utc::now();
    let requested_count = outcomes.len();
    let mut successes = Vec::new();
    let mut failure_count = 0;
    let mut first_failure_message = None;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(image) => successes.push(ResolvedImage {
                id: Uuid::new_v4().to_string(),
                image,
                source_prompt: intent.prompt.clone(),
                model_name: tier.display_name().to_string(),
                model_tier: tier,
                elapsed,
                created_at,
            }),
            Err(err) => {
                log::warn!("Attempt {}/{} failed: {}", index + 1, requested_count, err);
                failure_count += 1;
                first_failure_message.get_or_insert_with(|| err.to_string());
            }
        }
    }

    if successes.is_empty() {
        return Err(GeminiError::BatchFailed {
            requested: requested_count,
            message: first_failure_message.unwrap_or_else(|| ALL_FAILED_FALLBACK.to_string()),
        });
    }

    Ok(BatchResult {
        batch_id: String::new(),
        requested_count,
        successes,
        failure_count,
        first_failure_message,
        elapsed,
        dropped_reference_images: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;
    use crate::error::{ResolutionError, TransportError};
    use crate::models::ReferenceImage;
    use crate::transport::testing::{ok, Scripted, ScriptedSender};
    use crate::transport::Transport;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn client(sender: Arc<ScriptedSender>) -> ImageClient {
        let config = GeminiConfig::new()
            .with_base_url("https://api.example.test")
            .with_api_key("key");
        ImageClient::new(Arc::new(config), Transport::new(sender))
    }

    fn image(data: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [
            { "inline_data": { "mime_type": "image/png", "data": data } }
        ] } }] })
    }

    fn server_error(message: &str) -> Scripted {
        Scripted::Reply(500, json!({ "error": { "message": message } }).to_string())
    }

    #[tokio::test]
    async fn test_partial_success_keeps_successes_in_order() {
        let sender = ScriptedSender::new(vec![
            ok(image("A")),
            ok(image("B")),
            server_error("overloaded"),
            ok(image("D")),
        ]);
        let intent = GenerationIntent::new("a fox", "nano").with_count(4);
        let result = client(sender.clone()).run_batch(&intent).await.unwrap();

        assert_eq!(sender.calls(), 4);
        assert_eq!(result.success_count(), 3);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.summary(), "3 succeeded, 1 failed");
        assert!(result.is_partial());
        assert_eq!(
            result.first_failure_message.as_deref(),
            Some("server error (500): overloaded")
        );
        let data: Vec<String> = result.successes.iter().map(|s| s.image.to_url()).collect();
        assert_eq!(
            data,
            vec![
                "data:image/png;base64,A",
                "data:image/png;base64,B",
                "data:image/png;base64,D"
            ]
        );
    }

    #[tokio::test]
    async fn test_elapsed_is_shared_by_the_whole_batch() {
        let sender = ScriptedSender::new(vec![ok(image("A")), ok(image("B"))]);
        let intent = GenerationIntent::new("a fox", "pro").with_count(2);
        let result = client(sender).run_batch(&intent).await.unwrap();

        assert!(!result.batch_id.is_empty());
        for success in &result.successes {
            assert_eq!(success.elapsed, result.elapsed);
            assert_eq!(success.model_name, "Nano Banana Pro");
            assert_eq!(success.source_prompt, "a fox");
        }
        assert_ne!(result.successes[0].id, result.successes[1].id);
    }

    #[tokio::test]
    async fn test_total_failure_reports_first_failure() {
        let sender = ScriptedSender::new(vec![
            ok(json!({ "candidates": [] })),
            server_error("second"),
        ]);
        let intent = GenerationIntent::new("a fox", "nano").with_count(2);

        match client(sender).run_batch(&intent).await.unwrap_err() {
            GeminiError::BatchFailed { requested, message } => {
                assert_eq!(requested, 2);
                assert_eq!(message, "received empty response: no candidates in response");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_dispatch() {
        let sender = ScriptedSender::new(vec![]);
        let client = ImageClient::new(
            Arc::new(GeminiConfig::new().with_base_url("https://api.example.test")),
            Transport::new(sender.clone()),
        );
        let intent = GenerationIntent::new("a fox", "nano").with_count(3);

        assert!(client.run_batch(&intent).await.unwrap_err().is_config());
        assert_eq!(sender.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_intents_are_rejected_up_front() {
        let sender = ScriptedSender::new(vec![]);
        let client = client(sender.clone());

        let zero = GenerationIntent::new("a fox", "nano").with_count(0);
        assert!(matches!(
            client.run_batch(&zero).await.unwrap_err(),
            GeminiError::InvalidIntent(_)
        ));
        let unknown = GenerationIntent::new("a fox", "mega").with_count(2);
        assert!(client.run_batch(&unknown).await.unwrap_err().is_config());
        assert_eq!(sender.calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_reference_images_are_reported() {
        let sender = ScriptedSender::new(vec![ok(image("A"))]);
        let mut intent = GenerationIntent::new("blend", "nano");
        for _ in 0..5 {
            intent = intent.with_reference_image(ReferenceImage::new("image/png", "AA=="));
        }
        let result = client(sender.clone()).run_batch(&intent).await.unwrap();

        assert_eq!(result.dropped_reference_images, 1);
        let parts = sender.requests()[0].body["contents"][0]["parts"].clone();
        assert_eq!(parts.as_array().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_back_off_concurrently() {
        let rate_limited = || Scripted::Reply(429, "{}".into());
        let sender = ScriptedSender::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            ok(image("A")),
            ok(image("B")),
            ok(image("C")),
        ]);
        let intent = GenerationIntent::new("a fox", "nano").with_count(3);

        let start = tokio::time::Instant::now();
        let result = client(sender.clone()).run_batch(&intent).await.unwrap();
        let waited = start.elapsed();

        assert_eq!(result.success_count(), 3);
        assert_eq!(sender.calls(), 6);
        // One shared 1s backoff; sequential attempts would take 3s.
        assert!(waited >= Duration::from_millis(1000));
        assert!(waited < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_does_not_block_siblings() {
        let sender = ScriptedSender::new(vec![ok(image("A")), Scripted::Hang, ok(image("C"))]);
        let config = GeminiConfig::new()
            .with_base_url("https://api.example.test")
            .with_api_key("key")
            .with_timeouts(Duration::from_secs(10), Duration::from_secs(10));
        let client = ImageClient::new(Arc::new(config), Transport::new(sender.clone()));
        let intent = GenerationIntent::new("a fox", "nano").with_count(3);

        let start = tokio::time::Instant::now();
        let result = client.run_batch(&intent).await.unwrap();
        let waited = start.elapsed();

        assert_eq!(result.summary(), "2 succeeded, 1 failed");
        assert_eq!(
            result.first_failure_message.as_deref(),
            Some("request timed out after 10s")
        );
        assert!(waited >= Duration::from_secs(10));
        assert!(waited < Duration::from_secs(11));
        assert_eq!(sender.calls(), 3);
    }

    #[test]
    fn test_aggregate_counts_always_add_up() {
        let intent = GenerationIntent::new("p", "nano");
        let ok_image = || -> Result<ImageReference> { Ok(ImageReference::Remote { url: "https://x/y.png".into() }) };
        let failure = || -> Result<ImageReference> {
            Err(ResolutionError::TruncatedResponse.into())
        };
        let network = || -> Result<ImageReference> {
            Err(TransportError::NetworkError("reset".into()).into())
        };

        let cases: Vec<Vec<Result<ImageReference>>> = vec![
            vec![ok_image()],
            vec![ok_image(), failure()],
            vec![failure(), network(), ok_image(), ok_image()],
            vec![network(), ok_image()],
        ];
        for outcomes in cases {
            let requested = outcomes.len();
            let result =
                aggregate(&intent, ModelTier::Standard, outcomes, Duration::from_secs(1)).unwrap();
            assert_eq!(result.success_count() + result.failure_count, requested);
            assert_eq!(result.requested_count, requested);
        }
    }

    #[test]
    fn test_aggregate_all_failed_uses_first_message() {
        let intent = GenerationIntent::new("p", "nano");
        let outcomes = vec![
            Err(GeminiError::from(TransportError::Timeout { timeout_ms: 200_000 })),
            Err(GeminiError::from(ResolutionError::TruncatedResponse)),
        ];
        match aggregate(&intent, ModelTier::Standard, outcomes, Duration::ZERO).unwrap_err() {
            GeminiError::BatchFailed { requested, message } => {
                assert_eq!(requested, 2);
                assert_eq!(message, "request timed out after 200s");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
