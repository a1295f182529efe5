use rgenimage::{GeminiClient, GeminiConfig, GenerationIntent, ImageReference, ModelTier};
use std::env;
use std::fs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded successfully"),
        Err(_) => log::warn!("⚠️  No .env file found, using system environment variables"),
    }

    rgenimage::logger::init_with_config(rgenimage::logger::LoggerConfig::development())?;

    let mut args = env::args().skip(1);
    let prompt = args
        .next()
        .unwrap_or_else(|| "A serene mountain lake at sunset, digital art".to_string());
    let model = args.next().unwrap_or_else(|| ModelTier::Standard.to_string());
    let count: usize = match args.next() {
        Some(count) => count.parse()?,
        None => 2,
    };
    let optimize = env::var("GEMINI_OPTIMIZE_PROMPT").map_or(false, |v| v == "1" || v == "true");

    let config = GeminiConfig::from_env();
    rgenimage::logger::log_config_info(&config);

    log::info!("🖼️  Available image models:");
    for tier in ModelTier::ALL {
        let info = tier.info();
        log::info!(
            "  {} - {} ({}, up to {} reference images)",
            tier,
            info.name,
            info.backend_id,
            info.max_reference_images
        );
    }

    let client = GeminiClient::new(config);
    let intent = GenerationIntent::new(prompt, model).with_count(count);

    log::info!("🎨 Generating {} image(s) for: {}", count, intent.prompt);
    let result = if optimize {
        client.optimize_and_generate(&intent).await
    } else {
        client.generate_batch(&intent).await
    };

    let batch = match result {
        Ok(batch) => batch,
        Err(e) => {
            log::error!("❌ Batch failed: {}", e);
            if e.is_config() {
                log::warn!("💡 Set GEMINI_BASE_URL and GEMINI_API_KEY");
            }
            return Err(e.into());
        }
    };

    log::info!("✅ {} in {:.2}s", batch.summary(), batch.elapsed.as_secs_f64());
    if let Some(message) = &batch.first_failure_message {
        log::warn!("First failure: {}", message);
    }

    for (index, resolved) in batch.successes.iter().enumerate() {
        match &resolved.image {
            ImageReference::Inline { mime_type, .. } => {
                let extension = match mime_type.as_str() {
                    "image/jpeg" => "jpg",
                    "image/webp" => "webp",
                    _ => "png",
                };
                let filename = format!("generated_{}_{}.{}", batch.batch_id, index + 1, extension);
                if let Some(bytes) = resolved.image.inline_bytes()? {
                    fs::write(&filename, bytes)?;
                }
                log::info!("💾 Saved {} ({})", filename, resolved.elapsed_display());
            }
            ImageReference::Remote { url } => log::info!("🔗 Image {}: {}", index + 1, url),
        }
    }

    Ok(())
}
