//! Command-line silence analysis.
//!
//! Usage: `cutline-analyze <video> [margin_seconds] [smart] [threshold_db]`
//!
//! `threshold_db` is the fixed cut level used when `smart` is false.
//!
//! Prints the analysis response as JSON on stdout. Logs go to stderr.

use anyhow::{bail, Context};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cutline_models::{AnalysisRequest, DEFAULT_SILENCE_MARGIN_SECS};
use cutline_worker::{AnalysisService, WorkerConfig};

fn parse_args(args: &[String]) -> anyhow::Result<AnalysisRequest> {
    let Some(video) = args.first() else {
        bail!("usage: cutline-analyze <video> [margin_seconds] [smart] [threshold_db]");
    };

    let margin = match args.get(1) {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("invalid margin '{raw}'"))?,
        None => DEFAULT_SILENCE_MARGIN_SECS,
    };

    let smart = match args.get(2).map(|s| s.to_lowercase()) {
        None => true,
        Some(flag) => match flag.as_str() {
            "true" | "1" | "yes" | "smart" => true,
            "false" | "0" | "no" | "fixed" => false,
            other => bail!("invalid smart flag '{other}'"),
        },
    };

    let threshold_db = match args.get(3) {
        Some(raw) => Some(
            raw.parse::<f32>()
                .with_context(|| format!("invalid threshold '{raw}'"))?,
        ),
        None => None,
    };

    let mut request = AnalysisRequest::new(video.clone()).with_margin(margin);
    request.smart_detection = smart;
    request.silence_threshold_db = threshold_db;
    Ok(request)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cutline_worker=info,cutline_media=info,cutline_storage=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = parse_args(&args)?;

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Ctrl-C cancels the analysis at the next checkpoint
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, cancelling analysis");
            let _ = cancel_tx.send(true);
        }
    });

    let service = AnalysisService::new(config);
    let response = service.handle(&request, Some(cancel_rx)).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults() {
        let request = parse_args(&args(&["talk.mp4"])).unwrap();
        assert_eq!(request.video_path, "talk.mp4");
        assert_eq!(request.silence_margin, DEFAULT_SILENCE_MARGIN_SECS);
        assert!(request.smart_detection);
    }

    #[test]
    fn test_parse_margin_and_mode() {
        let request = parse_args(&args(&["talk.mp4", "0.5", "false"])).unwrap();
        assert_eq!(request.silence_margin, 0.5);
        assert!(!request.smart_detection);
    }

    #[test]
    fn test_parse_errors() {
        tokio_test::assert_err!(parse_args(&[]));
        tokio_test::assert_err!(parse_args(&args(&["talk.mp4", "abc"])));
        tokio_test::assert_err!(parse_args(&args(&["talk.mp4", "0.2", "maybe"])));
        tokio_test::assert_err!(parse_args(&args(&["talk.mp4", "0.2", "false", "loud"])));
    }

    #[test]
    fn test_parse_fixed_threshold() {
        let request = parse_args(&args(&["talk.mp4", "0.3", "false", "-35"])).unwrap();
        assert!(!request.smart_detection);
        assert_eq!(request.silence_threshold_db, Some(-35.0));
        assert_eq!(request.fixed_threshold_db(), -35.0);
        tokio_test::assert_ok!(request.validate_request());
    }

    #[test]
    fn test_parse_without_threshold_uses_default() {
        let request = parse_args(&args(&["talk.mp4", "0.3", "false"])).unwrap();
        assert_eq!(request.silence_threshold_db, None);
        assert_eq!(request.fixed_threshold_db(), cutline_models::DEFAULT_FIXED_THRESHOLD_DB);
    }
}
