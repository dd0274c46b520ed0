//! `detect`: sends payloads to the detection backend one at a time.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::{Config, DetectArgs};
use crate::error_handling::ProcessingStats;
use crate::fetch::{Payload, RequestEngine, RequestMessage};
use crate::initialization::init_client;
use crate::nodes::{BusyGate, DetectionNode};
use crate::run::RunReport;

/// Posts `--payload`, or every non-empty stdin line, and prints each
/// detection output as one JSON line.
pub async fn run_detect(config: Config, args: DetectArgs) -> Result<RunReport> {
    let started = Instant::now();
    let stats = Arc::new(ProcessingStats::new());
    let client = init_client().context("Failed to initialize HTTP client")?;
    let engine = RequestEngine::new(client, &config, Arc::clone(&stats));
    let node = DetectionNode::new(
        engine,
        args.to_settings(),
        config.detection_url.clone(),
        BusyGate::process_wide(),
    );

    let mut report = RunReport::default();
    let mut stdout = tokio::io::stdout();

    if let Some(payload) = &args.payload {
        detect_one(&node, payload, &mut report, &mut stdout).await?;
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            detect_one(&node, &line, &mut report, &mut stdout).await?;
        }
    }

    node.close();
    stats.log_summary();
    report.elapsed = started.elapsed();
    Ok(report)
}

async fn detect_one(
    node: &DetectionNode,
    raw: &str,
    report: &mut RunReport,
    stdout: &mut tokio::io::Stdout,
) -> Result<()> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Skipping payload that is not JSON: {}", e);
            report.dropped += 1;
            return Ok(());
        }
    };
    let message = RequestMessage {
        payload: Some(Payload::from(value)),
        ..Default::default()
    };

    match node.handle(message).await {
        Ok(Some(output)) => {
            let mut line =
                serde_json::to_string(&output).context("Failed to serialize detection output")?;
            line.push('\n');
            stdout
                .write_all(line.as_bytes())
                .await
                .context("Failed to write to stdout")?;
            report.delivered += 1;
        }
        Ok(None) => report.dropped += 1,
        // Already logged by the node
        Err(_) => report.failed += 1,
    }
    Ok(())
}
