//! `poll`: one video-input node plus the admin server until Ctrl-C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use crate::admin_server::{start_admin_server, AdminState};
use crate::config::{Config, PollArgs};
use crate::error_handling::ProcessingStats;
use crate::fetch::RequestEngine;
use crate::initialization::init_client;
use crate::nodes::{NodeRegistry, VideoInputNode};
use crate::run::RunReport;

/// Samples the frame backend and prints every envelope as one JSON line.
///
/// Returns once Ctrl-C is received. Sampling failures only reach the log;
/// they are not counted in the report.
pub async fn run_poll(config: Config, args: PollArgs) -> Result<RunReport> {
    let started = Instant::now();
    let stats = Arc::new(ProcessingStats::new());
    let client = init_client().context("Failed to initialize HTTP client")?;
    let engine = RequestEngine::new(client, &config, Arc::clone(&stats));

    let (node, mut samples) =
        VideoInputNode::new(args.node_id.clone(), engine, args.to_settings(), &config.video_url);
    let node = Arc::new(node);
    let registry = NodeRegistry::new();
    registry.register(Arc::clone(&node));

    let admin_state = AdminState::new(registry.clone(), Arc::clone(&stats));
    let admin_port = args.admin_port;
    let admin = tokio::spawn(async move {
        if let Err(e) = start_admin_server(admin_port, admin_state).await {
            log::error!("{:#}", e);
        }
    });

    log::info!(
        "Video input {} ready ({}), sample url {}",
        node.id(),
        if node.is_active() { "active" } else { "inactive" },
        node.sample_url()
    );

    let mut report = RunReport::default();
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping video input {}", node.id());
                break;
            }
            sample = samples.recv() => {
                let Some(envelope) = sample else { break };
                let mut line = serde_json::to_string(&envelope)
                    .context("Failed to serialize response envelope")?;
                line.push('\n');
                stdout.write_all(line.as_bytes()).await.context("Failed to write to stdout")?;
                report.delivered += 1;
            }
        }
    }

    registry.remove(node.id());
    admin.abort();
    stats.log_summary();
    report.elapsed = started.elapsed();
    Ok(report)
}
