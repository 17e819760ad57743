use std::sync::Arc;
use std::time::Duration;

use oxycheck::config::app_config::load_config;
use oxycheck::{CheckContext, Monitor, report};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

struct Target {
    label: String,
    monitor: Arc<Monitor>,
}

fn to_fixed_width(input: &str, width: usize) -> String {
    use unicode_truncate::UnicodeTruncateStr;

    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", report(&e));
            std::process::exit(1);
        }
    };
    let width = app_config.max_label_width;

    let mut targets = Vec::new();
    for target in &app_config.checker.targets {
        let label = to_fixed_width(target.label(), width);
        let monitor = target
            .to_monitor_config()
            .map_err(|e| report(&e))
            .and_then(|config| Monitor::new(config).map_err(|e| report(&e)));

        match monitor {
            Ok(monitor) => targets.push(Target {
                label,
                monitor: Arc::new(monitor),
            }),
            Err(e) => log::error!("[{label}] Skipping {}: {e}", target.url),
        }
    }

    if targets.is_empty() {
        log::warn!("No usable targets configured.");
        return;
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted, cancelling in-flight checks");
                shutdown.cancel();
            }
        });
    }

    loop {
        run_round(&targets, &shutdown).await;

        let Some(interval) = app_config.checker.polling_interval_seconds else {
            break;
        };
        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {}
            _ = shutdown.cancelled() => break,
        }
    }
}

async fn run_round(targets: &[Target], shutdown: &CancellationToken) {
    let mut handles = Vec::with_capacity(targets.len());

    for target in targets {
        let label = target.label.clone();
        let monitor = target.monitor.clone();
        let ctx = CheckContext::with_token(shutdown.child_token());

        handles.push(tokio::spawn(async move {
            match monitor.check(&ctx).await {
                Ok(result) => {
                    let marker = if monitor.is_up(result.status_code) {
                        "✅"
                    } else {
                        "❌"
                    };
                    println!("[{label}] {marker} {}\n{result}", result.url);
                }
                Err(e) => {
                    println!("[{label}] ❌ {}", report(&e));
                }
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Check task failed: {}", e);
        }
    }
}
