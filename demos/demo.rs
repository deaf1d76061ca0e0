//! # Demo: three conversations over two browser tabs
//!
//! A fake browser with two tabs serves three conversations. Watch the log for
//! affinity hits, overflow, hand-offs and a timeout.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example demo --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use slotvisor::{
    BindError, BindOutcome, Config, Dispatcher, LogWriter, SessionBinder, SessionKey, Subscribe,
    Task, TaskError, TaskFn,
};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

struct Tab {
    id: usize,
    url: Mutex<String>,
}

#[derive(Default)]
struct Browser {
    tabs: AtomicUsize,
}

#[async_trait]
impl SessionBinder for Browser {
    type Handle = Tab;

    async fn create(&self) -> Result<Tab, BindError> {
        let id = self.tabs.fetch_add(1, Ordering::Relaxed);
        Ok(Tab {
            id,
            url: Mutex::new("about:blank".into()),
        })
    }

    async fn open(&self, tab: &Tab, session: &SessionKey) -> Result<BindOutcome, BindError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        *tab.url.lock().await = format!("/messages/t/{session}");
        // The numeric thread id also has a vanity form.
        if session.as_str() == "100012345" {
            return Ok(BindOutcome::aliased("alice.smith"));
        }
        Ok(BindOutcome::unchanged())
    }

    async fn close(&self, tab: &Tab) {
        tracing::info!(tab = tab.id, "tab closed");
    }
}

fn send(text: &'static str, typing: Duration) -> impl Task<Tab, Output = String> {
    TaskFn::new("send", move |tab: Arc<Tab>| async move {
        tokio::time::sleep(typing).await;
        let url = tab.url.lock().await.clone();
        Ok::<_, TaskError>(format!("tab {} {url}: {text}", tab.id))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config {
        worker_limit: 2,
        task_timeout: Duration::from_secs(1),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let dispatcher = Dispatcher::builder(cfg, Browser::default())
        .with_subscribers(subs)
        .build();

    let replies = vec![
        dispatcher.submit("100012345", send("hi alice", Duration::from_millis(300)))?,
        dispatcher.submit("200067890", send("hi bob", Duration::from_millis(300)))?,
        // Pool is full: carol waits in overflow until a tab drains.
        dispatcher.submit("300011111", send("hi carol", Duration::from_millis(100)))?,
        // Too slow: exceeds the task budget.
        dispatcher.submit("200067890", send("still typing", Duration::from_secs(3)))?,
    ];
    for reply in replies {
        match reply.await {
            Ok(line) => tracing::info!(%line, "sent"),
            Err(e) => tracing::warn!(error = %e, label = e.as_label(), "send failed"),
        }
    }

    // The vanity handle routes to the same conversation.
    let again = dispatcher.submit("alice.smith", send("again", Duration::from_millis(50)))?;
    let line = again.await?;
    tracing::info!(%line, "sent via alias");

    let snapshot = dispatcher.snapshot().await?;
    tracing::info!(?snapshot, "final state");
    dispatcher.shutdown().await?;
    Ok(())
}
