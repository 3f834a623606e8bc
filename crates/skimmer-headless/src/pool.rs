//! Browser pool management.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// One long-lived browser plus its event-handler task.
pub struct PooledBrowser {
    pub id: usize,
    browser: Mutex<Browser>,
    handler_task: tokio::task::JoinHandle<()>,
}

impl PooledBrowser {
    /// Launch a browser with the service's flag set: sandbox features
    /// off, images off, background throttling off, the automation
    /// fingerprint masked and a mock keychain.
    async fn launch(id: usize) -> Result<Self> {
        debug!(browser_id = id, "launching pooled browser");

        let config = BrowserConfig::builder()
            .window_size(1280, 800)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--blink-settings=imagesEnabled=false")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-backgrounding-occluded-windows")
            .arg("--disable-renderer-backgrounding")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--use-mock-keychain")
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .with_context(|| format!("failed to launch browser {}", id))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(browser_id = id, error = %e, "browser event error");
                }
            }
            debug!(browser_id = id, "browser event handler ended");
        });

        Ok(Self {
            id,
            browser: Mutex::new(browser),
            handler_task,
        })
    }

    /// Open a fresh page on this browser.
    ///
    /// The internal lock is held only for page creation; the returned
    /// [`Page`] is an independent handle.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let browser = self.browser.lock().await;
        browser
            .new_page(url)
            .await
            .with_context(|| format!("failed to open page on browser {}", self.id))
    }

    async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(browser_id = self.id, error = %e, "browser close failed");
        }
        self.handler_task.abort();
    }
}

struct PoolInner {
    idle_tx: mpsc::Sender<Arc<PooledBrowser>>,
    idle_rx: Mutex<mpsc::Receiver<Arc<PooledBrowser>>>,
    /// Every browser ever created, for shutdown.
    all: Vec<Arc<PooledBrowser>>,
    shut_down: AtomicBool,
    in_use: AtomicUsize,
}

/// Fixed-size pool of pre-launched browsers.
pub struct BrowserPool {
    inner: Arc<PoolInner>,
    capacity: usize,
}

impl BrowserPool {
    /// Launch `size` browsers up front. Fails if any launch fails;
    /// partially launched browsers are closed before returning.
    pub async fn new(size: usize) -> Result<Self> {
        let size = size.max(1);
        info!(size, "initializing browser pool");

        let mut all = Vec::with_capacity(size);
        for id in 0..size {
            match PooledBrowser::launch(id).await {
                Ok(browser) => all.push(Arc::new(browser)),
                Err(e) => {
                    for browser in &all {
                        browser.close().await;
                    }
                    return Err(e);
                }
            }
        }

        let (idle_tx, idle_rx) = mpsc::channel(size);
        for browser in &all {
            idle_tx
                .send(Arc::clone(browser))
                .await
                .map_err(|_| anyhow!("idle channel closed during pool init"))?;
        }

        info!(size, "browser pool ready");

        Ok(Self {
            inner: Arc::new(PoolInner {
                idle_tx,
                idle_rx: Mutex::new(idle_rx),
                all,
                shut_down: AtomicBool::new(false),
                in_use: AtomicUsize::new(0),
            }),
            capacity: size,
        })
    }

    /// Check out a browser, waiting until one is idle.
    pub async fn acquire(&self) -> Result<BrowserGuard> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(anyhow!("browser pool is shut down"));
        }

        let browser = {
            let mut idle_rx = self.inner.idle_rx.lock().await;
            idle_rx
                .recv()
                .await
                .ok_or_else(|| anyhow!("browser pool is shut down"))?
        };

        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        debug!(browser_id = browser.id, "browser checked out");

        Ok(BrowserGuard {
            browser: Some(browser),
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Relaxed)
    }

    /// Close every browser the pool ever created. Safe to call while
    /// guards are outstanding: their browsers close when the guards
    /// drop.
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down browser pool");

        // Drain idle browsers and close them; checked-out browsers are
        // closed by their guards observing the shutdown flag.
        let mut idle_rx = self.inner.idle_rx.lock().await;
        while let Ok(browser) = idle_rx.try_recv() {
            browser.close().await;
        }
    }
}

/// Checkout handle. Dropping it returns the browser to the pool, or
/// closes the browser if the pool has shut down in the meantime.
pub struct BrowserGuard {
    browser: Option<Arc<PooledBrowser>>,
    inner: Arc<PoolInner>,
}

impl BrowserGuard {
    pub fn browser(&self) -> &PooledBrowser {
        self.browser
            .as_ref()
            .expect("browser present until guard drop")
    }

    /// Open a fresh page on the checked-out browser.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        self.browser().new_page(url).await
    }
}

impl Drop for BrowserGuard {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        self.inner.in_use.fetch_sub(1, Ordering::Relaxed);

        if self.inner.shut_down.load(Ordering::Acquire) {
            tokio::spawn(async move { browser.close().await });
            return;
        }

        if let Err(e) = self.inner.idle_tx.try_send(browser) {
            // Channel capacity equals pool size, so this only happens
            // in a shutdown race; close the browser instead.
            let browser = match e {
                mpsc::error::TrySendError::Full(b) => b,
                mpsc::error::TrySendError::Closed(b) => b,
            };
            tokio::spawn(async move { browser.close().await });
        }
    }
}
