use livemerge_core::auth::TokenSource;
use livemerge_core::poller::{ChannelLookup, ChannelPoller};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Interval;
use tracing::{debug, info, warn};

use crate::SharedDashboard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollRequest {
    /// Every followed channel. Without `force`, resolved channels are skipped.
    All { force: bool },
    /// One channel, always re-resolved.
    Channel(String),
    /// Forget the poller state of an unfollowed channel.
    Cancel(String),
}

/// Sending side of the poll loop.
#[derive(Debug, Clone)]
pub struct PollHandle {
    tx: mpsc::Sender<PollRequest>,
}

impl PollHandle {
    pub fn channel() -> (Self, mpsc::Receiver<PollRequest>) {
        let (tx, rx) = mpsc::channel(32);
        (Self { tx }, rx)
    }

    pub fn request(&self, request: PollRequest) {
        if let Err(e) = self.tx.try_send(request) {
            warn!("Poll request dropped: {}", e);
        }
    }
}

/// Spawn the poll loop. With an `interval`, every followed channel is polled
/// right away and re-resolved on each tick, resolved ones included.
pub fn start<L>(
    dashboard: SharedDashboard,
    poller: Arc<ChannelPoller<L>>,
    interval: Option<Duration>,
) -> (PollHandle, tokio::task::JoinHandle<()>)
where
    L: ChannelLookup + 'static,
{
    let (handle, mut rx) = PollHandle::channel();
    let task = tokio::spawn(async move {
        let mut ticker = interval.map(tokio::time::interval);
        match interval {
            Some(every) => info!("Channel polling every {:?}", every),
            None => info!("Automatic channel polling disabled"),
        }

        loop {
            let request = tokio::select! {
                received = rx.recv() => match received {
                    Some(request) => request,
                    None => break,
                },
                // Ticks re-resolve everything so live status stays current.
                _ = tick(&mut ticker) => PollRequest::All { force: true },
            };
            run_request(&dashboard, &poller, request).await;
        }
        debug!("Poll loop stopped");
    });
    (handle, task)
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Carry out one request. Returns how many streams were merged.
pub async fn run_request<L: ChannelLookup>(
    dashboard: &SharedDashboard,
    poller: &ChannelPoller<L>,
    request: PollRequest,
) -> usize {
    let (channels, force) = match request {
        PollRequest::Cancel(channel_id) => {
            poller.cancel(&channel_id);
            return 0;
        }
        PollRequest::All { force } => (dashboard.lock().await.channels().to_vec(), force),
        PollRequest::Channel(channel_id) => {
            let followed = dashboard.lock().await.channels().contains(&channel_id);
            if !followed {
                debug!("Not polling {}: channel is not followed", channel_id);
                return 0;
            }
            (vec![channel_id], true)
        }
    };
    if channels.is_empty() {
        return 0;
    }

    let token = dashboard.lock().await.token();
    let streams = poller.poll(&channels, token.as_deref(), force).await;
    if streams.is_empty() {
        return 0;
    }
    let merged = dashboard.lock().await.merge_channel_streams(streams);
    info!("Merged {} channel stream(s)", merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use livemerge_core::dashboard::DashboardOptions;
    use livemerge_core::store::Store;
    use livemerge_core::urls::UrlOptions;
    use livemerge_core::youtube::{self, LiveVideo};
    use livemerge_core::Dashboard;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct AlwaysLive {
        calls: Arc<AtomicUsize>,
    }

    impl ChannelLookup for AlwaysLive {
        async fn live_video(&self, channel_id: &str, _token: &str) -> youtube::Result<Option<LiveVideo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(LiveVideo {
                video_id: format!("{channel_id}-video"),
                channel_id: channel_id.to_string(),
                channel_title: format!("{channel_id} title"),
                title: "live".into(),
            }))
        }

        async fn channel_title(&self, _channel_id: &str, _token: &str) -> youtube::Result<Option<String>> {
            Ok(None)
        }
    }

    fn followed_dashboard(signed_in: bool) -> SharedDashboard {
        let mut dashboard = Dashboard::open(&Store::in_memory(), DashboardOptions::default());
        dashboard.follow_channel("UCa").unwrap();
        dashboard.follow_channel("UCb").unwrap();
        if signed_in {
            dashboard.set_token("tok", i64::MAX);
        }
        Arc::new(Mutex::new(dashboard))
    }

    fn setup(signed_in: bool) -> (SharedDashboard, ChannelPoller<AlwaysLive>) {
        (
            followed_dashboard(signed_in),
            ChannelPoller::new(AlwaysLive::default(), UrlOptions::default()),
        )
    }

    #[tokio::test]
    async fn test_poll_all_merges_streams() {
        let (dashboard, poller) = setup(true);
        let merged = run_request(&dashboard, &poller, PollRequest::All { force: false }).await;
        assert_eq!(merged, 2);

        let dash = dashboard.lock().await;
        let live = dash.stream("UCa").unwrap();
        assert_eq!(live.is_live, Some(true));
        assert_eq!(live.input.embed_url, "https://www.youtube.com/embed/UCa-video");
        assert_eq!(dash.custom_order().len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_happens_without_token() {
        let (dashboard, poller) = setup(false);
        assert_eq!(run_request(&dashboard, &poller, PollRequest::All { force: true }).await, 0);
        assert!(dashboard.lock().await.streams().is_empty());
    }

    #[tokio::test]
    async fn test_single_channel_reload_is_forced() {
        let (dashboard, poller) = setup(true);
        run_request(&dashboard, &poller, PollRequest::All { force: false }).await;
        assert_eq!(run_request(&dashboard, &poller, PollRequest::All { force: false }).await, 0);
        assert_eq!(
            run_request(&dashboard, &poller, PollRequest::Channel("UCa".into())).await,
            1
        );
        assert_eq!(
            run_request(&dashboard, &poller, PollRequest::Channel("UCnope".into())).await,
            0
        );
    }

    #[tokio::test]
    async fn test_loop_polls_on_request() {
        let (dashboard, poller) = setup(true);
        let (handle, task) = start(dashboard.clone(), Arc::new(poller), None);
        handle.request(PollRequest::All { force: false });
        drop(handle);
        task.await.unwrap();
        assert_eq!(dashboard.lock().await.streams().len(), 2);
    }

    #[tokio::test]
    async fn test_interval_refreshes_resolved_channels() {
        let lookup = AlwaysLive::default();
        let calls = lookup.calls.clone();
        let poller = Arc::new(ChannelPoller::new(lookup, UrlOptions::default()));
        let (_handle, task) = start(followed_dashboard(true), poller, Some(Duration::from_millis(10)));

        // Two channels: the first tick resolves both, later ticks must look them up again.
        tokio::time::timeout(Duration::from_secs(5), async {
            while calls.load(Ordering::SeqCst) < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("resolved channels were not refreshed");
        task.abort();
    }
}
