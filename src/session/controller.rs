//! [`Session`] の非同期ドライバ。先読みスケジューラと姿勢サンプリングを1タスクで回す

use futures::future::{BoxFuture, OptionFuture};
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::catalog::Catalog;
use super::event::SessionEvent;
use super::state::{Phase, Session};
use super::telemetry::Telemetry;
use super::throttle::SampleThrottle;
use crate::audio::{Clock, CueScheduler};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::pose::{Pose, PoseSource};

/// セッションの終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Finished,
    Stopped,
}

/// 実行中セッションの操作ハンドル
pub struct SessionHandle {
    stop: CancellationToken,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub telemetry: watch::Receiver<Telemetry>,
}

impl SessionHandle {
    /// タイマーを止める。推定中の呼び出しは完了まで走り、結果は捨てられる
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

pub struct SessionController<P, S, C> {
    session: Session,
    source: P,
    scheduler: S,
    clock: C,
}

impl<P, S, C> SessionController<P, S, C>
where
    P: PoseSource,
    S: CueScheduler,
    C: Clock,
{
    pub fn new(
        config: SessionConfig,
        catalog: Catalog,
        source: P,
        scheduler: S,
        clock: C,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if catalog.is_empty() {
            return Err(SessionError::Initialization("empty catalog".to_string()));
        }
        Ok(Self {
            session: Session::new(config, catalog),
            source,
            scheduler,
            clock,
        })
    }

    /// カタログを `loops` 周するセッションを開始。
    /// 返したfutureを単一タスク（current-thread runtime）でpollすること
    pub fn start(self, loops: usize) -> (SessionHandle, impl Future<Output = SessionOutcome>) {
        let stop = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (telemetry_tx, telemetry_rx) = watch::channel(self.session.telemetry());
        let handle = SessionHandle {
            stop: stop.clone(),
            events: event_rx,
            telemetry: telemetry_rx,
        };
        (handle, self.run(loops, stop, event_tx, telemetry_tx))
    }

    /// オーディオ時刻をtokioのInstantに変換
    fn deadline(&self, at: f64) -> Instant {
        let ahead = (at - self.clock.now()).max(0.0);
        Instant::now() + Duration::from_secs_f64(ahead)
    }

    fn schedule_bar(&mut self) {
        let plan = self.session.schedule_bar();
        debug!(
            "bar {} at {:.3}s: {} cues, bpm {}, layers {}",
            plan.section,
            plan.start,
            plan.cues().count(),
            self.session.bpm(),
            self.session.layers()
        );
        for cue in plan.cues() {
            self.scheduler.schedule(cue);
        }
    }

    fn boundary(&mut self, events: &mpsc::UnboundedSender<SessionEvent>) {
        let decided = self.session.decide();
        if decided.is_empty() {
            debug!(
                "round held at {:.2}: bpm {}, layers {}",
                self.session.overall_score(),
                self.session.bpm(),
                self.session.layers()
            );
        }
        for event in decided {
            info!("{:?}", event);
            // 受信側がいなくても続行
            let _ = events.send(event);
        }
    }

    async fn run(
        mut self,
        loops: usize,
        stop: CancellationToken,
        events: mpsc::UnboundedSender<SessionEvent>,
        telemetry: watch::Sender<Telemetry>,
    ) -> SessionOutcome {
        let config = self.session.config().clone();
        self.session.start(loops, self.clock.now());
        info!(
            "session started: {} references, {} loops",
            self.session.catalog().len(),
            loops
        );

        self.schedule_bar();
        let mut boundary_at = Some(self.session.boundary_time());
        let mut tick_at = self.session.next_tick_time();
        // 初回判定で最初のお手本を開始
        self.boundary(&events);
        telemetry.send_replace(self.session.telemetry());

        let mut refresh = time::interval(Duration::from_secs_f64(1.0 / config.refresh_hz));
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut throttle = SampleThrottle::new(config.target_sample_fps);
        let mut in_flight: Option<BoxFuture<'static, anyhow::Result<Vec<Pose>>>> = None;

        loop {
            if self.session.phase() == Phase::Finished {
                info!("session finished");
                return SessionOutcome::Finished;
            }

            let boundary_deadline = self.deadline(boundary_at.unwrap_or(tick_at));
            let tick_deadline = self.deadline(tick_at);

            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    if let Some(estimate) = in_flight.take() {
                        // 推定は最後まで走らせて結果は捨てる
                        tokio::spawn(async move {
                            let _ = estimate.await;
                        });
                    }
                    self.session.stop();
                    telemetry.send_replace(self.session.telemetry());
                    info!("session stopped");
                    return SessionOutcome::Stopped;
                }

                _ = time::sleep_until(boundary_deadline), if boundary_at.is_some() => {
                    boundary_at = None;
                    self.boundary(&events);
                    telemetry.send_replace(self.session.telemetry());
                }

                _ = time::sleep_until(tick_deadline) => {
                    // 判定は必ず次の小節の配置より先
                    if boundary_at.take().is_some() {
                        self.boundary(&events);
                    }
                    if self.session.is_running() {
                        self.schedule_bar();
                        boundary_at = Some(self.session.boundary_time());
                        tick_at = self.session.next_tick_time();
                    }
                    telemetry.send_replace(self.session.telemetry());
                }

                Some(result) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    match result {
                        Ok(poses) => self.session.record_poses(&poses),
                        Err(e) => warn!("pose estimation failed, frame skipped: {:#}", e),
                    }
                    telemetry.send_replace(self.session.telemetry());
                }

                _ = refresh.tick(), if in_flight.is_none() => {
                    if throttle.try_accept(self.clock.now()) {
                        in_flight = Some(self.source.estimate(config.max_detections));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Cue, MonotonicClock, Voice};
    use crate::session::catalog::ReferenceEntry;
    use crate::skeleton::builder::standing_pose;
    use futures::FutureExt;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedSource {
        poses: Vec<Pose>,
    }

    impl PoseSource for FixedSource {
        fn estimate(&mut self, max_detections: usize) -> BoxFuture<'static, anyhow::Result<Vec<Pose>>> {
            let mut poses = self.poses.clone();
            poses.truncate(max_detections);
            futures::future::ready(Ok(poses)).boxed()
        }
    }

    struct FailingSource;

    impl PoseSource for FailingSource {
        fn estimate(&mut self, _: usize) -> BoxFuture<'static, anyhow::Result<Vec<Pose>>> {
            futures::future::ready(Err(anyhow::anyhow!("camera unplugged"))).boxed()
        }
    }

    /// 1回の推定に `delay` かかるソース
    struct SlowSource {
        delay: Duration,
        started: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
    }

    impl PoseSource for SlowSource {
        fn estimate(&mut self, _: usize) -> BoxFuture<'static, anyhow::Result<Vec<Pose>>> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay;
            let completed = self.completed.clone();
            async move {
                time::sleep(delay).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(vec![standing_pose()])
            }
            .boxed()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingScheduler {
        cues: Rc<RefCell<Vec<Cue>>>,
    }

    impl CueScheduler for RecordingScheduler {
        fn schedule(&mut self, cue: &Cue) {
            self.cues.borrow_mut().push(cue.clone());
        }
    }

    fn catalog(ids: &[&str]) -> Catalog {
        let entries = ids
            .iter()
            .map(|id| ReferenceEntry {
                id: id.to_string(),
                poses: vec![standing_pose()],
            })
            .collect();
        Catalog::from_entries(entries, 0.8).unwrap()
    }

    fn config() -> SessionConfig {
        SessionConfig {
            mirror_input: false,
            ..SessionConfig::default()
        }
    }

    fn drain(handle: &mut SessionHandle) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = handle.events.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_performer_finishes() {
        let scheduler = RecordingScheduler::default();
        let cues = scheduler.cues.clone();
        let source = FixedSource {
            poses: vec![standing_pose()],
        };
        let controller =
            SessionController::new(config(), catalog(&["a", "b"]), source, scheduler, MonotonicClock::new())
                .unwrap();

        let (mut handle, session) = controller.start(1);
        assert_eq!(session.await, SessionOutcome::Finished);

        let id = |s: &str| s.to_string();
        assert_eq!(
            drain(&mut handle),
            vec![
                SessionEvent::PoseStarted { id: id("a") },
                SessionEvent::PoseAchieved { id: id("a"), overall_score: 1.0 },
                SessionEvent::PoseStarted { id: id("b") },
                SessionEvent::PoseAchieved { id: id("b"), overall_score: 1.0 },
                SessionEvent::Finished,
            ]
        );

        // 1小節目は無音、2小節目はキックのみ
        let cues = cues.borrow();
        assert_eq!(cues.len(), 4);
        assert!(cues.iter().all(|c| c.bus == Voice::Drum));

        let telemetry = handle.telemetry.borrow();
        assert_eq!(telemetry.phase, Phase::Finished);
        assert_eq!(telemetry.bpm, 112);
        assert_eq!(telemetry.layers, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_session() {
        let source = FixedSource {
            poses: vec![standing_pose()],
        };
        let controller = SessionController::new(
            config(),
            catalog(&["a", "b", "c"]),
            source,
            RecordingScheduler::default(),
            MonotonicClock::new(),
        )
        .unwrap();

        let (mut handle, session) = controller.start(1);
        let stopper = async {
            time::sleep(Duration::from_secs(1)).await;
            handle.stop();
        };
        let (outcome, ()) = tokio::join!(session, stopper);

        assert_eq!(outcome, SessionOutcome::Stopped);
        assert_eq!(handle.telemetry.borrow().phase, Phase::Idle);
        assert_eq!(drain(&mut handle), vec![SessionEvent::PoseStarted { id: "a".to_string() }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_keeps_running() {
        let scheduler = RecordingScheduler::default();
        let cues = scheduler.cues.clone();
        let controller = SessionController::new(
            config(),
            catalog(&["a"]),
            FailingSource,
            scheduler,
            MonotonicClock::new(),
        )
        .unwrap();

        let (mut handle, session) = controller.start(1);
        let token = handle.stop_token();
        let stopper = async move {
            time::sleep(Duration::from_secs(5)).await;
            token.cancel();
        };
        let (outcome, ()) = tokio::join!(session, stopper);

        assert_eq!(outcome, SessionOutcome::Stopped);
        assert_eq!(drain(&mut handle), vec![SessionEvent::PoseStarted { id: "a".to_string() }]);
        assert!(cues.borrow().is_empty());
        let telemetry = handle.telemetry.borrow();
        assert_eq!(telemetry.bpm, 110);
        assert!(telemetry.section >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_lookahead_decides_before_next_bar() {
        // 先読みが1拍より長いと、判定より先に次の小節のtickが来る
        let scheduler = RecordingScheduler::default();
        let cues = scheduler.cues.clone();
        let source = FixedSource {
            poses: vec![standing_pose()],
        };
        let config = SessionConfig {
            lookahead_secs: 1.0,
            ..config()
        };
        let clock = MonotonicClock::new();
        let started_at = Instant::now();
        let controller =
            SessionController::new(config, catalog(&["a", "b"]), source, scheduler, clock).unwrap();

        let (mut handle, session) = controller.start(1);
        assert_eq!(session.await, SessionOutcome::Finished);

        let id = |s: &str| s.to_string();
        assert_eq!(
            drain(&mut handle),
            vec![
                SessionEvent::PoseStarted { id: id("a") },
                SessionEvent::PoseAchieved { id: id("a"), overall_score: 1.0 },
                SessionEvent::PoseStarted { id: id("b") },
                SessionEvent::PoseAchieved { id: id("b"), overall_score: 1.0 },
                SessionEvent::Finished,
            ]
        );

        // 2小節目は判定後のテンポとレイヤーで配置される
        let cues = cues.borrow();
        assert_eq!(cues.len(), 4);
        assert!(cues.iter().all(|c| c.bus == Voice::Drum));
        let bar_start = 0.1 + 240.0 / 110.0;
        let beat = 60.0 / 111.0;
        for (i, cue) in cues.iter().enumerate() {
            assert!((cue.at - (bar_start + i as f64 * beat)).abs() < 1e-6, "cue {} at {}", i, cue.at);
        }

        // 最後の判定も2小節目の境界タイマーではなくtickで走る
        let bar_end = bar_start + 240.0 / 111.0;
        assert!(started_at.elapsed().as_secs_f64() < bar_end - beat);

        let telemetry = handle.telemetry.borrow();
        assert_eq!(telemetry.bpm, 112);
        assert_eq!(telemetry.layers, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_estimate_complete() {
        let started = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let source = SlowSource {
            delay: Duration::from_secs(10),
            started: started.clone(),
            completed: completed.clone(),
        };
        let controller = SessionController::new(
            config(),
            catalog(&["a"]),
            source,
            RecordingScheduler::default(),
            MonotonicClock::new(),
        )
        .unwrap();

        let (mut handle, session) = controller.start(1);
        let stopper = async {
            time::sleep(Duration::from_secs(1)).await;
            handle.stop();
        };
        let (outcome, ()) = tokio::join!(session, stopper);

        assert_eq!(outcome, SessionOutcome::Stopped);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        // 停止後の結果はセッションに反映されない
        assert_eq!(handle.telemetry.borrow().phase, Phase::Idle);
        assert_eq!(drain(&mut handle), vec![SessionEvent::PoseStarted { id: "a".to_string() }]);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = config();
        config.success_threshold = 1.5;
        let result = SessionController::new(
            config,
            catalog(&["a"]),
            FailingSource,
            RecordingScheduler::default(),
            MonotonicClock::new(),
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
