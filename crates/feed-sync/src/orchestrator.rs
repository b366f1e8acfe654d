//! 동기화 오케스트레이터 -- 계획 산정, 승인, 백그라운드 실행, 커서 갱신
//!
//! [`SyncOrchestrator`]는 한 번에 하나의 백그라운드 실행만 허용합니다.
//!
//! # 실행 흐름
//! ```text
//! synchronize()
//!   ├─ 실행 중 ──────────────> Err(AlreadyRunning)
//!   ├─ 커서 == 오늘 ─────────> AlreadySynced
//!   ├─ plan(resume + 1일, 오늘)
//!   │    ├─ 비어 있음 ───────> NothingToDo
//!   │    ├─ check_only ──────> CheckOnly(plan)
//!   │    └─ 승인 거부 ───────> Declined(plan)
//!   └─ tokio::spawn ─────────> Started { run_id, plan }
//!         leading → months → trailing (순차, 윈도우 사이에서만 취소 확인)
//!         성공 시에만 커서 = 오늘
//! ```
//!
//! 원격 조회 실패는 복구 가능한 결과(`SyncOutcome::Failed`)이며 커서는 그대로,
//! 이미 추가된 행은 유지됩니다. 다음 실행이 파티션에서 재개 지점을 다시 계산합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Days, Local, NaiveDate};
use metrics::{counter, histogram};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nvdmirror_core::metrics as m;
use nvdmirror_core::types::CveRecord;
use nvdmirror_record_store::RecordStore;

use crate::config::FeedSyncConfig;
use crate::cursor::CursorStore;
use crate::error::FeedSyncError;
use crate::feed::FeedSource;
use crate::planner::{self, Phase, SyncPlan};
use crate::progress::{SyncProgress, TracingProgress};

/// 오케스트레이터 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// 아직 실행하지 않음
    Idle,
    /// 계획만 산정함
    CheckOnly,
    /// 백그라운드 실행 중
    Running,
    /// 마지막 실행 성공
    Completed,
    /// 마지막 실행 실패 또는 취소
    Failed,
}

/// `synchronize` 호출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStart {
    /// 커서가 이미 오늘 (아무것도 하지 않음)
    AlreadySynced,
    /// 계획이 비어 있음
    NothingToDo(SyncPlan),
    /// 계획만 산정함
    CheckOnly(SyncPlan),
    /// 승인 거부
    Declined(SyncPlan),
    /// 백그라운드 실행 시작
    Started {
        /// 실행 ID
        run_id: Uuid,
        /// 실행 계획
        plan: SyncPlan,
    },
}

/// 백그라운드 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// 모든 윈도우 성공, 커서 갱신됨
    Completed,
    /// 실패 (커서 변경 없음, 추가된 행은 유지)
    Failed {
        /// 실패 사유
        reason: String,
    },
    /// 윈도우 사이에서 취소됨 (커서 변경 없음)
    Cancelled,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// 백그라운드 실행 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// 실행 ID
    pub run_id: Uuid,
    /// 결과
    pub outcome: SyncOutcome,
    /// 완료된 윈도우 수
    pub windows_completed: usize,
    /// 동기화된 달 수
    pub months_synced: usize,
    /// 동기화된 일 수 (앞쪽 + 뒤쪽)
    pub days_synced: u64,
    /// 새로 추가된 행 수
    pub rows_added: usize,
    /// 피드가 반환한 전체 취약점 수
    pub raw_vulnerabilities: usize,
    /// 갱신된 커서 (성공 시)
    pub cursor: Option<NaiveDate>,
    /// 소요 시간 (밀리초)
    pub duration_ms: u64,
}

impl SyncReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            outcome: SyncOutcome::Completed,
            windows_completed: 0,
            months_synced: 0,
            days_synced: 0,
            rows_added: 0,
            raw_vulnerabilities: 0,
            cursor: None,
            duration_ms: 0,
        }
    }
}

/// 백그라운드 태스크가 공유하는 협력자 집합
struct SyncContext<F, C> {
    feed: Arc<F>,
    store: Arc<Mutex<RecordStore>>,
    cursor: Arc<C>,
    progress: Arc<dyn SyncProgress>,
    state: Arc<std::sync::Mutex<SyncState>>,
    cancel: CancellationToken,
}

/// 증분 동기화 오케스트레이터
///
/// # 사용 예시
/// ```ignore
/// let mut orchestrator = SyncOrchestratorBuilder::new()
///     .config(config)
///     .feed(Arc::new(NvdFeedClient::new(&config)?))
///     .store(RecordStore::open(store_config)?)
///     .cursor(Arc::new(FileCursorStore::new(&config.cursor_path)))
///     .build()?;
///
/// if let SyncStart::Started { .. } = orchestrator.synchronize(|plan| confirm(plan)).await? {
///     let report = orchestrator.wait().await?;
/// }
/// ```
pub struct SyncOrchestrator<F: FeedSource, C: CursorStore> {
    config: FeedSyncConfig,
    feed: Arc<F>,
    store: Arc<Mutex<RecordStore>>,
    cursor: Arc<C>,
    progress: Arc<dyn SyncProgress>,
    state: Arc<std::sync::Mutex<SyncState>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<SyncReport>>,
}

impl<F: FeedSource, C: CursorStore> SyncOrchestrator<F, C> {
    /// 공유 레코드 저장소
    pub fn store(&self) -> Arc<Mutex<RecordStore>> {
        Arc::clone(&self.store)
    }

    /// 현재 상태
    pub fn state(&self) -> SyncState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(SyncState::Failed)
    }

    fn set_state(&self, state: SyncState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    /// 백그라운드 실행이 살아 있는지 반환합니다.
    pub fn is_busy(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 진행 중인 실행의 취소를 요청합니다.
    ///
    /// 윈도우 사이에서만 확인되며 진행 중인 조회는 끝까지 수행됩니다.
    pub fn cancel(&self) {
        if self.is_busy() {
            info!("cancellation requested");
        }
        self.cancel.cancel();
    }

    /// 현재 실행의 취소 토큰 (시그널 처리기 등 외부에서 취소할 때 사용)
    ///
    /// 실행마다 새 토큰이 만들어지므로 `synchronize` 이후에 가져와야 합니다.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 오늘(로컬 날짜) 기준으로 동기화를 시작합니다.
    pub async fn synchronize<A>(&mut self, approve: A) -> Result<SyncStart, FeedSyncError>
    where
        A: FnOnce(&SyncPlan) -> bool,
    {
        self.synchronize_on(Local::now().date_naive(), approve).await
    }

    /// `today` 기준으로 동기화를 시작합니다.
    ///
    /// `approve`는 승인이 필요한 설정에서 실행 직전에 한 번 호출됩니다.
    ///
    /// # Errors
    ///
    /// - [`FeedSyncError::AlreadyRunning`]: 이전 실행이 아직 진행 중
    /// - [`FeedSyncError::Store`]: 부트스트랩 파티션 없음(Setup), 파티션 불일치(Validation)
    /// - [`FeedSyncError::Cursor`]: 커서 파일 읽기 실패
    pub async fn synchronize_on<A>(
        &mut self,
        today: NaiveDate,
        approve: A,
    ) -> Result<SyncStart, FeedSyncError>
    where
        A: FnOnce(&SyncPlan) -> bool,
    {
        if self.is_busy() {
            return Err(FeedSyncError::AlreadyRunning);
        }

        if self.cursor.load()? == Some(today) {
            info!(cursor = %today, "already synchronized today");
            return Ok(SyncStart::AlreadySynced);
        }

        let last_synced = self.resume_cursor().await?;
        let from = last_synced
            .checked_add_days(Days::new(1))
            .unwrap_or(last_synced);
        let plan = planner::plan(from, today);
        debug!(
            last_synced = %last_synced,
            from = %from,
            windows = plan.windows().len(),
            units = plan.total_units(),
            "synchronization planned"
        );

        if plan.is_empty() {
            info!(from = %from, "nothing to synchronize");
            return Ok(SyncStart::NothingToDo(plan));
        }

        if self.config.check_only {
            self.set_state(SyncState::CheckOnly);
            info!(
                months = plan.month_count(),
                days = plan.day_count(),
                "check-only mode, not starting synchronization"
            );
            return Ok(SyncStart::CheckOnly(plan));
        }

        if self.config.require_confirmation && !approve(&plan) {
            info!("synchronization declined");
            return Ok(SyncStart::Declined(plan));
        }

        let run_id = Uuid::new_v4();
        self.cancel = CancellationToken::new();
        self.set_state(SyncState::Running);

        let ctx = SyncContext {
            feed: Arc::clone(&self.feed),
            store: Arc::clone(&self.store),
            cursor: Arc::clone(&self.cursor),
            progress: Arc::clone(&self.progress),
            state: Arc::clone(&self.state),
            cancel: self.cancel.clone(),
        };
        let task_plan = plan.clone();
        self.handle = Some(tokio::spawn(async move {
            run_sync(ctx, run_id, task_plan, today).await
        }));

        info!(run_id = %run_id, "background synchronization started");
        Ok(SyncStart::Started { run_id, plan })
    }

    /// 백그라운드 실행이 끝날 때까지 기다리고 요약을 반환합니다.
    ///
    /// 시작된 실행이 없으면 `None`입니다.
    pub async fn wait(&mut self) -> Result<Option<SyncReport>, FeedSyncError> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        let report = handle
            .await
            .map_err(|e| FeedSyncError::Task(e.to_string()))?;
        Ok(Some(report))
    }

    async fn resume_cursor(&self) -> Result<NaiveDate, FeedSyncError> {
        let store = Arc::clone(&self.store);
        let cursor = tokio::task::spawn_blocking(move || store.blocking_lock().resume_cursor())
            .await
            .map_err(|e| FeedSyncError::Task(e.to_string()))??;
        Ok(cursor)
    }
}

/// 레코드를 공개 연도별로 나눠 파티션에 추가합니다.
///
/// 공개 연도를 알 수 없는 행은 건너뜁니다.
async fn ingest(store: Arc<Mutex<RecordStore>>, records: Vec<CveRecord>) -> Result<usize, FeedSyncError> {
    let appended = tokio::task::spawn_blocking(move || {
        let mut by_year: BTreeMap<i32, Vec<CveRecord>> = BTreeMap::new();
        for record in records {
            match record.published_year() {
                Some(year) => by_year.entry(year).or_default().push(record),
                None => warn!(cve_id = %record.cve_id, published = %record.published, "no published year, skipping"),
            }
        }

        let mut store = store.blocking_lock();
        let mut appended = 0;
        for (year, rows) in by_year {
            appended += store.append(&rows, year)?.appended;
        }
        Ok::<usize, nvdmirror_record_store::StoreError>(appended)
    })
    .await
    .map_err(|e| FeedSyncError::Task(e.to_string()))??;

    Ok(appended)
}

fn advance_cursor<C: CursorStore>(cursor: &C, today: NaiveDate) -> Result<Option<NaiveDate>, FeedSyncError> {
    match cursor.load()? {
        Some(previous) if previous > today => {
            warn!(previous = %previous, today = %today, "stored cursor is ahead of today, keeping it");
            Ok(None)
        }
        _ => {
            cursor.save(today)?;
            Ok(Some(today))
        }
    }
}

async fn run_sync<F: FeedSource, C: CursorStore>(
    ctx: SyncContext<F, C>,
    run_id: Uuid,
    plan: SyncPlan,
    today: NaiveDate,
) -> SyncReport {
    let started = Instant::now();
    let mut report = SyncReport::new(run_id);
    ctx.progress.run_started(&plan);

    let total = plan.windows().len();
    for (index, (phase, window)) in plan.windows().iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            info!(run_id = %run_id, completed = report.windows_completed, "synchronization cancelled");
            report.outcome = SyncOutcome::Cancelled;
            break;
        }

        ctx.progress.window_started(*phase, window, index, total);

        let batch = match ctx.feed.fetch_window(window).await {
            Ok(batch) => batch,
            Err(e) => {
                ctx.progress.window_failed(*phase, window, &e.reason);
                report.outcome = SyncOutcome::Failed {
                    reason: e.to_string(),
                };
                break;
            }
        };
        report.raw_vulnerabilities += batch.raw_count;

        let rows_added = match ingest(Arc::clone(&ctx.store), batch.records).await {
            Ok(rows) => rows,
            Err(e) => {
                ctx.progress.window_failed(*phase, window, &e.to_string());
                report.outcome = SyncOutcome::Failed {
                    reason: e.to_string(),
                };
                break;
            }
        };

        report.rows_added += rows_added;
        report.windows_completed += 1;
        match phase {
            Phase::WholeMonths => report.months_synced += 1,
            Phase::LeadingDays | Phase::TrailingDays => report.days_synced += window.days(),
        }
        counter!(m::SYNC_WINDOWS_TOTAL, m::LABEL_PHASE => phase.as_str()).increment(1);
        ctx.progress.window_finished(*phase, window, rows_added);
    }

    if report.outcome == SyncOutcome::Completed {
        match advance_cursor(ctx.cursor.as_ref(), today) {
            Ok(cursor) => report.cursor = cursor,
            Err(e) => {
                report.outcome = SyncOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (result, state) = match report.outcome {
        SyncOutcome::Completed => ("success", SyncState::Completed),
        SyncOutcome::Failed { .. } => ("failure", SyncState::Failed),
        SyncOutcome::Cancelled => ("cancelled", SyncState::Failed),
    };
    counter!(m::SYNC_RUNS_TOTAL, m::LABEL_RESULT => result).increment(1);
    histogram!(m::SYNC_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    if let Ok(mut guard) = ctx.state.lock() {
        *guard = state;
    }

    ctx.progress.run_finished(&report);
    report
}

/// 오케스트레이터 빌더
pub struct SyncOrchestratorBuilder<F: FeedSource, C: CursorStore> {
    config: FeedSyncConfig,
    feed: Option<Arc<F>>,
    store: Option<RecordStore>,
    cursor: Option<Arc<C>>,
    progress: Option<Arc<dyn SyncProgress>>,
}

impl<F: FeedSource, C: CursorStore> Default for SyncOrchestratorBuilder<F, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FeedSource, C: CursorStore> SyncOrchestratorBuilder<F, C> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: FeedSyncConfig::default(),
            feed: None,
            store: None,
            cursor: None,
            progress: None,
        }
    }

    /// 동기화 설정을 지정합니다.
    pub fn config(mut self, config: FeedSyncConfig) -> Self {
        self.config = config;
        self
    }

    /// 원격 피드를 지정합니다.
    pub fn feed(mut self, feed: Arc<F>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// 레코드 저장소를 지정합니다.
    pub fn store(mut self, store: RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    /// 커서 저장소를 지정합니다.
    pub fn cursor(mut self, cursor: Arc<C>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// 진행 상황 관찰자를 지정합니다. 지정하지 않으면 [`TracingProgress`]를 사용합니다.
    pub fn progress(mut self, progress: Arc<dyn SyncProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// 오케스트레이터를 빌드합니다.
    pub fn build(self) -> Result<SyncOrchestrator<F, C>, FeedSyncError> {
        self.config.validate()?;

        let feed = self.feed.ok_or_else(|| missing("feed"))?;
        let store = self.store.ok_or_else(|| missing("store"))?;
        let cursor = self.cursor.ok_or_else(|| missing("cursor"))?;
        let progress = self
            .progress
            .unwrap_or_else(|| Arc::new(TracingProgress::new()));

        Ok(SyncOrchestrator {
            config: self.config,
            feed,
            store: Arc::new(Mutex::new(store)),
            cursor,
            progress,
            state: Arc::new(std::sync::Mutex::new(SyncState::Idle)),
            cancel: CancellationToken::new(),
            handle: None,
        })
    }
}

fn missing(field: &str) -> FeedSyncError {
    FeedSyncError::Config {
        field: field.to_owned(),
        reason: format!("{field} must be provided"),
    }
}
