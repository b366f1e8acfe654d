//! 동기화 진행 상황 관찰자
//!
//! 오케스트레이터는 [`SyncProgress`]를 주입받아 윈도우 단위로 알립니다.
//! [`TracingProgress`]는 진행률과 새 연도 진입을 tracing 로그로 남기며,
//! "마지막으로 알린 연도" 상태를 인스턴스 안에 보관합니다.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Datelike;
use tracing::{info, warn};

use crate::orchestrator::SyncReport;
use crate::planner::{DateWindow, Phase, SyncPlan, window_units};

/// 동기화 진행 상황 관찰자
///
/// 모든 메서드는 기본 구현이 비어 있으므로 필요한 것만 구현합니다.
pub trait SyncProgress: Send + Sync {
    /// 백그라운드 실행 시작
    fn run_started(&self, _plan: &SyncPlan) {}

    /// 윈도우 처리 시작 (`index`는 0부터)
    fn window_started(&self, _phase: Phase, _window: &DateWindow, _index: usize, _total: usize) {}

    /// 윈도우 처리 완료
    fn window_finished(&self, _phase: Phase, _window: &DateWindow, _rows_added: usize) {}

    /// 윈도우 처리 실패
    fn window_failed(&self, _phase: Phase, _window: &DateWindow, _reason: &str) {}

    /// 실행 종료
    fn run_finished(&self, _report: &SyncReport) {}
}

/// 아무것도 하지 않는 관찰자
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl SyncProgress for NoopProgress {}

/// tracing 로그 기반 관찰자
#[derive(Debug, Default)]
pub struct TracingProgress {
    last_year: Mutex<Option<i32>>,
    units_done: AtomicU64,
    units_total: AtomicU64,
}

impl TracingProgress {
    /// 새 관찰자를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 완료된 진행 단위
    pub fn units_done(&self) -> u64 {
        self.units_done.load(Ordering::Relaxed)
    }

    /// 마지막으로 알린 연도
    pub fn last_reported_year(&self) -> Option<i32> {
        self.last_year.lock().ok().and_then(|guard| *guard)
    }

    fn percent(&self) -> u64 {
        let total = self.units_total.load(Ordering::Relaxed);
        if total == 0 {
            100
        } else {
            self.units_done.load(Ordering::Relaxed).min(total) * 100 / total
        }
    }
}

impl SyncProgress for TracingProgress {
    fn run_started(&self, plan: &SyncPlan) {
        self.units_done.store(0, Ordering::Relaxed);
        self.units_total.store(plan.total_units(), Ordering::Relaxed);
        info!(
            from = %plan.from(),
            till = %plan.till(),
            months = plan.month_count(),
            days = plan.day_count(),
            "synchronization started"
        );
    }

    fn window_started(&self, phase: Phase, window: &DateWindow, index: usize, total: usize) {
        let year = window.start.year();
        if let Ok(mut last) = self.last_year.lock()
            && *last != Some(year)
        {
            *last = Some(year);
            info!(year, "synchronizing year");
        }
        info!(
            phase = %phase,
            window = %window,
            step = index + 1,
            steps = total,
            "synchronizing window"
        );
    }

    fn window_finished(&self, phase: Phase, window: &DateWindow, rows_added: usize) {
        self.units_done
            .fetch_add(window_units(phase, window), Ordering::Relaxed);
        info!(
            phase = %phase,
            window = %window,
            rows_added,
            percent = self.percent(),
            "window synchronized"
        );
    }

    fn window_failed(&self, phase: Phase, window: &DateWindow, reason: &str) {
        warn!(phase = %phase, window = %window, reason, "window failed");
    }

    fn run_finished(&self, report: &SyncReport) {
        info!(
            run_id = %report.run_id,
            outcome = %report.outcome,
            months = report.months_synced,
            days = report.days_synced,
            rows_added = report.rows_added,
            "synchronization finished"
        );
    }
}
