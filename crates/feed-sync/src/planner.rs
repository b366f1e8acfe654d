//! 날짜 윈도우 플래너
//!
//! 재개 날짜(`from`)부터 기준일(`till`)까지를 세 단계로 나눕니다.
//!
//! ```text
//! from            다음 달 1일               이번 달 1일          till
//!  |-- leading days --|-- whole months ... --|-- trailing days --|
//! ```
//!
//! - till: 오늘이 1일이면 오늘, 아니면 어제
//! - leading days: `from`이 1일이 아니고 오늘이 `from` 이후일 때만, 다음 1일 경계까지 (till로 제한)
//! - whole months: 1일에 정렬된 경우에만, 이번 달을 제외한 달 단위
//! - trailing days: 이전 단계 끝(또는 `from`)부터 till까지
//!
//! 모든 윈도우는 반열린 구간 `[start, end)`입니다.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

/// 월 단위 윈도우 하나의 진행 단위
pub const MONTH_UNITS: u64 = 30;

/// 피드 요청 파라미터의 날짜 형식
const FEED_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00.000";

/// 동기화 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 다음 달 1일까지의 앞쪽 일 단위 구간
    LeadingDays,
    /// 달 단위 구간
    WholeMonths,
    /// 마지막 1일부터 till까지의 뒤쪽 일 단위 구간
    TrailingDays,
}

impl Phase {
    /// 로그/메트릭 레이블 표기
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadingDays => "leading_days",
            Self::WholeMonths => "whole_months",
            Self::TrailingDays => "trailing_days",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 반열린 날짜 구간 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    /// 시작일 (포함)
    pub start: NaiveDate,
    /// 종료 경계 (제외)
    pub end: NaiveDate,
}

impl DateWindow {
    /// 비어있지 않은 구간만 생성합니다.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// 구간에 포함된 일 수
    pub fn days(&self) -> u64 {
        u64::try_from((self.end - self.start).num_days()).unwrap_or(0)
    }

    /// `pubStartDate` 파라미터 값
    pub fn start_param(&self) -> String {
        self.start.format(FEED_DATE_FORMAT).to_string()
    }

    /// `pubEndDate` 파라미터 값
    pub fn end_param(&self) -> String {
        self.end.format(FEED_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// 동기화 계획
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    from: NaiveDate,
    till: NaiveDate,
    windows: Vec<(Phase, DateWindow)>,
}

impl SyncPlan {
    /// 단계 순서대로 정렬된 윈도우
    pub fn windows(&self) -> &[(Phase, DateWindow)] {
        &self.windows
    }

    /// 특정 단계의 윈도우
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = &DateWindow> {
        self.windows
            .iter()
            .filter(move |(p, _)| *p == phase)
            .map(|(_, w)| w)
    }

    /// 재개 날짜
    pub fn from(&self) -> NaiveDate {
        self.from
    }

    /// 기준일 (마지막 윈도우의 종료 경계)
    pub fn till(&self) -> NaiveDate {
        self.till
    }

    /// 달 단위 윈도우 수
    pub fn month_count(&self) -> usize {
        self.phase(Phase::WholeMonths).count()
    }

    /// 일 단위 윈도우(앞쪽 + 뒤쪽)에 포함된 일 수
    pub fn day_count(&self) -> u64 {
        self.windows
            .iter()
            .filter(|(p, _)| *p != Phase::WholeMonths)
            .map(|(_, w)| w.days())
            .sum()
    }

    /// 전체 진행 단위 (달 = 30, 일 = 1)
    pub fn total_units(&self) -> u64 {
        self.month_count() as u64 * MONTH_UNITS + self.day_count()
    }

    /// 할 일이 없는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// 윈도우 하나의 진행 단위
pub fn window_units(phase: Phase, window: &DateWindow) -> u64 {
    match phase {
        Phase::WholeMonths => MONTH_UNITS,
        Phase::LeadingDays | Phase::TrailingDays => window.days(),
    }
}

/// 기준일: 오늘이 1일이면 오늘, 아니면 어제
pub fn till_date(now: NaiveDate) -> NaiveDate {
    if now.day() == 1 {
        now
    } else {
        now.checked_sub_days(Days::new(1)).unwrap_or(now)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// `from`부터 `now` 기준 till까지의 동기화 계획을 세웁니다.
pub fn plan(from: NaiveDate, now: NaiveDate) -> SyncPlan {
    let till = till_date(now);
    let mut windows = Vec::new();
    let mut cursor = from;

    if from.day() != 1
        && now > from
        && let Some(boundary) = first_of_month(from).checked_add_months(Months::new(1))
        && let Some(window) = DateWindow::new(cursor, boundary.min(till))
    {
        windows.push((Phase::LeadingDays, window));
        cursor = window.end;
    }

    if cursor.day() == 1 {
        let current_month = first_of_month(now);
        while cursor < current_month {
            let Some(next) = cursor.checked_add_months(Months::new(1)) else {
                break;
            };
            windows.push((Phase::WholeMonths, DateWindow { start: cursor, end: next }));
            cursor = next;
        }
    }

    if let Some(window) = DateWindow::new(cursor, till) {
        windows.push((Phase::TrailingDays, window));
    }

    SyncPlan {
        from,
        till,
        windows,
    }
}
