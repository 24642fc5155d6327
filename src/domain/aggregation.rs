//! Attendance time aggregation.
//!
//! Everything here is pure: punches and daily rows go in, minute totals come
//! out. Running the same input twice yields the same output.

use std::collections::{BTreeMap, HashSet};

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, AttendanceType, DailyAttendance, DayStatus};

/// Label used for employees without a department.
pub const UNASSIGNED_DEPARTMENT: &str = "未所属";

/// Shift length, night window and the wall-clock offset work dates are counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkPolicy {
    pub standard_shift_minutes: i32,
    pub night_start_hour: u32,
    pub night_end_hour: u32,
    pub utc_offset_minutes: i32,
}

impl Default for WorkPolicy {
    fn default() -> Self {
        Self {
            standard_shift_minutes: 480,
            night_start_hour: 22,
            night_end_hour: 5,
            utc_offset_minutes: 540,
        }
    }
}

impl WorkPolicy {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.offset()).naive_local()
    }

    /// Calendar date `at` falls on in work time.
    pub fn work_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.local(at).date()
    }

    pub fn today(&self) -> NaiveDate {
        self.work_date(Utc::now())
    }

    /// `[start, end)` in UTC of the work-time calendar day `date`.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let shift = Duration::minutes(i64::from(self.utc_offset_minutes));
        let start = date.and_time(NaiveTime::MIN) - shift;
        (start.and_utc(), (start + Duration::days(1)).and_utc())
    }

    /// The night window opening on `day`, as a local `[start, end)` interval.
    fn night_window(&self, day: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if self.night_start_hour == self.night_end_hour {
            return None;
        }
        let start = day.and_time(NaiveTime::from_hms_opt(self.night_start_hour, 0, 0)?);
        let end_day = if self.night_start_hour > self.night_end_hour {
            day.succ_opt()?
        } else {
            day
        };
        let end = end_day.and_time(NaiveTime::from_hms_opt(self.night_end_hour, 0, 0)?);
        Some((start, end))
    }
}

/// Formats a minute count as `H:MM`; hours are unbounded.
pub fn minutes_to_hours_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let total = minutes.unsigned_abs();
    format!("{sign}{}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Punch {
    pub kind: AttendanceType,
    pub at: DateTime<Utc>,
}

impl From<&AttendanceRecord> for Punch {
    fn from(record: &AttendanceRecord) -> Self {
        Punch {
            kind: record.attendance_type,
            at: record.recorded_at,
        }
    }
}

/// Derived figures for one employee on one work date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<DateTime<Utc>>,
    pub break_minutes: i32,
    pub actual_work_minutes: i32,
    pub overtime_minutes: i32,
    pub late_night_minutes: i32,
    pub status: DayStatus,
}

impl DaySummary {
    fn empty(status: DayStatus) -> Self {
        Self {
            clock_in: None,
            clock_out: None,
            break_minutes: 0,
            actual_work_minutes: 0,
            overtime_minutes: 0,
            late_night_minutes: 0,
            status,
        }
    }
}

fn overlap_seconds(
    (a_start, a_end): (NaiveDateTime, NaiveDateTime),
    (b_start, b_end): (NaiveDateTime, NaiveDateTime),
) -> i64 {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if end > start {
        (end - start).num_seconds()
    } else {
        0
    }
}

/// Aggregates one work date's punches.
///
/// The first clock-in opens the day and the last clock-out after it closes
/// it. A break still open at clock-out ends there. Until the employee clocks
/// out only `clock_in` is reported.
pub fn summarize_day(punches: &[Punch], policy: &WorkPolicy) -> DaySummary {
    let mut sorted = punches.to_vec();
    sorted.sort_by_key(|p| p.at);

    let Some(clock_in) = sorted
        .iter()
        .find(|p| p.kind == AttendanceType::ClockIn)
        .map(|p| p.at)
    else {
        return DaySummary::empty(DayStatus::Absent);
    };

    let clock_out = sorted
        .iter()
        .rev()
        .find(|p| p.kind == AttendanceType::ClockOut && p.at >= clock_in)
        .map(|p| p.at);

    let Some(clock_out) = clock_out else {
        return DaySummary {
            clock_in: Some(clock_in),
            ..DaySummary::empty(DayStatus::Present)
        };
    };

    let mut breaks: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    let mut open: Option<DateTime<Utc>> = None;
    for punch in sorted
        .iter()
        .filter(|p| p.at >= clock_in && p.at <= clock_out)
    {
        match punch.kind {
            AttendanceType::BreakStart if open.is_none() => open = Some(punch.at),
            AttendanceType::BreakEnd => {
                if let Some(start) = open.take() {
                    breaks.push((start, punch.at));
                }
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        breaks.push((start, clock_out));
    }

    let gross_minutes = (clock_out - clock_in).num_minutes();
    let break_minutes: i64 = breaks.iter().map(|(s, e)| (*e - *s).num_minutes()).sum();
    let actual = (gross_minutes - break_minutes).max(0);

    // Worked time is the shift with the breaks cut out.
    let mut worked = Vec::with_capacity(breaks.len() + 1);
    let mut cursor = clock_in;
    for (start, end) in &breaks {
        if *start > cursor {
            worked.push((cursor, *start));
        }
        cursor = cursor.max(*end);
    }
    if clock_out > cursor {
        worked.push((cursor, clock_out));
    }

    let night_seconds: i64 = worked
        .iter()
        .map(|(start, end)| {
            let span = (policy.local(*start), policy.local(*end));
            let mut day = span.0.date() - Duration::days(1);
            let mut seconds = 0;
            while day <= span.1.date() {
                if let Some(window) = policy.night_window(day) {
                    seconds += overlap_seconds(span, window);
                }
                day += Duration::days(1);
            }
            seconds
        })
        .sum();
    let late_night = (night_seconds / 60).min(actual);

    DaySummary {
        clock_in: Some(clock_in),
        clock_out: Some(clock_out),
        break_minutes: break_minutes as i32,
        actual_work_minutes: actual as i32,
        overtime_minutes: (actual - i64::from(policy.standard_shift_minutes)).max(0) as i32,
        late_night_minutes: late_night as i32,
        status: DayStatus::Present,
    }
}

/// Per-day figures every summary reduces over.
pub trait DayFigures {
    fn work_minutes(&self) -> i32;
    fn overtime_minutes(&self) -> i32;
    fn late_night_minutes(&self) -> i32;
    fn day_status(&self) -> DayStatus;
}

impl DayFigures for DailyAttendance {
    fn work_minutes(&self) -> i32 {
        self.actual_work_minutes
    }
    fn overtime_minutes(&self) -> i32 {
        self.overtime_minutes
    }
    fn late_night_minutes(&self) -> i32 {
        self.late_night_minutes
    }
    fn day_status(&self) -> DayStatus {
        self.status
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlySummary {
    pub work_days: u32,
    pub leave_days: u32,
    pub total_work_minutes: i64,
    pub total_overtime_minutes: i64,
    pub total_late_night_minutes: i64,
}

impl MonthlySummary {
    pub fn total_work(&self) -> String {
        minutes_to_hours_minutes(self.total_work_minutes)
    }

    pub fn total_overtime(&self) -> String {
        minutes_to_hours_minutes(self.total_overtime_minutes)
    }

    pub fn total_late_night(&self) -> String {
        minutes_to_hours_minutes(self.total_late_night_minutes)
    }
}

pub fn summarize_month<T: DayFigures>(days: &[T]) -> MonthlySummary {
    days.iter().fold(MonthlySummary::default(), |mut acc, day| {
        acc.total_work_minutes += i64::from(day.work_minutes());
        acc.total_overtime_minutes += i64::from(day.overtime_minutes());
        acc.total_late_night_minutes += i64::from(day.late_night_minutes());
        match day.day_status() {
            DayStatus::Present => acc.work_days += 1,
            DayStatus::Leave => acc.leave_days += 1,
            DayStatus::Absent | DayStatus::Holiday => {}
        }
        acc
    })
}

/// One daily row of any employee, tagged with the employee's department.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DepartmentDayRow {
    pub employee_id: u64,
    pub employee_active: bool,
    pub department_id: Option<u64>,
    pub department_name: Option<String>,
    pub actual_work_minutes: i32,
    pub overtime_minutes: i32,
    pub late_night_minutes: i32,
    pub status: DayStatus,
}

impl DayFigures for DepartmentDayRow {
    fn work_minutes(&self) -> i32 {
        self.actual_work_minutes
    }
    fn overtime_minutes(&self) -> i32 {
        self.overtime_minutes
    }
    fn late_night_minutes(&self) -> i32 {
        self.late_night_minutes
    }
    fn day_status(&self) -> DayStatus {
        self.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepartmentSummary {
    pub department_id: Option<u64>,
    pub name: String,
    pub employee_count: usize,
    pub work_days: u32,
    pub total_work_minutes: i64,
    pub total_overtime_minutes: i64,
    pub total_work: String,
    pub total_overtime: String,
}

/// Groups active employees' daily rows by department, ordered by department name.
pub fn summarize_departments(rows: &[DepartmentDayRow]) -> Vec<DepartmentSummary> {
    let mut groups: BTreeMap<Option<u64>, (String, HashSet<u64>, Vec<&DepartmentDayRow>)> =
        BTreeMap::new();

    for row in rows.iter().filter(|r| r.employee_active) {
        let entry = groups.entry(row.department_id).or_insert_with(|| {
            let name = row
                .department_name
                .clone()
                .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_string());
            (name, HashSet::new(), Vec::new())
        });
        entry.1.insert(row.employee_id);
        entry.2.push(row);
    }

    let mut summaries: Vec<DepartmentSummary> = groups
        .into_iter()
        .map(|(department_id, (name, employees, days))| {
            let month = days.iter().fold(MonthlySummary::default(), |mut acc, day| {
                acc.total_work_minutes += i64::from(day.work_minutes());
                acc.total_overtime_minutes += i64::from(day.overtime_minutes());
                if day.day_status() == DayStatus::Present {
                    acc.work_days += 1;
                }
                acc
            });
            DepartmentSummary {
                department_id,
                name,
                employee_count: employees.len(),
                work_days: month.work_days,
                total_work: month.total_work(),
                total_overtime: month.total_overtime(),
                total_work_minutes: month.total_work_minutes,
                total_overtime_minutes: month.total_overtime_minutes,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.department_id
            .is_none()
            .cmp(&b.department_id.is_none())
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

/// One daily overtime figure of an active employee.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OvertimeRow {
    pub employee_id: u64,
    pub name: String,
    pub employee_number: String,
    pub department_name: Option<String>,
    pub overtime_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OvertimeAlert {
    pub employee_id: u64,
    pub name: String,
    pub employee_number: String,
    pub department_name: Option<String>,
    pub total_overtime_minutes: i64,
    pub total_overtime: String,
}

/// Employees whose summed overtime reaches `threshold_minutes`, largest first.
pub fn overtime_alerts(
    rows: &[OvertimeRow],
    threshold_minutes: i64,
    limit: usize,
) -> Vec<OvertimeAlert> {
    let mut totals: BTreeMap<u64, OvertimeAlert> = BTreeMap::new();
    for row in rows {
        let alert = totals.entry(row.employee_id).or_insert_with(|| OvertimeAlert {
            employee_id: row.employee_id,
            name: row.name.clone(),
            employee_number: row.employee_number.clone(),
            department_name: row.department_name.clone(),
            total_overtime_minutes: 0,
            total_overtime: String::new(),
        });
        alert.total_overtime_minutes += i64::from(row.overtime_minutes);
    }

    let mut alerts: Vec<OvertimeAlert> = totals
        .into_values()
        .filter(|a| a.total_overtime_minutes >= threshold_minutes)
        .map(|mut a| {
            a.total_overtime = minutes_to_hours_minutes(a.total_overtime_minutes);
            a
        })
        .collect();
    alerts.sort_by(|a, b| {
        b.total_overtime_minutes
            .cmp(&a.total_overtime_minutes)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });
    alerts.truncate(limit);
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> WorkPolicy {
        WorkPolicy::default()
    }

    /// 2025-04-10 local (UTC+9) at `h:m`, shifted by `day_offset` days.
    fn at(day_offset: i64, h: u32, m: u32) -> DateTime<Utc> {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = jst.with_ymd_and_hms(2025, 4, 10, h, m, 0).unwrap();
        (local + Duration::days(day_offset)).with_timezone(&Utc)
    }

    fn punch(kind: AttendanceType, at: DateTime<Utc>) -> Punch {
        Punch { kind, at }
    }

    #[test]
    fn day_bounds_follow_the_work_offset() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let (start, end) = policy().day_bounds(date);
        assert_eq!(start, at(0, 0, 0));
        assert_eq!(end, at(1, 0, 0));
        assert_eq!(policy().work_date(start), date);
        assert_eq!(policy().work_date(end - Duration::seconds(1)), date);
    }

    fn day(status: DayStatus, work: i32, overtime: i32, night: i32) -> DailyAttendance {
        DailyAttendance {
            id: 1,
            employee_id: 1,
            work_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            clock_in: None,
            clock_out: None,
            break_minutes: 0,
            actual_work_minutes: work,
            overtime_minutes: overtime,
            late_night_minutes: night,
            status,
        }
    }

    #[test]
    fn formats_hours_and_minutes() {
        assert_eq!(minutes_to_hours_minutes(125), "2:05");
        assert_eq!(minutes_to_hours_minutes(0), "0:00");
        assert_eq!(minutes_to_hours_minutes(59), "0:59");
        assert_eq!(minutes_to_hours_minutes(6000), "100:00");
    }

    #[test]
    fn formatted_minutes_are_always_two_digits_below_sixty() {
        for m in 0..5000_i64 {
            let text = minutes_to_hours_minutes(m);
            let (hours, mins) = text.split_once(':').expect("colon separated");
            assert!(!hours.is_empty() && hours.chars().all(|c| c.is_ascii_digit()));
            assert_eq!(mins.len(), 2);
            let mins: i64 = mins.parse().unwrap();
            assert!(mins < 60);
            assert_eq!(hours.parse::<i64>().unwrap() * 60 + mins, m);
        }
    }

    #[test]
    fn empty_month_sums_to_zero() {
        let summary = summarize_month::<DailyAttendance>(&[]);
        assert_eq!(summary, MonthlySummary::default());
        assert_eq!(summary.total_work(), "0:00");
    }

    #[test]
    fn month_counts_present_and_leave_days() {
        let days = vec![
            day(DayStatus::Present, 480, 0, 0),
            day(DayStatus::Present, 600, 120, 30),
            day(DayStatus::Leave, 0, 0, 0),
            day(DayStatus::Absent, 0, 0, 0),
            day(DayStatus::Holiday, 0, 0, 0),
        ];
        let summary = summarize_month(&days);
        assert_eq!(summary.work_days, 2);
        assert_eq!(summary.leave_days, 1);
        assert_eq!(summary.total_work_minutes, 1080);
        assert_eq!(summary.total_overtime_minutes, 120);
        assert_eq!(summary.total_late_night_minutes, 30);
        assert_eq!(summary.total_work(), "18:00");
    }

    #[test]
    fn standard_day_with_lunch_break() {
        let punches = [
            punch(AttendanceType::ClockIn, at(0, 9, 0)),
            punch(AttendanceType::BreakStart, at(0, 12, 0)),
            punch(AttendanceType::BreakEnd, at(0, 13, 0)),
            punch(AttendanceType::ClockOut, at(0, 18, 0)),
        ];
        let summary = summarize_day(&punches, &policy());
        assert_eq!(summary.break_minutes, 60);
        assert_eq!(summary.actual_work_minutes, 480);
        assert_eq!(summary.overtime_minutes, 0);
        assert_eq!(summary.late_night_minutes, 0);
        assert_eq!(summary.status, DayStatus::Present);
    }

    #[test]
    fn overtime_and_late_night_are_split_out() {
        let punches = [
            punch(AttendanceType::ClockIn, at(0, 13, 0)),
            punch(AttendanceType::BreakStart, at(0, 18, 0)),
            punch(AttendanceType::BreakEnd, at(0, 18, 30)),
            punch(AttendanceType::ClockOut, at(0, 23, 30)),
        ];
        let summary = summarize_day(&punches, &policy());
        assert_eq!(summary.actual_work_minutes, 600);
        assert_eq!(summary.overtime_minutes, 120);
        assert_eq!(summary.late_night_minutes, 90);
    }

    #[test]
    fn night_window_spans_midnight() {
        let punches = [
            punch(AttendanceType::ClockIn, at(0, 20, 0)),
            punch(AttendanceType::ClockOut, at(1, 6, 0)),
        ];
        let summary = summarize_day(&punches, &policy());
        assert_eq!(summary.actual_work_minutes, 600);
        // 22:00 to 05:00
        assert_eq!(summary.late_night_minutes, 420);
    }

    #[test]
    fn breaks_inside_the_night_window_are_not_night_work() {
        let punches = [
            punch(AttendanceType::ClockIn, at(0, 21, 0)),
            punch(AttendanceType::BreakStart, at(0, 23, 0)),
            punch(AttendanceType::BreakEnd, at(1, 0, 0)),
            punch(AttendanceType::ClockOut, at(1, 1, 0)),
        ];
        let summary = summarize_day(&punches, &policy());
        assert_eq!(summary.actual_work_minutes, 180);
        assert_eq!(summary.late_night_minutes, 120);
    }

    #[test]
    fn open_break_ends_at_clock_out() {
        let punches = [
            punch(AttendanceType::ClockIn, at(0, 9, 0)),
            punch(AttendanceType::BreakStart, at(0, 17, 0)),
            punch(AttendanceType::ClockOut, at(0, 18, 0)),
        ];
        let summary = summarize_day(&punches, &policy());
        assert_eq!(summary.break_minutes, 60);
        assert_eq!(summary.actual_work_minutes, 480);
    }

    #[test]
    fn punches_are_ordered_before_aggregation() {
        let ordered = [
            punch(AttendanceType::ClockIn, at(0, 9, 0)),
            punch(AttendanceType::BreakStart, at(0, 12, 0)),
            punch(AttendanceType::BreakEnd, at(0, 12, 45)),
            punch(AttendanceType::ClockOut, at(0, 19, 0)),
        ];
        let mut shuffled = ordered;
        shuffled.reverse();
        assert_eq!(
            summarize_day(&ordered, &policy()),
            summarize_day(&shuffled, &policy())
        );
    }

    #[test]
    fn day_without_clock_out_reports_only_clock_in() {
        let punches = [punch(AttendanceType::ClockIn, at(0, 9, 0))];
        let summary = summarize_day(&punches, &policy());
        assert_eq!(summary.clock_in, Some(at(0, 9, 0)));
        assert_eq!(summary.clock_out, None);
        assert_eq!(summary.actual_work_minutes, 0);
        assert_eq!(summary.status, DayStatus::Present);
    }

    #[test]
    fn day_without_punches_is_absent() {
        let summary = summarize_day(&[], &policy());
        assert_eq!(summary.status, DayStatus::Absent);
        assert_eq!(summary.actual_work_minutes, 0);
    }

    #[test]
    fn work_date_uses_the_configured_offset() {
        // 2025-04-09 16:30 UTC is already 2025-04-10 in UTC+9.
        let utc = Utc.with_ymd_and_hms(2025, 4, 9, 16, 30, 0).unwrap();
        assert_eq!(
            policy().work_date(utc),
            NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
        );
    }

    fn dept_row(employee_id: u64, dept: Option<(u64, &str)>, work: i32, ot: i32) -> DepartmentDayRow {
        DepartmentDayRow {
            employee_id,
            employee_active: true,
            department_id: dept.map(|d| d.0),
            department_name: dept.map(|d| d.1.to_string()),
            actual_work_minutes: work,
            overtime_minutes: ot,
            late_night_minutes: 0,
            status: DayStatus::Present,
        }
    }

    #[test]
    fn departments_are_grouped_with_unassigned_last() {
        let rows = vec![
            dept_row(1, Some((2, "営業部")), 480, 0),
            dept_row(1, Some((2, "営業部")), 540, 60),
            dept_row(2, Some((2, "営業部")), 480, 0),
            dept_row(3, None, 300, 0),
            dept_row(4, Some((1, "開発部")), 600, 120),
        ];
        let summaries = summarize_departments(&rows);
        assert_eq!(summaries.len(), 3);

        let sales = summaries.iter().find(|s| s.department_id == Some(2)).unwrap();
        assert_eq!(sales.employee_count, 2);
        assert_eq!(sales.work_days, 3);
        assert_eq!(sales.total_work_minutes, 1500);
        assert_eq!(sales.total_overtime, "1:00");

        let last = summaries.last().unwrap();
        assert_eq!(last.department_id, None);
        assert_eq!(last.name, UNASSIGNED_DEPARTMENT);
    }

    #[test]
    fn departed_employees_count_overall_but_not_per_department() {
        let mut departed = dept_row(9, Some((2, "営業部")), 420, 30);
        departed.employee_active = false;
        let rows = vec![dept_row(1, Some((2, "営業部")), 480, 0), departed];

        let overall = summarize_month(&rows);
        assert_eq!(overall.total_work_minutes, 900);
        assert_eq!(overall.total_overtime_minutes, 30);

        let sales = summarize_departments(&rows);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].employee_count, 1);
        assert_eq!(sales[0].total_work_minutes, 480);
    }

    #[test]
    fn no_rows_no_departments() {
        assert!(summarize_departments(&[]).is_empty());
    }

    #[test]
    fn overtime_alerts_apply_threshold_and_limit() {
        let row = |employee_id: u64, overtime_minutes: i32| OvertimeRow {
            employee_id,
            name: format!("社員{employee_id}"),
            employee_number: format!("E{employee_id:04}"),
            department_name: None,
            overtime_minutes,
        };
        let rows = vec![
            row(1, 1500),
            row(1, 1300),
            row(2, 2699),
            row(3, 3000),
            row(4, 2700),
        ];

        let alerts = overtime_alerts(&rows, 2700, 10);
        let ids: Vec<u64> = alerts.iter().map(|a| a.employee_id).collect();
        assert_eq!(ids, vec![3, 1, 4]);
        assert_eq!(alerts[1].total_overtime_minutes, 2800);
        assert_eq!(alerts[1].total_overtime, "46:40");

        assert_eq!(overtime_alerts(&rows, 2700, 1).len(), 1);
    }
}
