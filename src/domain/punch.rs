use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PunchError {
    #[error("既に出勤打刻済みです")]
    AlreadyClockedIn,
    #[error("出勤打刻がありません")]
    NotClockedIn,
    #[error("既に退勤打刻済みです")]
    AlreadyClockedOut,
    #[error("休憩中です。先に休憩終了を打刻してください")]
    OnBreak,
    #[error("休憩中ではありません")]
    NotOnBreak,
}

/// Where an employee stands today, replayed from their punches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PunchState {
    pub clocked_in: bool,
    pub clocked_out: bool,
    pub on_break: bool,
}

impl PunchState {
    pub fn replay<I>(punches: I) -> Self
    where
        I: IntoIterator<Item = AttendanceType>,
    {
        punches
            .into_iter()
            .fold(PunchState::default(), |mut state, kind| {
                match kind {
                    AttendanceType::ClockIn => state.clocked_in = true,
                    AttendanceType::ClockOut => {
                        state.clocked_out = true;
                        state.on_break = false;
                    }
                    AttendanceType::BreakStart => state.on_break = true,
                    AttendanceType::BreakEnd => state.on_break = false,
                }
                state
            })
    }

    pub fn check(&self, kind: AttendanceType) -> Result<(), PunchError> {
        match kind {
            AttendanceType::ClockIn if self.clocked_in => Err(PunchError::AlreadyClockedIn),
            AttendanceType::ClockIn => Ok(()),
            _ if !self.clocked_in => Err(PunchError::NotClockedIn),
            _ if self.clocked_out => Err(PunchError::AlreadyClockedOut),
            AttendanceType::ClockOut | AttendanceType::BreakStart if self.on_break => {
                Err(PunchError::OnBreak)
            }
            AttendanceType::BreakEnd if !self.on_break => Err(PunchError::NotOnBreak),
            _ => Ok(()),
        }
    }

    /// Punch kinds accepted next, in button order.
    pub fn allowed(&self) -> Vec<AttendanceType> {
        [
            AttendanceType::ClockIn,
            AttendanceType::ClockOut,
            AttendanceType::BreakStart,
            AttendanceType::BreakEnd,
        ]
        .into_iter()
        .filter(|kind| self.check(*kind).is_ok())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceType::*;

    #[test]
    fn fresh_day_only_allows_clock_in() {
        let state = PunchState::replay([]);
        assert_eq!(state.allowed(), vec![ClockIn]);
        assert_eq!(state.check(ClockOut), Err(PunchError::NotClockedIn));
    }

    #[test]
    fn working_allows_clock_out_and_break() {
        let state = PunchState::replay([ClockIn]);
        assert_eq!(state.allowed(), vec![ClockOut, BreakStart]);
        assert_eq!(state.check(ClockIn), Err(PunchError::AlreadyClockedIn));
    }

    #[test]
    fn on_break_only_allows_break_end() {
        let state = PunchState::replay([ClockIn, BreakStart]);
        assert_eq!(state.allowed(), vec![BreakEnd]);
        assert_eq!(state.check(ClockOut), Err(PunchError::OnBreak));
    }

    #[test]
    fn multiple_breaks_are_allowed() {
        let state = PunchState::replay([ClockIn, BreakStart, BreakEnd]);
        assert!(state.check(BreakStart).is_ok());
        assert_eq!(state.check(BreakEnd), Err(PunchError::NotOnBreak));
    }

    #[test]
    fn clocked_out_day_is_closed() {
        let state = PunchState::replay([ClockIn, BreakStart, BreakEnd, ClockOut]);
        assert!(state.allowed().is_empty());
        assert_eq!(state.check(BreakStart), Err(PunchError::AlreadyClockedOut));
    }
}
