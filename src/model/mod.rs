pub mod approval;
pub mod attendance;
pub mod audit_log;
pub mod department;
pub mod employee;
pub mod leave_balance;
pub mod request;
pub mod role;
pub mod user;
