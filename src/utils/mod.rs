pub mod db_utils;
pub mod email_filter;
pub mod month;
pub mod password;
pub mod rate_limiter;
pub mod validation;
