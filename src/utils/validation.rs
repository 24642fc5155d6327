use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const REQUIRED_MESSAGE: &str = "必須項目です";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    EmployeeNumber,
    Name,
    Email,
    Password,
    DepartmentName,
    Reason,
    Comment,
    Month,
}

static EMPLOYEE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{4,10}$").expect("employee number pattern"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}\s\-・]{1,50}$").expect("name pattern"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static DEPARTMENT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}\s\-・]{1,30}$").expect("department pattern"));
pub(crate) static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("month pattern"));

const PASSWORD_SYMBOLS: &str = "@$!%*?&";

/// Lower, upper, digit and symbol each present; nothing outside those classes.
fn is_strong_password(value: &str) -> bool {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c));
    allowed
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

enum Pattern {
    Regex(&'static Lazy<Regex>),
    Check(fn(&str) -> bool),
}

struct Constraints {
    pattern: Option<Pattern>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    message: &'static str,
}

impl ValidationRule {
    fn constraints(self) -> Constraints {
        match self {
            ValidationRule::EmployeeNumber => Constraints {
                pattern: Some(Pattern::Regex(&EMPLOYEE_NUMBER_RE)),
                min_length: None,
                max_length: Some(10),
                message: "社員番号は4〜10文字の英大文字・数字で入力してください",
            },
            ValidationRule::Name => Constraints {
                pattern: Some(Pattern::Regex(&NAME_RE)),
                min_length: None,
                max_length: Some(50),
                message: "名前は50文字以内で入力してください",
            },
            ValidationRule::Email => Constraints {
                pattern: Some(Pattern::Regex(&EMAIL_RE)),
                min_length: None,
                max_length: Some(255),
                message: "有効なメールアドレスを入力してください",
            },
            ValidationRule::Password => Constraints {
                pattern: Some(Pattern::Check(is_strong_password)),
                min_length: Some(8),
                max_length: Some(128),
                message: "パスワードは8文字以上で、大文字・小文字・数字・記号を含めてください",
            },
            ValidationRule::DepartmentName => Constraints {
                pattern: Some(Pattern::Regex(&DEPARTMENT_NAME_RE)),
                min_length: None,
                max_length: Some(30),
                message: "部門名は30文字以内で入力してください",
            },
            ValidationRule::Reason => Constraints {
                pattern: None,
                min_length: None,
                max_length: Some(500),
                message: "理由は500文字以内で入力してください",
            },
            ValidationRule::Comment => Constraints {
                pattern: None,
                min_length: None,
                max_length: Some(200),
                message: "コメントは200文字以内で入力してください",
            },
            ValidationRule::Month => Constraints {
                pattern: Some(Pattern::Regex(&MONTH_RE)),
                min_length: None,
                max_length: None,
                message: "有効な年月を指定してください",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub rule: ValidationRule,
    pub message: &'static str,
}

/// Checks `value` against `rule`: required, max length, min length, then pattern.
pub fn validate(value: &str, rule: ValidationRule) -> Result<(), ValidationError> {
    let c = rule.constraints();
    let fail = |message| Err(ValidationError { rule, message });

    if value.trim().is_empty() {
        return fail(REQUIRED_MESSAGE);
    }

    let length = value.chars().count();
    if c.max_length.is_some_and(|max| length > max) {
        return fail(c.message);
    }
    if c.min_length.is_some_and(|min| length < min) {
        return fail(c.message);
    }

    let matches = match c.pattern {
        Some(Pattern::Regex(re)) => re.is_match(value),
        Some(Pattern::Check(check)) => check(value),
        None => true,
    };
    if !matches {
        return fail(c.message);
    }
    Ok(())
}

/// Like [`validate`], but an absent or blank value passes.
pub fn validate_optional(value: Option<&str>, rule: ValidationRule) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => validate(v, rule),
        _ => Ok(()),
    }
}

/// Field name → message for every failing field.
pub type FieldErrors = BTreeMap<String, String>;

pub fn validate_fields(fields: &[(&str, &str, ValidationRule)]) -> Result<(), FieldErrors> {
    let errors: FieldErrors = fields
        .iter()
        .filter_map(|(field, value, rule)| {
            validate(value, *rule)
                .err()
                .map(|e| (field.to_string(), e.message.to_string()))
        })
        .collect();

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// HTML-escapes `input`. Escaping twice double-escapes, so call it once at the boundary.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}

/// Trims and escapes free text before it is stored.
pub fn sanitize(input: &str) -> String {
    escape_html(input.trim())
}
