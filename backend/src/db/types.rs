use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Text-backed enum stored as snake_case in SQLite and JSON.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum!(
    /// Account role; `SuperAdmin` is the only role without a tenant.
    Role, "role" {
        SuperAdmin => "super_admin",
        TenantAdmin => "tenant_admin",
        User => "user",
    }
);

text_enum!(TenantStatus, "tenant status" {
    Active => "active",
    Suspended => "suspended",
    Trial => "trial",
});

text_enum!(SubscriptionPlan, "subscription plan" {
    Free => "free",
    Pro => "pro",
    Enterprise => "enterprise",
});

text_enum!(ProjectStatus, "project status" {
    Active => "active",
    Archived => "archived",
    Completed => "completed",
});

text_enum!(TaskStatus, "task status" {
    Todo => "todo",
    InProgress => "in_progress",
    Completed => "completed",
});

text_enum!(TaskPriority, "task priority" {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Parses an optional request field, mapping bad values to a readable message.
pub fn parse_optional<T>(value: Option<&str>, message: &str) -> Result<Option<T>, String>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<T>().map_err(|_| message.to_string()))
        .transpose()
}

/// `LIKE` pattern for a case-insensitive substring match; use with `ESCAPE '\'`.
#[must_use]
pub fn contains_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
