//! Compiled regex patterns for structural checks.

use std::sync::LazyLock;

use regex::Regex;

/// 32 hex digits grouped 8-4-4-4-12, hyphens optional, optionally in braces.
pub static GUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\{[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12}\}|[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12})$",
    )
    .expect("Invalid GUID pattern")
});

/// Column names that look like identifiers: "ID", "id", "user_id", "Order ID",
/// "customerId", "CustomerID". Words merely ending in "id" ("paid") do not match.
pub static IDENTIFIER_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?i:id)|.*[_\s.-](?i:id)|.*[a-z0-9](?:Id|ID))$")
        .expect("Invalid identifier name pattern")
});

/// Plain integers, optionally signed.
pub static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d{1,19}$").expect("Invalid integer pattern"));
