//! Field-name to key-segment conversion and key-path joining.
//!
//! An explicit rename is taken verbatim after normalization: lowercased,
//! spaces stripped, truncated at the first `,` (so a tag-style
//! `"name,omitempty"` override reduces to `name`). Otherwise the field
//! identifier is converted camel-case → snake_case with the two classic
//! boundary rules: an uppercase run followed by lowercase splits before its
//! last capital (`HTTPServer` → `http_server`), and a lower/digit to upper
//! transition splits between them (`userID` → `user_id`).

/// Convert one field into its key segment.
pub(crate) fn segment(ident: &str, rename: Option<&str>) -> String {
    if let Some(r) = rename {
        let cut = r.split(',').next().unwrap_or("");
        return cut.replace(' ', "").to_lowercase();
    }
    camel_to_snake(ident)
}

/// Join a parent key and a child segment with `-`. An empty parent yields
/// the bare segment.
pub(crate) fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}-{child}")
    }
}

fn camel_to_snake(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        let upper_then_lower = i > 0
            && c.is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
        let lower_then_upper = i > 0
            && c.is_ascii_uppercase()
            && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
        if (upper_then_lower || lower_then_upper) && !out.ends_with('_') {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_ident_passes_through() {
        assert_eq!(segment("pool_size", None), "pool_size");
    }

    #[test]
    fn camel_case_splits() {
        assert_eq!(segment("PoolSize", None), "pool_size");
        assert_eq!(segment("poolSize", None), "pool_size");
    }

    #[test]
    fn acronym_run_splits_before_last_capital() {
        assert_eq!(segment("HTTPServer", None), "http_server");
        assert_eq!(segment("APIKey", None), "api_key");
    }

    #[test]
    fn trailing_acronym_splits_at_lower_upper_boundary() {
        assert_eq!(segment("userID", None), "user_id");
        assert_eq!(segment("ServerHTTP", None), "server_http");
    }

    #[test]
    fn digit_before_capital_splits() {
        assert_eq!(segment("ipv4Addr", None), "ipv4_addr");
    }

    #[test]
    fn rename_used_verbatim_lowercased() {
        assert_eq!(segment("whatever", Some("Host Name")), "hostname");
    }

    #[test]
    fn rename_truncates_at_option_separator() {
        assert_eq!(segment("whatever", Some("name,omitempty")), "name");
    }

    #[test]
    fn join_with_empty_parent() {
        assert_eq!(join("", "host"), "host");
    }

    #[test]
    fn join_nests_with_hyphen() {
        assert_eq!(join("database", "pool_size"), "database-pool_size");
        assert_eq!(join("a-b", "c"), "a-b-c");
    }
}
