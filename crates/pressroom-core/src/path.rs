//! Redirect-target validation.

use url::Url;

/// Check whether `target` is a same-origin relative URL.
///
/// A value that parses as an absolute URL on its own (`https://…`,
/// `javascript:…`, `mailto:…`) is rejected, as are protocol-relative and
/// backslash forms (`//host`, `/\host`) that browsers resolve to another
/// origin. Anything else must resolve against a dummy base.
pub fn is_relative_url(target: &str) -> bool {
    if target.is_empty() || Url::parse(target).is_ok() {
        return false;
    }

    let normalized = target.replace('\\', "/");
    if normalized.starts_with("//") {
        return false;
    }

    let Ok(base) = Url::parse("http://relative.invalid/") else {
        return false;
    };

    base.join(target)
        .is_ok_and(|joined| joined.host_str() == Some("relative.invalid"))
}
