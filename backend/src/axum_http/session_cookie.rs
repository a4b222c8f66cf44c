use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;

/// Opaque Stripe customer id bound to the browser after checkout.
pub const SESSION_COOKIE: &str = "stripe_cid";
pub const SESSION_COOKIE_MAX_AGE_DAYS: i64 = 365;

pub fn build(customer_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, customer_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .max_age(Duration::days(SESSION_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// The customer id carried by the request, if any.
pub fn read(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_carries_the_expected_attributes() {
        let cookie = build("cus_1".to_string());

        assert_eq!(cookie.name(), "stripe_cid");
        assert_eq!(cookie.value(), "cus_1");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::days(365)));
    }

    #[test]
    fn empty_cookie_reads_as_missing() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "  "));
        assert_eq!(read(&jar), None);

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "cus_9"));
        assert_eq!(read(&jar), Some("cus_9".to_string()));
    }
}
