//! Unit test module
//!
//! Middleware unit tests live here, separate from source files.
//! Tests interact with middleware via public and pub(crate) APIs.

mod request_log_test;

use std::net::{IpAddr, Ipv4Addr};

use chat_core::{RequestContext, Role, User};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

pub(crate) fn addr(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

pub(crate) fn utc(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, second)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn sample_user() -> User {
    User {
        id: Uuid::new_v4(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: "test@example.com".to_string(),
        phone_number: None,
        role: Role::Guest,
        created_at: Utc::now(),
    }
}

pub(crate) fn anonymous_at(last: u8, at: DateTime<Utc>) -> RequestContext {
    RequestContext::anonymous(addr(last)).at(at)
}
