//  MOD.rs
//    by Lut99
//
//  Created:
//    16 Oct 2026, 10:02:11
//  Last edited:
//    16 Oct 2026, 11:15:48
//  Auto updated?
//    Yes
//
//  Description:
//!   Shared helpers for the `jwk-auth` integration tests.
//

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use http::{HeaderMap, HeaderValue};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;


/***** KEYS & TOKENS *****/
/// The directory with the test keys.
pub fn keys_dir() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("keys") }

/// The current UNIX time, in seconds.
pub fn now() -> u64 { SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() }

/// Signs the given claims with the private key called `key` (`primary` or `rotated`).
pub fn mint(key: &str, kid: Option<&str>, claims: Value) -> String {
    let pem = std::fs::read(keys_dir().join(format!("{key}.key.pem"))).unwrap();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(String::from);
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_rsa_pem(&pem).unwrap()).unwrap()
}

/// Builds headers carrying the given token as bearer.
pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
    headers
}



/***** LOGS *****/
/// A layer that remembers the message of every WARN-or-worse event.
#[derive(Clone, Default)]
pub struct WarningCollector {
    pub warnings: Arc<Mutex<Vec<String>>>,
}
impl<S: Subscriber> Layer<S> for WarningCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.warnings.lock().unwrap().push(visitor.0);
    }
}

struct MessageVisitor(String);
impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
