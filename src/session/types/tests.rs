use super::*;
use chrono::Duration;

fn sample_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("aiueo".to_string(), Value::from("あいうえお"));
    data.insert("kakikukeko".to_string(), Value::from("かきくけこ"));
    data.insert("count".to_string(), Value::from(3));
    data
}

#[test]
fn test_session_new_keeps_fields() {
    let expires_at = Utc::now();
    let session = Session::new("sess1", expires_at, sample_data());

    assert_eq!(session.id(), "sess1");
    assert_eq!(session.expires_at(), expires_at);
    assert_eq!(session.data(), &sample_data());
}

#[test]
fn test_session_new_drops_reserved_key() {
    let mut data = sample_data();
    data.insert(EXPIRES_AT_KEY.to_string(), Value::from("2001-01-01T00:00:00Z"));

    let session = Session::new("sess1", Utc::now(), data);

    assert!(session.get(EXPIRES_AT_KEY).is_none());
    assert_eq!(session.data().len(), 3);
}

#[test]
fn test_session_set_and_get_keep_dynamic_type() {
    let mut session = Session::new("sess1", Utc::now(), HashMap::new());

    session.set("count", 1).unwrap();
    session.set("name", "alice").unwrap();
    session.set("admin", true).unwrap();
    session.set("ratio", 0.5).unwrap();

    assert_eq!(session.get("count").and_then(Value::as_int), Some(1));
    assert_eq!(session.get("name").and_then(Value::as_str), Some("alice"));
    assert_eq!(session.get("admin").and_then(Value::as_bool), Some(true));
    assert_eq!(session.get("ratio").and_then(Value::as_float), Some(0.5));
    assert!(session.get("missing").is_none());
}

#[test]
fn test_session_set_returns_previous_value() {
    let mut session = Session::new("sess1", Utc::now(), HashMap::new());

    assert_eq!(session.set("count", 1).unwrap(), None);
    assert_eq!(session.set("count", 2).unwrap(), Some(Value::Int(1)));
}

#[test]
fn test_session_set_rejects_reserved_key() {
    let mut session = Session::new("sess1", Utc::now(), HashMap::new());

    let err = session.set(EXPIRES_AT_KEY, "later").unwrap_err();
    assert!(matches!(err, SessionError::ReservedKey(ref k) if k == EXPIRES_AT_KEY));
    assert!(session.data().is_empty());
}

#[test]
fn test_session_remove() {
    let mut session = Session::new("sess1", Utc::now(), sample_data());

    assert_eq!(session.remove("count"), Some(Value::Int(3)));
    assert_eq!(session.remove("count"), None);
}

#[test]
fn test_session_expiry() {
    let live = Session::new("live", Utc::now() + Duration::hours(1), HashMap::new());
    let dead = Session::new("dead", Utc::now() - Duration::hours(1), HashMap::new());

    assert!(!live.does_expire());
    assert!(dead.does_expire());
}

#[test]
fn test_expiry_boundary_is_exclusive() {
    let at = Utc::now();
    let session = Session::new("edge", at, HashMap::new());

    assert!(!session.is_expired_at(at));
    assert!(session.is_expired_at(at + Duration::nanoseconds(1)));
}

#[test]
fn test_opaque_value_downcasts() {
    #[derive(Debug, PartialEq)]
    struct Cart {
        items: Vec<u32>,
    }

    let mut session = Session::new("sess1", Utc::now(), HashMap::new());
    session
        .set("cart", Value::opaque(Cart { items: vec![1, 2] }))
        .unwrap();

    let cart = session
        .get("cart")
        .and_then(Value::downcast_ref::<Cart>)
        .unwrap();
    assert_eq!(cart.items, vec![1, 2]);
    assert!(session.get("cart").unwrap().downcast_ref::<String>().is_none());
    assert!(session.get("cart").unwrap().to_text().is_none());
}

#[test]
fn test_value_to_text() {
    assert_eq!(Value::from(42).to_text().as_deref(), Some("42"));
    assert_eq!(Value::from(-7i64).to_text().as_deref(), Some("-7"));
    assert_eq!(Value::from(1.5).to_text().as_deref(), Some("1.5"));
    assert_eq!(Value::from(false).to_text().as_deref(), Some("false"));
    assert_eq!(Value::from("x:y").to_text().as_deref(), Some("x:y"));
}

#[test]
fn test_cloned_session_is_detached() {
    let mut original = Session::new("sess1", Utc::now(), sample_data());
    let copy = original.clone();

    original.set("count", 99).unwrap();

    assert_eq!(copy.get("count"), Some(&Value::Int(3)));
}

#[test]
fn test_expiry_from_now_saturates() {
    let far = expiry_from_now(TimeDelta::MAX);
    assert_eq!(far, latest_expiry());
    assert_eq!(
        far.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        "9999-12-31T23:59:59.999999999Z"
    );
    assert_eq!(expiry_from_now(TimeDelta::days(4_000_000)), far);
    let soon = expiry_from_now(TimeDelta::hours(1));
    assert!(soon > Utc::now());
}
