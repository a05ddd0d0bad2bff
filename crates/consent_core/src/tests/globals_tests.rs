use super::*;
use serde_json::json;

struct CountingSink {
    calls: Mutex<Vec<Vec<Value>>>,
}

impl CommandSink for CountingSink {
    fn call(&self, args: &[Value]) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(args.to_vec());
    }
}

#[test]
fn capability_reports_absent_wrong_shape_and_usable() {
    let globals = GlobalScope::new();
    assert_eq!(globals.probe("dataLayer", Shape::Sequence), Capability::Absent);

    globals.set("dataLayer", GlobalValue::Other(json!("clobbered")));
    assert_eq!(
        globals.probe("dataLayer", Shape::Sequence),
        Capability::WrongShape
    );

    globals.set("dataLayer", GlobalValue::Sequence(Vec::new()));
    assert_eq!(globals.probe("dataLayer", Shape::Sequence), Capability::Usable);
    assert_eq!(
        globals.probe("dataLayer", Shape::Callable),
        Capability::WrongShape
    );
}

#[test]
fn ensure_sequence_is_idempotent_and_keeps_contents() {
    let globals = GlobalScope::new();
    assert_eq!(globals.ensure_sequence("dataLayer"), Capability::Usable);
    assert!(globals.push("dataLayer", json!({"event": "a"})));
    assert_eq!(globals.ensure_sequence("dataLayer"), Capability::Usable);
    assert_eq!(globals.sequence("dataLayer"), Some(vec![json!({"event": "a"})]));
}

#[test]
fn ensure_sequence_does_not_clobber_foreign_values() {
    let globals = GlobalScope::new();
    globals.set("dataLayer", GlobalValue::Other(json!(42)));
    assert_eq!(globals.ensure_sequence("dataLayer"), Capability::WrongShape);
    assert!(!globals.push("dataLayer", json!({"event": "a"})));
    assert!(matches!(
        globals.get("dataLayer"),
        Some(GlobalValue::Other(value)) if value == json!(42)
    ));
}

#[test]
fn call_forwards_positional_arguments_in_order() {
    let globals = GlobalScope::new();
    let sink = Arc::new(CountingSink {
        calls: Mutex::new(Vec::new()),
    });
    globals.set("ga", GlobalValue::Callable(sink.clone()));

    assert!(globals.call("ga", &[json!("send"), json!("pageview")]));
    assert_eq!(
        *sink.calls.lock().expect("calls lock"),
        vec![vec![json!("send"), json!("pageview")]]
    );
}

#[test]
fn call_fails_on_missing_or_non_callable_global() {
    let globals = GlobalScope::new();
    assert!(!globals.call("ga", &[json!("send")]));
    globals.set("ga", GlobalValue::Sequence(Vec::new()));
    assert!(!globals.call("ga", &[json!("send")]));
}

#[test]
fn ensure_callable_installs_once() {
    let globals = GlobalScope::new();
    let first = Arc::new(CommandQueue::new());
    let installed = first.clone();
    assert_eq!(
        globals.ensure_callable("ga", move || installed as Arc<dyn CommandSink>),
        Capability::Usable
    );
    assert_eq!(
        globals.ensure_callable("ga", || Arc::new(CommandQueue::new()) as Arc<dyn CommandSink>),
        Capability::Usable
    );

    assert!(globals.call("ga", &[json!("create"), json!("UA-1")]));
    assert_eq!(first.queued(), vec![vec![json!("create"), json!("UA-1")]]);
    assert!(first.created_at() <= Utc::now());
}

#[test]
fn removed_global_reads_as_absent() {
    let globals = GlobalScope::new();
    globals.ensure_sequence("dataLayer");
    assert!(globals.remove("dataLayer").is_some());
    assert_eq!(globals.probe("dataLayer", Shape::Sequence), Capability::Absent);
    assert_eq!(globals.sequence("dataLayer"), None);
}
