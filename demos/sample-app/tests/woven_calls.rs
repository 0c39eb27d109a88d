//! Integration test: calls into code woven by this crate's build script.

use std::path::Path;

use woven_sample::billing::Billing;
use woven_sample::store::{Persist, Store};
use woven_sample::trace;

#[test]
fn before_advice_runs_ahead_of_charge() {
    trace::take();
    let mut billing = Billing::default();
    assert_eq!(billing.charge(41), 42);
    assert_eq!(trace::take(), vec!["log charge", "body"]);
}

#[test]
fn early_return_and_question_mark_pass_through() {
    trace::take();
    let mut billing = Billing::default();
    assert_eq!(billing.charge(0), 0);
    assert_eq!(billing.charge_text(" 5 "), Ok(6));
    assert!(billing.charge_text("five").is_err());
    assert_eq!(
        trace::take(),
        vec!["log charge", "body", "log charge", "body"]
    );

    assert_eq!(billing.history(), &[5]);
    assert_eq!(trace::take(), vec!["log history"]);
}

#[test]
fn lower_priority_around_is_outermost() {
    trace::take();
    let mut store = Store::default();
    store.save("a");
    assert_eq!(
        trace::take(),
        vec![
            "audit enter save",
            "log enter save",
            "save",
            "log exit save",
            "audit exit save",
        ]
    );
}

#[test]
fn trait_impl_methods_are_woven() {
    trace::take();
    let mut store = Store::default();
    "row".to_string().persist(&mut store);
    let events = trace::take();
    assert_eq!(events.first().map(String::as_str), Some("audit enter save"));
    assert_eq!(events.last().map(String::as_str), Some("after persist"));

    assert_eq!(store.rows().collect::<Vec<_>>(), vec!["row"]);
    assert_eq!(trace::take(), vec!["log rows"]);
}

#[test]
fn after_throwing_sees_the_panic_and_resumes_it() {
    trace::take();
    let store = Store::default();
    let result = std::panic::catch_unwind(|| store.flush());
    assert!(result.is_err());
    assert_eq!(trace::take(), vec!["failed flush: disk full"]);
}

#[test]
fn file_macro_names_the_original_source() {
    let origin = Path::new(Billing::origin());
    assert!(origin.is_absolute(), "{}", origin.display());
    assert!(origin.ends_with("src/app/billing.rs"), "{}", origin.display());
}
