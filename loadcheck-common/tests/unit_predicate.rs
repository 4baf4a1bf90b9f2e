use loadcheck_common::{Cmp, Predicate, Selector};

#[test]
fn test_parse_percentile_predicate() {
    let p = Predicate::parse("p(95)<200").expect("parse failed");
    assert_eq!(p.selector, Selector::Percentile(95));
    assert_eq!(p.cmp, Cmp::Lt);
    assert_eq!(p.limit, 200.0);
}

#[test]
fn test_parse_rate_predicate() {
    let p = Predicate::parse("rate<0.01").expect("parse failed");
    assert_eq!(p.selector, Selector::Rate);
    assert_eq!(p.cmp, Cmp::Lt);
    assert_eq!(p.limit, 0.01);
}

#[test]
fn test_parse_ignores_whitespace() {
    let p = Predicate::parse(" p(50) < 50 ").expect("parse failed");
    assert_eq!(p.selector, Selector::Percentile(50));
    assert_eq!(p.limit, 50.0);
}

#[test]
fn test_parse_two_char_operators() {
    // "<=" must win over the bare "<" at the same position.
    let le = Predicate::parse("mean<=100").expect("parse failed");
    assert_eq!(le.cmp, Cmp::Le);

    let ge = Predicate::parse("count>=1000").expect("parse failed");
    assert_eq!(ge.selector, Selector::Count);
    assert_eq!(ge.cmp, Cmp::Ge);

    let gt = Predicate::parse("max>5").expect("parse failed");
    assert_eq!(gt.selector, Selector::Max);
    assert_eq!(gt.cmp, Cmp::Gt);
}

#[test]
fn test_parse_rejects_malformed_input() {
    assert!(Predicate::parse("p(95) 200").is_err(), "no operator");
    assert!(Predicate::parse("<200").is_err(), "missing selector");
    assert!(Predicate::parse("p(95)<").is_err(), "missing literal");
    assert!(Predicate::parse("p(95)<fast").is_err(), "non-numeric literal");
    assert!(Predicate::parse("p95<200").is_err(), "selector without parens");
    assert!(Predicate::parse("p(ninety)<200").is_err(), "non-numeric percentile");
    assert!(Predicate::parse("median<200").is_err(), "unknown selector");
}

#[test]
fn test_parse_rejects_untracked_percentile() {
    // Only the five tracked percentiles are valid predicate targets.
    for q in [0, 33, 80, 99, 100] {
        let result = Predicate::parse(&format!("p({q})<200"));
        if q == 99 {
            assert!(result.is_ok(), "p(99) should be tracked");
        } else {
            assert!(result.is_err(), "p({q}) should be rejected");
        }
    }
}

#[test]
fn test_holds_comparison_semantics() {
    let lt = Predicate::parse("p(95)<200").unwrap();
    assert!(lt.holds(199.99));
    assert!(!lt.holds(200.0), "strict less-than at the boundary");
    assert!(!lt.holds(200.01));

    let le = Predicate::parse("rate<=0.05").unwrap();
    assert!(le.holds(0.05), "inclusive at the boundary");
    assert!(!le.holds(0.050001));

    let gt = Predicate::parse("count>100").unwrap();
    assert!(gt.holds(101.0));
    assert!(!gt.holds(100.0));

    let ge = Predicate::parse("count>=100").unwrap();
    assert!(ge.holds(100.0));
    assert!(!ge.holds(99.0));
}
