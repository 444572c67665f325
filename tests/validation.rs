//! Static grammar/catalog validation on the calculator and variations of it.

use opgram::testing::calculator;
use opgram::{validate, Catalog, GrammarBuilder};

#[test]
fn test_calculator_is_consistent() {
    let grammar = calculator::grammar().unwrap();
    let catalog = calculator::catalog().unwrap();
    assert!(validate(&grammar, &catalog).is_empty());
}

#[test]
fn test_operator_without_action_is_reported() {
    let mut builder = GrammarBuilder::new();
    let expr = builder.declare("expr");
    builder.define(expr, |s| {
        s.skip("~\\s+")
            .term("int", "~[0-9]+")
            .term("name", "~[a-z]+")
            .infix(",", ",", 1)
            .infix("+", "+", 2)
            .infix_or_prefix("-", "-", 2)
            .infix("%", "%", 3)
            .infix("*", "*", 3)
            .infix("/", "/", 3)
            .infix_right("^", "^", 4)
            .enclosure_with("(", ")", expr, "call", 5)
    });
    let grammar = builder.build().unwrap();
    let catalog = calculator::catalog().unwrap();

    let diagnostics = validate(&grammar, &catalog);
    assert_eq!(diagnostics, vec!["unresolvable action for '%'".to_string()]);
}

#[test]
fn test_nested_scope_operators_are_reachable() {
    let mut builder = GrammarBuilder::new();
    let list = builder.declare("list");
    let expr = builder.scope("expr", |s| {
        s.skip("~\\s+")
            .term("int", "~[0-9]+")
            .enclosure("[", "]", list)
    });
    builder.define(list, |s| {
        s.skip("~\\s+")
            .term("int", "~[0-9]+")
            .infix(",", ",", 1)
    });
    builder.root(expr);
    let grammar = builder.build().unwrap();

    let catalog = Catalog::<()>::builder()
        .term("int", |inv| Ok(inv.text().len() as i64))
        .result::<i64>()
        .build()
        .unwrap();
    let diagnostics = validate(&grammar, &catalog);
    assert_eq!(diagnostics, vec!["unresolvable action for ','".to_string()]);
}

#[test]
fn test_token_without_action_is_reported() {
    let mut builder = GrammarBuilder::new();
    builder.scope("expr", |s| s.term("int", "~[0-9]+").term("word", "~[a-z]+"));
    let grammar = builder.build().unwrap();
    let catalog = Catalog::<()>::builder()
        .term("int", |_| Ok(1i64))
        .build()
        .unwrap();

    assert_eq!(
        validate(&grammar, &catalog),
        vec!["missing token action for 'word'".to_string()]
    );
}
