//! Phase-ordered resolution with converters, allow-lists and declared subtypes.

use opgram::semantics::{Allow, CatalogBuilder};
use opgram::{Catalog, ErrorKind, Grammar, GrammarBuilder, Parser};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct TypeA(String);

#[derive(Debug, PartialEq)]
struct TypeB(String);

#[derive(Debug, PartialEq)]
struct TypeC(String);

#[derive(Debug, PartialEq)]
struct Combined(String);

fn grammar() -> Grammar {
    let mut builder = GrammarBuilder::new();
    builder.scope("expr", |s| {
        s.skip("~\\s+")
            .term("b", "~b[0-9]*")
            .term("c", "~c[0-9]*")
            .infix("+", "+", 1)
    });
    builder.build().unwrap()
}

/// Terms: `b..` yields TypeB, `c..` yields TypeC. No term yields TypeA.
fn base() -> CatalogBuilder<()> {
    Catalog::<()>::builder()
        .term("b", |inv| Ok(TypeB(inv.text().to_string())))
        .term("c", |inv| Ok(TypeC(inv.text().to_string())))
        .result::<Combined>()
}

fn combine(_: &opgram::Invocation<'_, ()>, a: TypeA, b: TypeB) -> Result<Combined, opgram::ActionError> {
    Ok(Combined(format!("{}+{}", a.0, b.0)))
}

fn parser(catalog: CatalogBuilder<()>) -> Parser<()> {
    Parser::new(Arc::new(grammar()), Arc::new(catalog.build().unwrap()))
}

#[test]
fn test_left_operand_is_converted() {
    let parser = parser(
        base()
            .binary("+", combine)
            .converter("c_to_a", |_, c: TypeC| Ok(TypeA(format!("A({})", c.0)))),
    );
    let value: Combined = parser.parse(&(), "c1 + b2").unwrap();
    assert_eq!(value, Combined("A(c1)+b2".to_string()));
}

#[test]
fn test_missing_converter_is_a_type_error() {
    let parser = parser(base().binary("+", combine));
    let err = parser.parse::<Combined>(&(), "c1 + b2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert!(err.message().contains("'+'"), "{}", err.message());
    assert!(err.message().contains("Combined"), "{}", err.message());
}

#[test]
fn test_allow_list_blocks_converter() {
    let parser = parser(
        base()
            .binary_from("+", Allow::none(), Allow::Any, combine)
            .converter("c_to_a", |_, c: TypeC| Ok(TypeA(c.0))),
    );
    let err = parser.parse::<Combined>(&(), "c1 + b2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);

    let parser = parser_with_named_allow();
    assert_eq!(
        parser.parse::<Combined>(&(), "c1 + b2").unwrap(),
        Combined("c1+b2".to_string())
    );
}

fn parser_with_named_allow() -> Parser<()> {
    parser(
        base()
            .binary_from("+", Allow::only(["c_to_a"]), Allow::Any, combine)
            .converter("c_to_a", |_, c: TypeC| Ok(TypeA(c.0))),
    )
}

#[test]
fn test_direct_candidate_beats_earlier_converted_one() {
    let parser = parser(
        base()
            .binary("+", combine)
            .binary("+", |_, c: TypeC, b: TypeB| Ok(Combined(format!("direct {} {}", c.0, b.0))))
            .converter("c_to_a", |_, c: TypeC| Ok(TypeA(c.0))),
    );
    assert_eq!(
        parser.parse::<Combined>(&(), "c1 + b2").unwrap(),
        Combined("direct c1 b2".to_string())
    );
}

#[test]
fn test_declared_subtype_needs_no_converter() {
    let parser = parser(
        base()
            .binary("+", combine)
            .subtype::<TypeC, TypeA, _>(|c| TypeA(format!("sub {}", c.0))),
    );
    assert_eq!(
        parser.parse::<Combined>(&(), "c1 + b2").unwrap(),
        Combined("sub c1+b2".to_string())
    );
}

#[test]
fn test_conversions_are_single_hop() {
    #[derive(Debug)]
    struct TypeD(String);

    let parser = parser(
        base()
            .binary("+", combine)
            .converter("c_to_d", |_, c: TypeC| Ok(TypeD(c.0)))
            .converter("d_to_a", |_, d: TypeD| Ok(TypeA(d.0))),
    );
    let err = parser.parse::<Combined>(&(), "c1 + b2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_rejecting_converter_ends_resolution() {
    let parser = parser(
        base()
            .binary("+", combine)
            .converter("c_to_a", |_, c: TypeC| {
                Err::<TypeA, _>(opgram::ActionError::Reject(format!("{} is not an A", c.0)))
            }),
    );
    let err = parser.parse::<Combined>(&(), "c1 + b2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.message(), "c1 is not an A");
}

#[derive(Debug, PartialEq)]
struct Celsius(i64);

#[derive(Debug, PartialEq)]
struct Kelvin(i64);

#[derive(Default)]
struct Calls {
    terms: AtomicUsize,
    sums: AtomicUsize,
    conversions: AtomicUsize,
}

/// Terms yield Celsius, `+` only adds Kelvin, so every right operand goes through the converter.
fn kelvin_sums() -> Parser<Calls> {
    let mut builder = GrammarBuilder::new();
    builder.scope("expr", |s| {
        s.skip("~\\s+")
            .term("num", "~[0-9]+")
            .infix("+", "+", 1)
    });
    let catalog = Catalog::<Calls>::builder()
        .term("num", |inv| {
            inv.context.terms.fetch_add(1, Ordering::Relaxed);
            Ok(Celsius(inv.text().parse().unwrap_or_default()))
        })
        .binary("+", |inv, a: Kelvin, b: Kelvin| {
            inv.context.sums.fetch_add(1, Ordering::Relaxed);
            Ok(Kelvin(a.0 + b.0))
        })
        .converter("kelvin", |inv, c: Celsius| {
            inv.context.conversions.fetch_add(1, Ordering::Relaxed);
            Ok(Kelvin(c.0 + 273))
        })
        .result::<Kelvin>()
        .build()
        .unwrap();
    Parser::new(Arc::new(builder.build().unwrap()), Arc::new(catalog))
}

#[test]
fn test_long_converted_chain_runs_each_action_once() {
    let parser = kelvin_sums();
    let calls = Calls::default();
    let input = vec!["1"; 200].join(" + ");

    let value: Kelvin = parser.parse(&calls, &input).unwrap();
    assert_eq!(value, Kelvin(200 * 274));
    assert_eq!(calls.terms.load(Ordering::Relaxed), 200);
    assert_eq!(calls.sums.load(Ordering::Relaxed), 199);
    assert_eq!(calls.conversions.load(Ordering::Relaxed), 200);
}
