use kifprep::{Formula, Term, is_balanced, parse_kif, parse_kif_with_source, parse_term};

#[test]
fn parser_reads_several_forms() {
    let src = r#"
        ; taxonomy
        (subclass Dog Mammal)
        (=> (instance ?X Dog) (instance ?X Mammal))
    "#;

    let terms = parse_kif(src).expect("parse should succeed");
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].to_string(), "(subclass Dog Mammal)");
    assert_eq!(terms[1].head(), Some("=>"));
}

#[test]
fn quoted_strings_stay_single_atoms() {
    let t = parse_term(r#"(documentation Dog "A (domestic) \"canine\"; loyal")"#)
        .expect("parse should succeed");
    assert_eq!(t.args().len(), 2);
    assert!(t.args()[1].is_quoted_string());
    assert!(t.contains_quoted_string());
}

#[test]
fn unterminated_string_is_a_syntax_error() {
    let errors = parse_kif(r#"(documentation Dog "never closed)"#).expect_err("parse should fail");
    assert!(errors.iter().any(|d| d.code == "E-SYNTAX"));
    assert!(errors.iter().any(|d| d.span.is_some()));
}

#[test]
fn unbalanced_parentheses_are_reported() {
    let errors = parse_kif("(=> (p ?X) (q ?X)").expect_err("parse should fail");
    assert!(errors.iter().all(|d| d.code == "E-SYNTAX"));

    let errors = parse_kif("(p a))").expect_err("parse should fail");
    assert!(errors.iter().any(|d| d.message.contains("')'")));
}

#[test]
fn parse_term_requires_exactly_one_form() {
    assert!(parse_term("(p a) (q b)").is_err());
    assert!(parse_term("   ").is_err());
    assert_eq!(parse_term("Dog").expect("atom"), Term::atom("Dog"));
}

#[test]
fn source_positions_are_attached() {
    let src = "(subclass Dog Mammal)\n\n(subclass Mammal Animal)\n";
    let formulas = parse_kif_with_source(src, Some("mammals.kif")).expect("parse");

    assert_eq!(formulas.len(), 2);
    assert_eq!(formulas[0].start_line, Some(1));
    assert_eq!(formulas[1].start_line, Some(3));
    assert_eq!(formulas[1].source_file.as_deref(), Some("mammals.kif"));
}

#[test]
fn syntax_errors_carry_the_source_file() {
    let errors = parse_kif_with_source("(p a", Some("broken.kif")).expect_err("parse should fail");
    assert_eq!(errors[0].source(), Some("broken.kif"));
}

#[test]
fn balance_check_ignores_quoted_and_commented_parens() {
    assert!(is_balanced(r#"(p "(" a)"#));
    assert!(is_balanced("(p a) ; )))"));
    assert!(!is_balanced("(p a"));
    assert!(!is_balanced(")("));
    assert!(!is_balanced(r#"(p "a)"#));
}

#[test]
fn formula_keeps_text_even_when_malformed() {
    let bad = Formula::parse("(p a");
    assert!(bad.term().is_none());
    assert_eq!(bad.text(), "(p a");

    let good = Formula::parse("(p a)");
    assert_eq!(good.term(), Some(&Term::app("p", vec![Term::atom("a")])));
}
