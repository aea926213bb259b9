// Unit tests for selector resolution

use super::*;
use crate::document::FormDocument;
use pretty_assertions::assert_eq;

const PAGE: &str = r#"
<form>
  <label for="given">  First Name </label>
  <input id="given" name="first">
  <input id="email" name="contact">
  <input id="other" name="email">
  <input name="phone" id="phone-1">
  <input name="phone" id="phone-2">
  <label>Nested <input id="nested"></label>
  <label for="ghost">Ghost</label>
</form>
"#;

#[tokio::test]
async fn test_id_takes_precedence_over_name() {
    let doc = FormDocument::parse(PAGE);
    let selector =
        Selector::new(SelectorStrategy::Name, "email").with(SelectorStrategy::Id, "email");

    let resolved = resolve(&doc, &selector).await.unwrap().unwrap();
    assert_eq!(resolved.strategy, SelectorStrategy::Id);
    assert_eq!(Some(resolved.element), doc.find_by_id("email"));
}

#[tokio::test]
async fn test_falls_through_to_name() {
    let doc = FormDocument::parse(PAGE);
    let selector =
        Selector::new(SelectorStrategy::Id, "missing").with(SelectorStrategy::Name, "phone");

    let resolved = resolve(&doc, &selector).await.unwrap().unwrap();
    assert_eq!(resolved.strategy, SelectorStrategy::Name);
    // First in document order
    assert_eq!(Some(resolved.element), doc.find_by_id("phone-1"));
}

#[tokio::test]
async fn test_label_match_is_trimmed_and_case_insensitive() {
    let doc = FormDocument::parse(PAGE);
    let selector = Selector::new(SelectorStrategy::Label, "first name");

    let resolved = resolve(&doc, &selector).await.unwrap().unwrap();
    assert_eq!(resolved.strategy, SelectorStrategy::Label);
    assert_eq!(Some(resolved.element), doc.find_by_id("given"));
}

#[tokio::test]
async fn test_label_without_usable_target_resolves_nothing() {
    let doc = FormDocument::parse(PAGE);

    // Nested label has no for attribute
    let selector = Selector::new(SelectorStrategy::Label, "Nested");
    assert!(resolve(&doc, &selector).await.unwrap().is_none());

    // for points at an id that does not exist
    let selector = Selector::new(SelectorStrategy::Label, "ghost");
    assert!(resolve(&doc, &selector).await.unwrap().is_none());
}

#[tokio::test]
async fn test_no_match_is_none() {
    let doc = FormDocument::parse(PAGE);
    let selector = Selector::new(SelectorStrategy::Id, "nope")
        .with(SelectorStrategy::Name, "nope")
        .with(SelectorStrategy::Label, "nope");

    assert!(resolve(&doc, &selector).await.unwrap().is_none());
}
