// tests/text_title_normalize.rs
use health_news_digest::normalize::text::{clean, summarize};
use health_news_digest::normalize::title::{looks_generic, repair_title};

#[test]
fn empty_is_ok() {
    assert_eq!(clean(""), "");
    assert_eq!(summarize("", 60), "");
}

#[test]
fn strips_markup_and_folds_whitespace() {
    let s = "<div class=\"teaser\">Neue\u{00A0}Daten\n\n<b>zur</b>\tPflege</div>";
    assert_eq!(clean(s), "Neue Daten zur Pflege");
}

#[test]
fn clean_is_idempotent() {
    for s in [
        "  a  b  ",
        "<p>x</p><p>y</p>",
        "1 < 2 and 3 > 2",
        "<<script>>alert(1)<</script>>",
        "\u{00A0}\u{2003}text\u{00A0}",
    ] {
        let once = clean(s);
        assert_eq!(clean(&once), once, "input {s:?}");
    }
}

#[test]
fn summary_bound_holds() {
    let long = "Wort ".repeat(200);
    let s = summarize(&long, 60);
    assert_eq!(s.split_whitespace().count(), 60);
    assert!(s.ends_with('…'));
}

#[test]
fn dataset_placeholder_gets_first_sentence() {
    assert!(looks_generic("Dataset: Updated Data"));
    let t = repair_title(
        "ec.europa.eu",
        "Dataset: Updated Data",
        "Eurostat released Q3 figures today. More details follow.",
        "Eurostat",
    );
    assert_eq!(t, "Eurostat released Q3 figures today.");
}

#[test]
fn short_sentence_falls_back_to_source_label() {
    assert_eq!(
        repair_title("destatis.de", " news ", "Neu. Mehr folgt.", "Destatis"),
        "Destatis: Update"
    );
}
