//! End-to-end determinism and structure of seeded documents.

use md_seed::{CrdtDoc, DEFAULT_ROOT, NodeContent, OpId, SeedOptions, Seeder, seed_initial_state};

const RICH: SeedOptions = SeedOptions { rich_editor: true };

fn seeded(peer: u64, content: &str) -> CrdtDoc {
    let mut doc = CrdtDoc::new(peer);
    seed_initial_state(&mut doc, content, &RICH).expect("seeding well-formed markdown");
    doc
}

fn root_kinds(doc: &CrdtDoc) -> Vec<String> {
    doc.root_children(DEFAULT_ROOT)
        .expect("default root is attached")
        .iter()
        .map(|id| kind_of(doc, id))
        .collect()
}

fn kind_of(doc: &CrdtDoc, id: &OpId) -> String {
    match &doc.node(DEFAULT_ROOT, id).expect("child exists").content {
        NodeContent::Element { kind, .. } => kind.clone(),
        NodeContent::Text { .. } => "text".to_string(),
    }
}

#[test]
fn two_invocations_produce_identical_update_bytes() {
    let source = "# Title\n\nBody with *emphasis*.\n\n\n\n- one\n- two\n";
    let first = seeded(1, source).encode_update().expect("encodable");
    let second = seeded(2, source).encode_update().expect("encodable");
    assert_eq!(first, second);
}

#[test]
fn seeding_the_same_target_twice_is_idempotent() {
    let mut doc = CrdtDoc::new(3);
    seed_initial_state(&mut doc, "A\n\nB", &RICH).expect("first seed");
    let once = doc.encode_update().expect("encodable");
    seed_initial_state(&mut doc, "A\n\nB", &RICH).expect("second seed");
    let twice = doc.encode_update().expect("encodable");
    assert_eq!(once, twice);
}

#[test]
fn seeded_structure_mirrors_the_markdown() {
    let doc = seeded(1, "# Hi\n\nWorld");
    assert_eq!(root_kinds(&doc), vec!["heading", "paragraph", "paragraph"]);

    let children = doc.root_children(DEFAULT_ROOT).unwrap();
    let heading = doc.node(DEFAULT_ROOT, &children[0]).unwrap();
    let NodeContent::Element { attrs, .. } = &heading.content else {
        panic!("heading is an element");
    };
    assert_eq!(attrs.get("level").map(String::as_str), Some("1"));

    let text_id = heading.children[0];
    let NodeContent::Text { text, marks } = &doc.node(DEFAULT_ROOT, &text_id).unwrap().content
    else {
        panic!("heading child is text");
    };
    assert_eq!(text, "Hi");
    assert!(marks.is_empty());
}

#[test]
fn inline_marks_survive_the_mirror() {
    let doc = seeded(1, "go [here](https://x.test)");
    let children = doc.root_children(DEFAULT_ROOT).unwrap();
    let paragraph = doc.node(DEFAULT_ROOT, &children[0]).unwrap();
    let linked = paragraph
        .children
        .iter()
        .find_map(|id| {
            let NodeContent::Text { text, marks } = &doc.node(DEFAULT_ROOT, id).unwrap().content
            else {
                return None;
            };
            (text == "here").then(|| marks.clone())
        })
        .expect("link text is mirrored");
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].kind, "link");
    assert_eq!(
        linked[0].attrs.get("href").map(String::as_str),
        Some("https://x.test")
    );
}

#[test]
fn unattached_shared_root_seeds_an_empty_document() {
    let mut scratch = CrdtDoc::detached(0);
    let tree = md_seed::InitialDocumentBuilder::default()
        .build("content", true)
        .expect("buildable");
    Seeder::mirror(&mut scratch, &tree).expect("no-op fallback is not an error");

    let update = scratch.encode_update().expect("encodable");
    let mut target = CrdtDoc::new(4);
    target.apply_update(&update).expect("appliable");
    assert_eq!(target.root_children(DEFAULT_ROOT).unwrap(), &[] as &[OpId]);
}

#[test]
fn empty_content_still_seeds_the_trailing_paragraph() {
    let doc = seeded(1, "");
    assert_eq!(root_kinds(&doc), vec!["paragraph"]);
}
