//! Scraper that reconstructs a camera list from third-party script source text.
//!
//! The feed is the raw source of a remote script, so it is never executed —
//! only three statement shapes are recognized, via regex pattern matching,
//! and everything else in the text is ignored:
//!
//! 1. `<ident>.push("<id>");` — append `<id>` to the active list.
//! 2. `<ident>["<id>"] = {};` — establish a record for `<id>`.
//! 3. `<ident>["<id>"]["<prop>"] = "<value>";` — assign a record property.
//!
//! Each shape also comes in a single-quoted variant. Malformed fragments are
//! simply not matched; the only terminal failure is an empty active list.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::types::{default_title, CameraList, CameraRecord, FeedDefaults, FeedError, FeedResult};

/// Metadata collected for one record id before backfill.
#[derive(Debug, Default)]
struct PartialRecord {
    title: Option<String>,
    owner: Option<String>,
    url: Option<String>,
}

/// Parse feed text into a materialized camera list.
///
/// Output order follows first-seen push order with duplicates removed; ids
/// that were initialized or assigned but never pushed are dropped, and pushed
/// ids missing metadata are backfilled from `defaults`. Pure function of its
/// inputs — parsing the same text twice yields value-equal lists.
///
/// Fails with [`FeedError::NoActiveFeeds`] when the text contains no push
/// statements at all (including empty or whitespace-only input).
pub fn parse_feed(text: &str, defaults: &FeedDefaults) -> FeedResult<CameraList> {
    let active = scan_active_ids(text);
    if active.is_empty() {
        return Err(FeedError::NoActiveFeeds);
    }

    let mut partials = scan_records(text);

    let records = active
        .into_iter()
        .map(|id| {
            let partial = partials.remove(&id).unwrap_or_default();
            let title = non_empty(partial.title).unwrap_or_else(|| default_title(&id));
            let owner = non_empty(partial.owner).unwrap_or_else(|| defaults.owner.clone());
            let source_url = non_empty(partial.url).unwrap_or_else(|| defaults.homepage.clone());
            CameraRecord {
                id,
                title,
                owner,
                source_url,
            }
        })
        .collect();

    Ok(CameraList::new(records))
}

/// An assigned empty string counts as missing, mirroring the `||` fallback
/// the feed's own consumers apply.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Collect active camera ids in first-seen order, de-duplicated.
///
/// Both quote variants are scanned separately (the regex crate has no
/// backreferences), then merged by match offset so document order is kept
/// across variants.
fn scan_active_ids(text: &str) -> Vec<String> {
    let double = Regex::new(r#"[A-Za-z_$][A-Za-z0-9_$]*\s*\.\s*push\s*\(\s*"([^"]+)"\s*\)\s*;"#)
        .expect("valid regex");
    let single = Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*\s*\.\s*push\s*\(\s*'([^']+)'\s*\)\s*;")
        .expect("valid regex");

    let mut hits: Vec<(usize, String)> = Vec::new();
    for re in [&double, &single] {
        for cap in re.captures_iter(text) {
            if let (Some(whole), Some(id)) = (cap.get(0), cap.get(1)) {
                hits.push((whole.start(), id.as_str().to_string()));
            }
        }
    }
    hits.sort_by_key(|(offset, _)| *offset);

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for (_, id) in hits {
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    ids
}

/// Collect record initializations and property assignments.
///
/// Initialization establishes that a record exists even with no metadata.
/// Assignments apply wherever they appear in the text, in document order
/// across both quote variants, so the last write wins per (id, property).
/// Only `title`, `owner`, and `url` are meaningful; other property names are
/// ignored.
fn scan_records(text: &str) -> HashMap<String, PartialRecord> {
    let init_double = Regex::new(
        r#"[A-Za-z_$][A-Za-z0-9_$]*\s*\[\s*"([^"]+)"\s*\]\s*=\s*\{\s*\}\s*;"#,
    )
    .expect("valid regex");
    let init_single =
        Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*\s*\[\s*'([^']+)'\s*\]\s*=\s*\{\s*\}\s*;")
            .expect("valid regex");

    let assign_double = Regex::new(
        r#"[A-Za-z_$][A-Za-z0-9_$]*\s*\[\s*"([^"]+)"\s*\]\s*\[\s*"([^"]+)"\s*\]\s*=\s*"([^"]*)"\s*;"#,
    )
    .expect("valid regex");
    let assign_single = Regex::new(
        r"[A-Za-z_$][A-Za-z0-9_$]*\s*\[\s*'([^']+)'\s*\]\s*\[\s*'([^']+)'\s*\]\s*=\s*'([^']*)'\s*;",
    )
    .expect("valid regex");

    let mut records: HashMap<String, PartialRecord> = HashMap::new();

    for re in [&init_double, &init_single] {
        for cap in re.captures_iter(text) {
            if let Some(id) = cap.get(1) {
                records.entry(id.as_str().to_string()).or_default();
            }
        }
    }

    let mut assignments: Vec<(usize, String, String, String)> = Vec::new();
    for re in [&assign_double, &assign_single] {
        for cap in re.captures_iter(text) {
            if let (Some(whole), Some(id), Some(prop), Some(value)) =
                (cap.get(0), cap.get(1), cap.get(2), cap.get(3))
            {
                assignments.push((
                    whole.start(),
                    id.as_str().to_string(),
                    prop.as_str().to_string(),
                    value.as_str().to_string(),
                ));
            }
        }
    }
    assignments.sort_by_key(|(offset, ..)| *offset);

    for (_, id, prop, value) in assignments {
        let record = records.entry(id).or_default();
        match prop.as_str() {
            "title" => record.title = Some(value),
            "owner" => record.owner = Some(value),
            "url" => record.url = Some(value),
            _ => {}
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> FeedDefaults {
        FeedDefaults {
            owner: "Campus Services".to_string(),
            homepage: "https://example.edu/webcams".to_string(),
        }
    }

    #[test]
    fn test_end_to_end_example() {
        let text = r#"cams["north"] = {};
            cams["north"]["title"] = "North Green";
            cams["north"]["owner"] = "Facilities";
            randCams.push("north");
            randCams.push("south");"#;
        let list = parse_feed(text, &defaults()).unwrap();

        assert_eq!(list.len(), 2);
        let north = list.get(0).unwrap();
        assert_eq!(north.id, "north");
        assert_eq!(north.title, "North Green");
        assert_eq!(north.owner, "Facilities");
        assert_eq!(north.source_url, "https://example.edu/webcams");

        let south = list.get(1).unwrap();
        assert_eq!(south.id, "south");
        assert_eq!(south.title, "Camera south");
        assert_eq!(south.owner, "Campus Services");
        assert_eq!(south.source_url, "https://example.edu/webcams");
    }

    #[test]
    fn test_output_order_follows_push_order() {
        let text = r#"
            cams["b"] = {};
            cams["a"] = {};
            cams["a"]["title"] = "A";
            list.push("c");
            list.push("a");
            list.push("b");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        let ids: Vec<&str> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_duplicate_push_first_seen_wins() {
        let text = r#"list.push("a"); list.push("b"); list.push("a");"#;
        let list = parse_feed(text, &defaults()).unwrap();
        let ids: Vec<&str> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_inactive_records_dropped() {
        let text = r#"
            cams["ghost"] = {};
            cams["ghost"]["title"] = "Never Shown";
            list.push("real");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.position_of("ghost").is_none());
    }

    #[test]
    fn test_active_without_metadata_gets_full_defaults() {
        let list = parse_feed(r#"list.push("bare");"#, &defaults()).unwrap();
        let cam = list.get(0).unwrap();
        assert_eq!(cam.title, "Camera bare");
        assert_eq!(cam.owner, "Campus Services");
        assert_eq!(cam.source_url, "https://example.edu/webcams");
    }

    #[test]
    fn test_single_quote_variants() {
        let text = r#"
            cams['east'] = {};
            cams['east']['title'] = 'East Lawn';
            list.push('east');
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        let cam = list.get(0).unwrap();
        assert_eq!(cam.id, "east");
        assert_eq!(cam.title, "East Lawn");
    }

    #[test]
    fn test_mixed_quote_styles_keep_document_order() {
        let text = r#"list.push('first'); list.push("second"); list.push('third');"#;
        let list = parse_feed(text, &defaults()).unwrap();
        let ids: Vec<&str> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn test_last_write_wins_per_property() {
        let text = r#"
            cams["a"]["title"] = "Old";
            cams["a"]["title"] = "New";
            list.push("a");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.get(0).unwrap().title, "New");
    }

    #[test]
    fn test_last_write_wins_across_quote_variants() {
        let text = r#"
            cams['a']['owner'] = 'First';
            cams["a"]["owner"] = "Second";
            list.push("a");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.get(0).unwrap().owner, "Second");
    }

    #[test]
    fn test_assignment_without_initialization_applies() {
        let text = r#"
            cams["a"]["url"] = "https://cdn.example.edu/a.jpg";
            list.push("a");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.get(0).unwrap().source_url, "https://cdn.example.edu/a.jpg");
    }

    #[test]
    fn test_unknown_properties_ignored() {
        let text = r#"
            cams["a"]["zoom"] = "2";
            cams["a"]["ptz"] = "yes";
            list.push("a");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.get(0).unwrap().title, "Camera a");
    }

    #[test]
    fn test_assigned_empty_string_backfills() {
        let text = r#"
            cams["a"]["title"] = "";
            list.push("a");
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.get(0).unwrap().title, "Camera a");
    }

    #[test]
    fn test_empty_input_is_no_active_feeds() {
        assert!(matches!(
            parse_feed("", &defaults()),
            Err(FeedError::NoActiveFeeds)
        ));
    }

    #[test]
    fn test_whitespace_only_input_is_no_active_feeds() {
        assert!(matches!(
            parse_feed("   \n\t  \n", &defaults()),
            Err(FeedError::NoActiveFeeds)
        ));
    }

    #[test]
    fn test_records_without_pushes_is_no_active_feeds() {
        let text = r#"cams["a"] = {}; cams["a"]["title"] = "A";"#;
        assert!(matches!(
            parse_feed(text, &defaults()),
            Err(FeedError::NoActiveFeeds)
        ));
    }

    #[test]
    fn test_malformed_fragments_are_skipped() {
        // First push is missing its closing punctuation; only the second
        // parses.
        let text = "list.push(\"broken\"\nlist.push(\"whole\");";
        let list = parse_feed(text, &defaults()).unwrap();
        let ids: Vec<&str> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["whole"]);
    }

    #[test]
    fn test_surrounding_noise_is_ignored() {
        let text = r#"
            var x = 12; function shuffle(a) { return a; }
            cams["quad"] = {};
            cams["quad"]["title"] = "The Quad";
            if (true) { randCams.push("quad"); }
        "#;
        let list = parse_feed(text, &defaults()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().title, "The Quad");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = r#"
            cams["a"]["title"] = "A";
            list.push("a");
            list.push("b");
        "#;
        let first = parse_feed(text, &defaults()).unwrap();
        let second = parse_feed(text, &defaults()).unwrap();
        assert_eq!(first, second);
    }
}
