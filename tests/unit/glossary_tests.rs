/*!
 * Tests for glossary files and term pinning
 */

use serde_json::json;

use doctrans::translation::glossary::GlossaryTable;
use crate::common;

/// Test loading a YAML glossary with a list of term objects
#[test]
fn test_load_yamlTermsList_shouldParseEveryEntry() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "glossary.yml",
        "terms:\n  - source: pull request\n    target: demande de tirage\n  - source: commit\n    target: commit\n  - source: broken\n",
    )?;

    let glossary = GlossaryTable::load(&path)?;
    assert_eq!(glossary.len(), 2);
    assert_eq!(glossary.entries()[0].source, "pull request");
    assert_eq!(glossary.entries()[1].target, "commit");
    Ok(())
}

/// Test building a glossary from an already parsed document
#[test]
fn test_fromValue_flatMapping_shouldSortLongestFirst() {
    let glossary = GlossaryTable::from_value(&json!({
        "AI": "IA",
        "Machine Learning": "apprentissage automatique",
        "ML": 12
    }));
    let sources: Vec<&str> = glossary.entries().iter().map(|e| e.source.as_str()).collect();
    assert_eq!(sources, vec!["Machine Learning", "AI"]);
}

/// Test that an empty document yields an empty glossary
#[test]
fn test_fromValue_nullTerms_shouldBeEmpty() {
    assert!(GlossaryTable::from_value(&json!({ "terms": null })).is_empty());
    assert!(GlossaryTable::from_value(&json!("just a string")).is_empty());
}

/// Test resolving and enforcing pins on a multi-term text
#[test]
fn test_resolveThenEnforce_withMixedCasing_shouldPinEveryTerm() {
    let glossary = GlossaryTable::from_pairs([
        ("pull request", "demande de tirage"),
        ("Commit", "commit"),
    ]);
    let hints = glossary.resolve("Open a Pull Request after each commit.");
    assert_eq!(hints.len(), 2);

    let enforced = glossary.enforce("Ouvrez une PULL REQUEST après chaque commit.", &hints);
    assert_eq!(enforced.text, "Ouvrez une demande de tirage après chaque commit.");
    assert_eq!(enforced.replaced, 1);
    assert_eq!(enforced.applied.len(), 2);
}

/// Test that terms absent from the text produce no hints
#[test]
fn test_resolve_absentTerms_shouldProduceNoHints() {
    let glossary = GlossaryTable::from_pairs([("kernel", "noyau")]);
    let hints = glossary.resolve("The kernels are loaded at boot.");
    assert!(hints.is_empty());
    let enforced = glossary.enforce("Les kernels sont chargés.", &hints);
    assert_eq!(enforced.text, "Les kernels sont chargés.");
    assert!(enforced.applied.is_empty());
}
