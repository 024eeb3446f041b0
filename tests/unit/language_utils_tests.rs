/*!
 * Tests for language utility functions
 */

use doctrans::language_utils::{display_name, get_language_name, language_codes_match, normalize_to_part2t};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("ar").unwrap(), "ara");
    assert_eq!(normalize_to_part2t("fra").unwrap(), "fra");
    assert_eq!(normalize_to_part2t(" DE ").unwrap(), "deu");

    // Bibliographic variants map to terminology codes
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");

    assert!(normalize_to_part2t("zz").is_err());
    assert!(normalize_to_part2t("123").is_err());
    assert!(normalize_to_part2t("e").is_err());
}

/// Test matching of language codes
#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fr", "fre"));
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("zz", "zz"));
}

/// Test language names used in prompts
#[test]
fn test_get_language_name_withValidCodes_shouldReturnEnglishName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("fra").unwrap(), "French");
    assert_eq!(display_name("de"), "German");
    assert_eq!(display_name("tlh-x"), "tlh-x");
}
