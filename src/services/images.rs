//! Image selection for newly created events.
//!
//! Selection among a matched category's pool is uniformly random, so this
//! module is intentionally non-deterministic: the chosen URL must be persisted
//! at event-creation time and never re-derived for display.

use rand::Rng;

static CONCERT_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1501386761578-eac5c94b800a?w=1200",
    "https://images.unsplash.com/photo-1470229722913-7c0e2dbbafd3?w=1200",
    "https://images.unsplash.com/photo-1459749411175-04bf5292ceea?w=1200",
    "https://images.unsplash.com/photo-1429962714451-bb934ecdc4ec?w=1200",
];

static THEATRE_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1503095396549-807759245b35?w=1200",
    "https://images.unsplash.com/photo-1507676184212-d03ab07a01bf?w=1200",
    "https://images.unsplash.com/photo-1580809361436-42a7ec204889?w=1200",
];

static FESTIVAL_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1533174072545-7a4b6ad7a6c3?w=1200",
    "https://images.unsplash.com/photo-1506157786151-b8491531f063?w=1200",
    "https://images.unsplash.com/photo-1537905569824-f89f14cceb68?w=1200",
];

static SPORT_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1461896836934-ffe607ba8211?w=1200",
    "https://images.unsplash.com/photo-1579952363873-27f3bade9f55?w=1200",
    "https://images.unsplash.com/photo-1517649763962-0c623066013b?w=1200",
];

static EXHIBITION_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1531058020387-3be344556be6?w=1200",
    "https://images.unsplash.com/photo-1554907984-15263bfd63bd?w=1200",
    "https://images.unsplash.com/photo-1545989253-02cc26577f88?w=1200",
];

static CONFERENCE_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1540575467063-178a50c2df87?w=1200",
    "https://images.unsplash.com/photo-1587825140708-dfaf72ae4b04?w=1200",
    "https://images.unsplash.com/photo-1515187029135-18ee286d815b?w=1200",
];

static DEFAULT_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1492684223066-81342ee5ff30?w=1200",
    "https://images.unsplash.com/photo-1514525253161-7a46d19cd819?w=1200",
    "https://images.unsplash.com/photo-1511795409834-ef04bbd61622?w=1200",
];

/// Category keys and their candidate pools, matched after normalization
static CATEGORY_POOLS: &[(&str, &[&str])] = &[
    ("concert", CONCERT_IMAGES),
    ("theatre", THEATRE_IMAGES),
    ("festival", FESTIVAL_IMAGES),
    ("sport", SPORT_IMAGES),
    ("exposition", EXHIBITION_IMAGES),
    ("conference", CONFERENCE_IMAGES),
];

fn strip_diacritic(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' | 'õ' => 'o',
        'û' | 'ü' | 'ù' | 'ú' => 'u',
        'ç' => 'c',
        'ÿ' => 'y',
        'ñ' => 'n',
        other => other,
    }
}

/// Lower-cases and strips diacritics so "Théâtre" and "theatre" compare equal.
pub(crate) fn normalize_category(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_diacritic)
        .collect()
}

/// Candidate pool for a category: exact match first, then substring match
/// against known keys, then the default pool.
pub fn pool_for_category(category: &str) -> &'static [&'static str] {
    let normalized = normalize_category(category);
    if normalized.is_empty() {
        return DEFAULT_IMAGES;
    }

    for (key, pool) in CATEGORY_POOLS {
        if normalized == *key {
            return pool;
        }
    }

    for (key, pool) in CATEGORY_POOLS {
        if normalized.contains(key) || key.contains(normalized.as_str()) {
            return pool;
        }
    }

    DEFAULT_IMAGES
}

/// Picks a random image URL for the category. Callers persist the result.
pub fn image_for_category(category: &str) -> &'static str {
    let pool = pool_for_category(category);
    let idx = rand::thread_rng().gen_range(0..pool.len());
    pool[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accents_and_case_resolve_to_the_same_pool() {
        assert_eq!(pool_for_category("Théâtre"), pool_for_category("theatre"));
        assert_eq!(pool_for_category("THEATRE"), THEATRE_IMAGES);
        assert_eq!(pool_for_category("Exposition"), EXHIBITION_IMAGES);
    }

    #[test]
    fn substring_match_falls_back_to_known_keys() {
        assert_eq!(pool_for_category("concert de rock"), CONCERT_IMAGES);
        assert_eq!(pool_for_category("festivals"), FESTIVAL_IMAGES);
    }

    #[test]
    fn unknown_category_uses_default_pool() {
        assert_eq!(pool_for_category("unknown-category"), DEFAULT_IMAGES);
        let url = image_for_category("unknown-category");
        assert!(DEFAULT_IMAGES.contains(&url));
    }

    #[test]
    fn empty_category_uses_default_pool() {
        assert_eq!(pool_for_category(""), DEFAULT_IMAGES);
        assert_eq!(pool_for_category("   "), DEFAULT_IMAGES);
    }

    #[test]
    fn selection_stays_inside_the_matched_pool() {
        for _ in 0..50 {
            let url = image_for_category("Sport");
            assert!(SPORT_IMAGES.contains(&url));
        }
    }

    #[test]
    fn normalization_strips_diacritics() {
        assert_eq!(normalize_category("Théâtre"), "theatre");
        assert_eq!(normalize_category("  Exposição "), "exposicao");
    }
}
