//! Interpretation lookups built on top of search.
//!
//! Queries are phrased in the corpus language (term names localized first) and the
//! winning paragraph is translated into the caller's language. A lookup that finds
//! nothing relevant returns `None`.

use crate::search::SearchOptions;
use crate::service::IndexService;
use crate::translate::{translate_term, translate_text, Category, Language};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub source: String,
    pub text: String,
    pub relevance: f64,
}

/// A planet's placement as computed elsewhere. Names are canonical English.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub planet: String,
    pub sign: String,
    pub house: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectLink {
    pub planet1: String,
    pub planet2: String,
    pub aspect: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub houses: Vec<u8>,
    #[serde(default)]
    pub aspects: Vec<AspectLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectInterpretation {
    #[serde(flatten)]
    pub link: AspectLink,
    pub interpretation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartInterpretations {
    pub planets: BTreeMap<String, String>,
    pub houses: BTreeMap<u8, Interpretation>,
    pub aspects: Vec<AspectInterpretation>,
}

fn top_match(service: &IndexService, query: &str, language: Language) -> Option<Interpretation> {
    let opts = SearchOptions { limit: 1, ..SearchOptions::default() };
    let best = service.search(query, opts).into_iter().next()?;
    let corpus_lang = service.corpus_language();
    let text = if language == corpus_lang {
        best.paragraph
    } else {
        translate_text(&best.paragraph, language, corpus_lang)
    };
    Some(Interpretation { source: best.source, text, relevance: best.score })
}

pub fn planet(
    service: &IndexService,
    planet: &str,
    sign: &str,
    house: u8,
    language: Language,
) -> Option<String> {
    let lang = service.corpus_language();
    let planet = translate_term(planet, Category::Planet, lang);
    let sign = translate_term(sign, Category::Sign, lang);
    let query = match lang {
        Language::Pt => format!("{planet} em {sign} na casa {house}"),
        _ => format!("{planet} in {sign} in house {house}"),
    };
    top_match(service, &query, language).map(|i| i.text)
}

pub fn aspect(
    service: &IndexService,
    planet1: &str,
    planet2: &str,
    aspect: &str,
    language: Language,
) -> Option<String> {
    let lang = service.corpus_language();
    let query = format!(
        "{} {} {}",
        translate_term(planet1, Category::Planet, lang),
        translate_term(aspect, Category::Aspect, lang),
        translate_term(planet2, Category::Planet, lang),
    );
    top_match(service, &query, language).map(|i| i.text)
}

pub fn sign(service: &IndexService, sign: &str, language: Language) -> Option<Interpretation> {
    let lang = service.corpus_language();
    let local = translate_term(sign, Category::Sign, lang);
    let query = match lang {
        Language::Pt => format!("signo de {local} características"),
        _ => format!("{local} sign characteristics"),
    };
    top_match(service, &query, language)
}

pub fn house(service: &IndexService, house: u8, language: Language) -> Option<Interpretation> {
    let query = match service.corpus_language() {
        Language::Pt => format!("casa {house} astrologia"),
        _ => format!("house {house} astrology"),
    };
    top_match(service, &query, language)
}

pub fn transit(
    service: &IndexService,
    transit_planet: &str,
    natal_planet: &str,
    aspect: &str,
    language: Language,
) -> Option<Interpretation> {
    let lang = service.corpus_language();
    let p1 = translate_term(transit_planet, Category::Planet, lang);
    let p2 = translate_term(natal_planet, Category::Planet, lang);
    let asp = translate_term(aspect, Category::Aspect, lang);
    let query = match lang {
        Language::Pt => format!("trânsito {p1} {asp} {p2}"),
        _ => format!("transit {p1} {asp} {p2}"),
    };
    top_match(service, &query, language)
}

/// Look up every placement, house and aspect of a chart; entries with no match are left out.
pub fn chart(service: &IndexService, summary: &ChartSummary, language: Language) -> ChartInterpretations {
    let mut out = ChartInterpretations::default();
    for p in &summary.placements {
        if let Some(text) = planet(service, &p.planet, &p.sign, p.house, language) {
            out.planets.insert(p.planet.clone(), text);
        }
    }
    for &h in &summary.houses {
        if let Some(interp) = house(service, h, language) {
            out.houses.insert(h, interp);
        }
    }
    for link in &summary.aspects {
        if let Some(text) = aspect(service, &link.planet1, &link.planet2, &link.aspect, language) {
            out.aspects.push(AspectInterpretation { link: link.clone(), interpretation: text });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn english_service() -> (TempDir, IndexService) {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("planets.txt"),
            "The Sun in Aries in house 1 gives courage, a pioneering spirit, fast reflexes \
             and restless ambition for new beginnings.\n\n\
             The Moon in Cancer seeks emotional safety at home.\n\n\
             Mars square Saturn brings friction between drive and discipline.\n\n\
             Leo sign characteristics: warmth, pride and generosity.\n\n\
             House 10 astrology describes career, public reputation, authority figures, \
             ambitions and long term goals.\n\n\
             A transit of Jupiter trine the natal Venus opens doors.",
        )
        .unwrap();
        let cfg = EngineConfig { corpus_dir: dir.path().to_path_buf(), ..EngineConfig::default() };
        (dir, IndexService::new(cfg))
    }

    #[test]
    fn planet_lookup_translates_to_caller_language() {
        let (_dir, service) = english_service();
        let en = planet(&service, "Sun", "Aries", 1, Language::En).unwrap();
        assert!(en.starts_with("The Sun in Aries"));
        let pt = planet(&service, "Sun", "Aries", 1, Language::Pt).unwrap();
        assert!(pt.starts_with("The Sol in Áries"), "{pt}");
    }

    // "house" occurs in two long paragraphs, so on its own it stays under the score floor.
    #[test]
    fn missing_interpretation_is_none() {
        let (_dir, service) = english_service();
        assert_eq!(planet(&service, "Pluto", "Scorpio", 8, Language::Pt), None);
    }

    #[test]
    fn aspect_sign_house_and_transit_lookups() {
        let (_dir, service) = english_service();
        let asp = aspect(&service, "Mars", "Saturn", "Square", Language::De).unwrap();
        assert!(asp.starts_with("Mars Quadrat Saturn"), "{asp}");

        let leo = sign(&service, "Leo", Language::Fr).unwrap();
        assert!(leo.text.starts_with("Lion sign"), "{}", leo.text);
        assert_eq!(leo.source, "planets.txt");

        let tenth = house(&service, 10, Language::En).unwrap();
        assert!(tenth.text.contains("career"));

        let tr = transit(&service, "Jupiter", "Venus", "Trine", Language::En).unwrap();
        assert!(tr.text.contains("transit of Jupiter"));
    }

    #[test]
    fn house_lookup_in_portuguese_corpus() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("casas.txt"),
            "A casa 10 na astrologia fala da carreira e da reputação pública.\n\n\
             Décima Casa: texto sobre ordinais.\n\n\
             Sol em Leão brilha.",
        )
        .unwrap();
        let cfg = EngineConfig {
            corpus_dir: dir.path().to_path_buf(),
            corpus_language: Language::Pt,
            ..EngineConfig::default()
        };
        let service = IndexService::new(cfg);

        let tenth = house(&service, 10, Language::Pt).unwrap();
        assert_eq!(tenth.text, "A casa 10 na astrologia fala da carreira e da reputação pública.");
        assert_eq!(tenth.source, "casas.txt");
    }

    #[test]
    fn chart_collects_only_found_entries() {
        let (_dir, service) = english_service();
        let summary = ChartSummary {
            placements: vec![
                Placement { planet: "Moon".into(), sign: "Cancer".into(), house: 4 },
                Placement { planet: "Pluto".into(), sign: "Scorpio".into(), house: 8 },
            ],
            houses: vec![10],
            aspects: vec![AspectLink { planet1: "Mars".into(), planet2: "Saturn".into(), aspect: "Square".into() }],
        };
        let out = chart(&service, &summary, Language::En);
        assert_eq!(out.planets.len(), 1);
        assert!(out.planets.contains_key("Moon"));
        assert_eq!(out.houses.len(), 1);
        assert_eq!(out.aspects.len(), 1);
    }
}
