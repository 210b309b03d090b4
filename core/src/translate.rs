//! Astrological term dictionaries and text-level term substitution.
//!
//! English names are canonical. Each table row carries the canonical name followed by
//! its Portuguese, Spanish, French, Italian and German forms, in that order.

use anyhow::{anyhow, Error};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Pt,
    En,
    Es,
    Fr,
    It,
    De,
}

impl Language {
    pub const ALL: [Language; 6] =
        [Language::Pt, Language::En, Language::Es, Language::Fr, Language::It, Language::De];

    pub fn code(self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::It => "it",
            Language::De => "de",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::Pt => "Português",
            Language::En => "English",
            Language::Es => "Español",
            Language::Fr => "Français",
            Language::It => "Italiano",
            Language::De => "Deutsch",
        }
    }

    /// Column in the translation tables; `None` for the canonical language.
    fn column(self) -> Option<usize> {
        match self {
            Language::En => None,
            Language::Pt => Some(0),
            Language::Es => Some(1),
            Language::Fr => Some(2),
            Language::It => Some(3),
            Language::De => Some(4),
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or_else(|| anyhow!("unsupported language: {s}"))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Planet,
    Sign,
    Aspect,
    House,
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planet" | "planets" => Ok(Category::Planet),
            "sign" | "signs" => Ok(Category::Sign),
            "aspect" | "aspects" => Ok(Category::Aspect),
            "house" | "houses" => Ok(Category::House),
            _ => Err(anyhow!("unknown term category: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

pub fn supported_languages() -> Vec<LanguageInfo> {
    Language::ALL
        .into_iter()
        .map(|l| LanguageInfo { code: l.code(), name: l.display_name() })
        .collect()
}

type Row = (&'static str, [&'static str; 5]);

const PLANETS: &[Row] = &[
    ("Sun", ["Sol", "Sol", "Soleil", "Sole", "Sonne"]),
    ("Moon", ["Lua", "Luna", "Lune", "Luna", "Mond"]),
    ("Mercury", ["Mercúrio", "Mercurio", "Mercure", "Mercurio", "Merkur"]),
    ("Venus", ["Vênus", "Venus", "Vénus", "Venere", "Venus"]),
    ("Mars", ["Marte", "Marte", "Mars", "Marte", "Mars"]),
    ("Jupiter", ["Júpiter", "Júpiter", "Jupiter", "Giove", "Jupiter"]),
    ("Saturn", ["Saturno", "Saturno", "Saturne", "Saturno", "Saturn"]),
    ("Uranus", ["Urano", "Urano", "Uranus", "Urano", "Uranus"]),
    ("Neptune", ["Netuno", "Neptuno", "Neptune", "Nettuno", "Neptun"]),
    ("Pluto", ["Plutão", "Plutón", "Pluton", "Plutone", "Pluto"]),
    ("Mean_Node", ["Nodo Lunar Médio", "Nodo Lunar Medio", "Nœud Lunaire Moyen", "Nodo Lunare Medio", "Mittlerer Mondknoten"]),
    ("True_Node", ["Nodo Lunar Verdadeiro", "Nodo Lunar Verdadero", "Nœud Lunaire Vrai", "Nodo Lunare Vero", "Wahrer Mondknoten"]),
    ("Chiron", ["Quíron", "Quirón", "Chiron", "Chirone", "Chiron"]),
    ("Lilith", ["Lilith", "Lilith", "Lilith", "Lilith", "Lilith"]),
    ("Ascendant", ["Ascendente", "Ascendente", "Ascendant", "Ascendente", "Aszendent"]),
    ("Midheaven", ["Meio-do-Céu", "Medio Cielo", "Milieu du Ciel", "Medio Cielo", "Medium Coeli"]),
];

const SIGNS: &[Row] = &[
    ("Aries", ["Áries", "Aries", "Bélier", "Ariete", "Widder"]),
    ("Taurus", ["Touro", "Tauro", "Taureau", "Toro", "Stier"]),
    ("Gemini", ["Gêmeos", "Géminis", "Gémeaux", "Gemelli", "Zwillinge"]),
    ("Cancer", ["Câncer", "Cáncer", "Cancer", "Cancro", "Krebs"]),
    ("Leo", ["Leão", "Leo", "Lion", "Leone", "Löwe"]),
    ("Virgo", ["Virgem", "Virgo", "Vierge", "Vergine", "Jungfrau"]),
    ("Libra", ["Libra", "Libra", "Balance", "Bilancia", "Waage"]),
    ("Scorpio", ["Escorpião", "Escorpio", "Scorpion", "Scorpione", "Skorpion"]),
    ("Sagittarius", ["Sagitário", "Sagitario", "Sagittaire", "Sagittario", "Schütze"]),
    ("Capricorn", ["Capricórnio", "Capricornio", "Capricorne", "Capricorno", "Steinbock"]),
    ("Aquarius", ["Aquário", "Acuario", "Verseau", "Acquario", "Wassermann"]),
    ("Pisces", ["Peixes", "Piscis", "Poissons", "Pesci", "Fische"]),
];

const ASPECTS: &[Row] = &[
    ("Conjunction", ["Conjunção", "Conjunción", "Conjonction", "Congiunzione", "Konjunktion"]),
    ("Opposition", ["Oposição", "Oposición", "Opposition", "Opposizione", "Opposition"]),
    ("Trine", ["Trígono", "Trígono", "Trigone", "Trigono", "Trigon"]),
    ("Square", ["Quadratura", "Cuadratura", "Carré", "Quadratura", "Quadrat"]),
    ("Sextile", ["Sextil", "Sextil", "Sextile", "Sestile", "Sextil"]),
    ("Quincunx", ["Quincúncio", "Quincuncio", "Quinconce", "Quinconce", "Quincunx"]),
    ("Semisextile", ["Semisextil", "Semisextil", "Demi-sextile", "Semisestile", "Halbsextil"]),
    ("Semisquare", ["Semiquadratura", "Semicuadratura", "Demi-carré", "Semiquadratura", "Halbquadrat"]),
    ("Sesquiquadrate", ["Sesquiquadratura", "Sesquicuadratura", "Sesqui-carré", "Sesquiquadratura", "Anderthalbquadrat"]),
    ("Quintile", ["Quintil", "Quintil", "Quintile", "Quintile", "Quintil"]),
    ("Biquintile", ["Biquintil", "Biquintil", "Bi-quintile", "Biquintile", "Biquintil"]),
];

// Index 0 is the first house.
const HOUSES: [[&str; 5]; 12] = [
    ["Primeira Casa", "Primera Casa", "Première Maison", "Prima Casa", "Erstes Haus"],
    ["Segunda Casa", "Segunda Casa", "Deuxième Maison", "Seconda Casa", "Zweites Haus"],
    ["Terceira Casa", "Tercera Casa", "Troisième Maison", "Terza Casa", "Drittes Haus"],
    ["Quarta Casa", "Cuarta Casa", "Quatrième Maison", "Quarta Casa", "Viertes Haus"],
    ["Quinta Casa", "Quinta Casa", "Cinquième Maison", "Quinta Casa", "Fünftes Haus"],
    ["Sexta Casa", "Sexta Casa", "Sixième Maison", "Sesta Casa", "Sechstes Haus"],
    ["Sétima Casa", "Séptima Casa", "Septième Maison", "Settima Casa", "Siebtes Haus"],
    ["Oitava Casa", "Octava Casa", "Huitième Maison", "Ottava Casa", "Achtes Haus"],
    ["Nona Casa", "Novena Casa", "Neuvième Maison", "Nona Casa", "Neuntes Haus"],
    ["Décima Casa", "Décima Casa", "Dixième Maison", "Decima Casa", "Zehntes Haus"],
    ["Décima Primeira Casa", "Undécima Casa", "Onzième Maison", "Undicesima Casa", "Elftes Haus"],
    ["Décima Segunda Casa", "Duodécima Casa", "Douzième Maison", "Dodicesima Casa", "Zwölftes Haus"],
];

fn table(category: Category) -> &'static [Row] {
    match category {
        Category::Planet => PLANETS,
        Category::Sign => SIGNS,
        Category::Aspect => ASPECTS,
        Category::House => &[],
    }
}

fn row_form(row: &Row, language: Language) -> &'static str {
    match language.column() {
        Some(col) => row.1[col],
        None => row.0,
    }
}

fn house_form(number: usize, language: Language) -> String {
    match language.column() {
        Some(col) => HOUSES[number - 1][col].to_string(),
        None => format!("House {number}"),
    }
}

/// Translate a canonical term. Unknown terms come back unchanged; unknown houses fall
/// back to `Casa N` outside English.
pub fn translate_term(term: &str, category: Category, language: Language) -> String {
    if category == Category::House {
        return match term.trim().parse::<usize>() {
            Ok(n) if (1..=12).contains(&n) => house_form(n, language),
            _ if language == Language::En => format!("House {term}"),
            _ => format!("Casa {term}"),
        };
    }
    if language == Language::En {
        return term.to_string();
    }
    table(category)
        .iter()
        .find(|row| row.0 == term)
        .map(|row| row_form(row, language).to_string())
        .unwrap_or_else(|| term.to_string())
}

pub fn translate_house(number: u8, language: Language) -> String {
    translate_term(&number.to_string(), Category::House, language)
}

struct Substitution {
    pattern: Regex,
    /// Lowercased source form -> target form.
    replacements: HashMap<String, String>,
}

lazy_static! {
    static ref PASSES: RwLock<HashMap<(Language, Language), Arc<Substitution>>> =
        RwLock::new(HashMap::new());
}

fn build_substitution(source: Language, target: Language) -> Option<Substitution> {
    // Category order decides which meaning wins when two categories share a source form.
    let mut pairs: Vec<(String, String)> = Vec::new();
    for category in [Category::Planet, Category::Sign, Category::Aspect] {
        for row in table(category) {
            pairs.push((row_form(row, source).to_string(), row_form(row, target).to_string()));
        }
    }
    for n in 1..=12 {
        pairs.push((house_form(n, source), house_form(n, target)));
    }

    let mut replacements: HashMap<String, String> = HashMap::new();
    let mut forms: Vec<String> = Vec::new();
    for (from, to) in pairs {
        let key = from.to_lowercase();
        if !replacements.contains_key(&key) {
            replacements.insert(key, to);
            forms.push(from);
        }
    }
    forms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let alternation = forms.iter().map(|f| regex::escape(f)).collect::<Vec<_>>().join("|");
    match RegexBuilder::new(&format!(r"\b(?:{alternation})\b")).case_insensitive(true).build() {
        Ok(pattern) => Some(Substitution { pattern, replacements }),
        Err(err) => {
            tracing::warn!(%err, %source, %target, "term substitution pattern rejected");
            None
        }
    }
}

fn substitution(source: Language, target: Language) -> Option<Arc<Substitution>> {
    if let Some(pass) = PASSES.read().get(&(source, target)) {
        return Some(pass.clone());
    }
    let pass = Arc::new(build_substitution(source, target)?);
    Some(PASSES.write().entry((source, target)).or_insert(pass).clone())
}

/// Replace every known term written in `source` with its `target` form, matching whole
/// words case-insensitively. Runs as a single pass so replaced text is never rescanned.
pub fn translate_text(text: &str, target: Language, source: Language) -> String {
    if target == source {
        return text.to_string();
    }
    let Some(pass) = substitution(source, target) else {
        return text.to_string();
    };
    pass.pattern
        .replace_all(text, |caps: &regex::Captures| {
            let found = &caps[0];
            pass.replacements
                .get(&found.to_lowercase())
                .cloned()
                .unwrap_or_else(|| found.to_string())
        })
        .into_owned()
}
