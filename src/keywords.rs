//! # Keyword Tables Module
//!
//! ## Purpose
//! Static mappings from canonical filter values (cities, school types,
//! languages, curricula, subjects, specialists, services, meal types,
//! accreditation, exam requirement, sort intents) to the lowercase substrings
//! that trigger them. Queries come in Russian, Kazakh and English, so every
//! table carries multi-language aliases.
//!
//! ## Input/Output Specification
//! - **Input**: An already-lowercased query or record text
//! - **Output**: Canonical values whose keywords occur as substrings
//! - **Invariant**: Within a single table no keyword is shared by two
//!   canonical values; cross-table overlaps are fine because every category
//!   runs its own matching pass
//!
//! Matching is inclusive-OR by design: if one token triggers aliases of two
//! canonical values in the same category, both are selected. The tables are
//! process-wide immutable data, shared between the query parser and the
//! filter engine so both sides speak the same vocabulary.

use crate::SortOption;

/// Canonical value → ordered list of lowercase trigger substrings.
pub type KeywordTable = &'static [(&'static str, &'static [&'static str])];

/// The private-school canonical type, implicitly selected by price signals.
pub const PRIVATE_TYPE: &str = "Private";

/// Default curriculum selected by a bare "cambridge" mention.
pub const CAMBRIDGE_DEFAULT: &str = "Cambridge IGCSE";

/// Cities covered by the directory.
pub const CITY_KEYWORDS: KeywordTable = &[
    // Stems rather than full forms, so Russian case inflections match too
    // ("алматы", "в алмате", "школы астаны").
    ("Almaty", &["almaty", "алмат"]),
    ("Astana", &["astana", "астан", "нур-султан", "нурсултан", "nur-sultan"]),
    ("Shymkent", &["shymkent", "шымкент", "чимкент"]),
];

/// City districts: a district mention implies selecting the parent city.
/// Layout: (city, [(district, keywords)]).
pub const CITY_AREAS: &'static [(
    &'static str,
    &'static [(&'static str, &'static [&'static str])],
)] = &[
    (
        "Almaty",
        &[
            ("Bostandyk", &["бостандык", "bostandyk"]),
            ("Medeu", &["медеу", "medeu"]),
            ("Almaly", &["алмалы", "almaly"]),
            ("Auezov", &["ауэзов", "auezov"]),
            ("Turksib", &["турксиб", "turksib"]),
            ("Nauryzbay", &["наурызбай", "nauryzbay"]),
        ],
    ),
    (
        "Astana",
        &[
            ("Yesil", &["есиль", "yesil"]),
            ("Saryarka", &["сарыарка", "saryarka"]),
            ("Baikonur", &["байконур", "baikonur"]),
        ],
    ),
    (
        "Shymkent",
        &[
            ("Abay", &["абайский", "abay district"]),
            ("Al-Farabi", &["аль-фараби", "al-farabi"]),
            ("Karatau", &["каратау", "karatau"]),
        ],
    ),
];

/// School types.
pub const TYPE_KEYWORDS: KeywordTable = &[
    ("State", &["state", "государствен", "мемлекеттік"]),
    ("Private", &["private", "частн", "платн"]),
    (
        "International",
        &["international school", "международн", "халықаралық"],
    ),
    ("Lyceum", &["lyceum", "лицей", "лицея", "лицее"]),
    ("Gymnasium", &["gymnasium", "гимназ"]),
];

/// Languages of instruction.
pub const LANGUAGE_KEYWORDS: KeywordTable = &[
    ("Kazakh", &["kazakh", "казахск", "казахский", "қазақ"]),
    ("Russian", &["russian", "русск"]),
    ("English", &["english", "англ"]),
];

/// Curricula. A bare "cambridge" mention without a specific programme keyword
/// defaults to [`CAMBRIDGE_DEFAULT`]; see the parser.
pub const CURRICULUM_KEYWORDS: KeywordTable = &[
    ("Cambridge IGCSE", &["igcse", "cambridge igcse", "кембридж igcse"]),
    ("IB", &["international baccalaureate", "бакалавриат", "ib"]),
    ("American", &["american curriculum", "американск"]),
    ("National", &["национальн", "national curriculum", "типовая программа"]),
];

/// Extracurricular subjects and clubs.
pub const SUBJECT_KEYWORDS: KeywordTable = &[
    ("Robotics", &["robot", "робот"]),
    ("Math", &["math", "математ"]),
    ("Chess", &["chess", "шахмат"]),
    (
        "Programming",
        &["programming", "coding", "программиров", "информатик", "айти"],
    ),
    ("Art", &["drawing", "painting", "рисован", "художествен"]),
    ("Music", &["music", "музык"]),
    ("Swimming", &["swimming", "плавани"]),
    ("Football", &["football", "футбол"]),
];

/// On-staff specialists.
pub const SPECIALIST_KEYWORDS: KeywordTable = &[
    ("Psychologist", &["psycholog", "психолог"]),
    ("Speech therapist", &["логопед", "speech therap"]),
    ("Tutor", &["tutor", "тьютор", "репетитор"]),
    ("Nurse", &["nurse", "медсестр", "медпункт"]),
];

/// Services mapped to boolean flags on the school record.
pub const SERVICE_KEYWORDS: KeywordTable = &[
    (
        "Transfer",
        &["transfer", "развозк", "трансфер", "подвоз", "автобус", "shuttle"],
    ),
    ("Pool", &["pool", "бассейн"]),
    (
        "Extended day",
        &["продлен", "продлён", "extended day", "after school"],
    ),
    ("Security", &["охран", "security", "видеонаблюден"]),
];

/// Meal types.
pub const MEAL_KEYWORDS: KeywordTable = &[
    (
        "Full",
        &["трехразов", "трёхразов", "горячее питани", "full meals"],
    ),
    ("Dietary", &["диетич", "dietary"]),
    ("Halal", &["halal", "халал", "халяль"]),
];

/// Accreditation signals mapped to flags on the school record.
pub const ACCREDITATION_KEYWORDS: KeywordTable = &[
    ("License", &["лиценз", "license", "licence"]),
    (
        "Certificates",
        &["сертификат", "сертифицирован", "certificat", "аккредитац", "accredit"],
    ),
];

/// Keywords meaning "no entrance exam". Takes precedence over
/// [`EXAM_YES_KEYWORDS`] when both families are present.
pub const EXAM_NO_KEYWORDS: &[&str] = &[
    "без экзамен",
    "без вступительн",
    "без теста",
    "no exam",
    "without exam",
    "no entrance",
];

/// Keywords meaning "entrance exam required".
pub const EXAM_YES_KEYWORDS: &[&str] =
    &["экзамен", "вступительн", "exam", "entrance test", "тестирован"];

/// Sort intents in declaration order: the first option with a matching
/// keyword wins. `недорог` deliberately sits in the cheap list and is checked
/// before `дорог` can claim it for the expensive sort.
pub const SORT_KEYWORDS: &[(SortOption, &[&str])] = &[
    (
        SortOption::RatingDesc,
        &["лучши", "best", "top", "по рейтингу", "highest rated"],
    ),
    (
        SortOption::PriceAsc,
        &["дешев", "недорог", "cheap", "эконом", "affordable", "бюджетн"],
    ),
    (
        SortOption::PriceDesc,
        &["дорог", "expensive", "премиум", "premium", "элитн", "elite"],
    ),
    (
        SortOption::ReviewsDesc,
        &["отзыв", "review", "популярн", "popular"],
    ),
    (
        SortOption::DistanceAsc,
        &["рядом", "поблизости", "близк", "недалеко", "near", "ближайш"],
    ),
    (
        SortOption::NameAsc,
        &["по алфавиту", "alphabet", "по названию", "a-z"],
    ),
    (
        SortOption::UpdatedDesc,
        &["обновлен", "updated", "recent", "недавн", "latest", "свежи"],
    ),
];

/// Keywords that force `use_nearby` regardless of the chosen sort.
pub const NEARBY_KEYWORDS: &[&str] =
    &["рядом", "поблизости", "близк", "недалеко", "near", "ближайш"];

/// Filler tokens dropped from the residual free-text remainder. Tokens of two
/// characters or fewer are dropped separately, so short prepositions are not
/// listed here.
pub const STOP_WORDS: &[&str] = &[
    "школа", "школу", "школы", "школе", "школ", "school", "schools", "хочу",
    "нужна", "нужно", "нужен", "найти", "найди", "ищу", "ищем", "подобрать",
    "посоветуйте", "пожалуйста", "please", "want", "need", "find", "looking",
    "for", "the", "and", "with", "хорошая", "хорошую", "good", "ребенка",
    "ребёнка", "ребенку", "child", "kid", "kids", "сына", "дочери", "детей",
    "дети", "для", "при", "около", "возле", "where", "куда", "какая", "какие",
    "что", "это", "чтобы", "home", "дом", "дома",
];

/// Canonical domain of a keyword table, in declaration order.
pub fn domain(table: KeywordTable) -> Vec<&'static str> {
    table.iter().map(|(canonical, _)| *canonical).collect()
}

/// Whether `value` belongs to the table's canonical domain.
pub fn is_canonical(table: KeywordTable, value: &str) -> bool {
    table.iter().any(|(canonical, _)| *canonical == value)
}

/// Districts of a city, or an empty slice for unknown cities.
pub fn areas_of(city: &str) -> &'static [(&'static str, &'static [&'static str])] {
    CITY_AREAS
        .iter()
        .find(|(c, _)| *c == city)
        .map(|(_, areas)| *areas)
        .unwrap_or(&[])
}
