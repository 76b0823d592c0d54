use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DataError;
use super::model::{Category, MetricTable, Row};

/// Age brackets used by `age` and `gender_age` rows.
pub const AGE_BRACKETS: [&str; 8] = [
    "1-18", "18-21", "21-24", "24-27", "27-30", "30-35", "35-45", "45+",
];

pub const DEFAULT_AGE: &str = "18-21";

// ---------------------------------------------------------------------------
// Gender – accepts both Latin and the export's Cyrillic codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    #[default]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Parse a gender code: `M`/`F` or the export's `М`/`Ж`.
    pub fn parse(code: &str) -> Result<Self, DataError> {
        match code {
            "M" | "М" => Ok(Gender::Male),
            "F" | "Ж" => Ok(Gender::Female),
            other => Err(DataError::InvalidKey {
                key: other.to_string(),
                allowed: "M, F (М, Ж)".to_string(),
            }),
        }
    }

    /// Every spelling a row may carry for this gender.
    pub fn codes(self) -> &'static [&'static str] {
        match self {
            Gender::Male => &["M", "М"],
            Gender::Female => &["F", "Ж"],
        }
    }

    pub fn code(self) -> &'static str {
        self.codes()[0]
    }
}

fn check_age(key: &str) -> Result<&str, DataError> {
    if AGE_BRACKETS.contains(&key) {
        Ok(key)
    } else {
        Err(DataError::InvalidKey {
            key: key.to_string(),
            allowed: AGE_BRACKETS.join(", "),
        })
    }
}

// ---------------------------------------------------------------------------
// Metric – one entry per query method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Views,
    Visitors,
    Age,
    Gender,
    GenderAge,
    City,
    Country,
    Discussions,
    Audio,
    Videos,
    PhotoAlbums,
    Likes,
    Comments,
    ToldFriends,
    NewMembers,
    ExitedMembers,
    Reach,
    ReachSubscribers,
    ReachViral,
    ReachAds,
}

/// Which sub-key a metric takes and how it is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    None,
    Age,
    Gender,
    GenderAge,
    City,
    Country,
    /// `param1` must be one of these fixed labels; the caller passes no key.
    Label(&'static [&'static str]),
}

/// Configuration row of a metric: its category tag and key rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub category: Category,
    pub key: KeyRule,
}

impl Metric {
    pub const ALL: [Metric; 20] = [
        Metric::Views,
        Metric::Visitors,
        Metric::Age,
        Metric::Gender,
        Metric::GenderAge,
        Metric::City,
        Metric::Country,
        Metric::Discussions,
        Metric::Audio,
        Metric::Videos,
        Metric::PhotoAlbums,
        Metric::Likes,
        Metric::Comments,
        Metric::ToldFriends,
        Metric::NewMembers,
        Metric::ExitedMembers,
        Metric::Reach,
        Metric::ReachSubscribers,
        Metric::ReachViral,
        Metric::ReachAds,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Views => "views",
            Metric::Visitors => "visitors",
            Metric::Age => "age",
            Metric::Gender => "gender",
            Metric::GenderAge => "gender_age",
            Metric::City => "city",
            Metric::Country => "country",
            Metric::Discussions => "discussions",
            Metric::Audio => "audio",
            Metric::Videos => "videos",
            Metric::PhotoAlbums => "photo_albums",
            Metric::Likes => "likes",
            Metric::Comments => "comments",
            Metric::ToldFriends => "told_friends",
            Metric::NewMembers => "new_members",
            Metric::ExitedMembers => "exited_members",
            Metric::Reach => "reach",
            Metric::ReachSubscribers => "reach_subscribers",
            Metric::ReachViral => "reach_viral",
            Metric::ReachAds => "reach_ads",
        }
    }

    pub fn spec(self) -> MetricSpec {
        use KeyRule::Label;

        let (category, key) = match self {
            Metric::Views => (Category::Views, KeyRule::None),
            Metric::Visitors => (Category::Visitors, KeyRule::None),
            Metric::Age => (Category::Age, KeyRule::Age),
            Metric::Gender => (Category::Gender, KeyRule::Gender),
            Metric::GenderAge => (Category::GenderAge, KeyRule::GenderAge),
            Metric::City => (Category::Cities, KeyRule::City),
            Metric::Country => (Category::Countries, KeyRule::Country),
            Metric::Discussions => (Category::Sections, Label(&["Обсуждения", "discussions"])),
            Metric::Audio => (Category::Sections, Label(&["Аудиозаписи", "audio"])),
            Metric::Videos => (Category::Sections, Label(&["Видеозаписи", "videos"])),
            Metric::PhotoAlbums => (Category::Sections, Label(&["Фотоальбомы", "photo_albums"])),
            Metric::Likes => (Category::Feedback, Label(&["Нравится", "likes"])),
            Metric::Comments => (Category::Feedback, Label(&["Комментарии", "comments"])),
            Metric::ToldFriends => (Category::Feedback, Label(&["Рассказали друзьям", "told_friends"])),
            Metric::NewMembers => (Category::Members, Label(&["Новые участники", "new_members"])),
            Metric::ExitedMembers => (Category::Members, Label(&["Вышедшие участники", "exited_members"])),
            Metric::Reach => (Category::Reach, KeyRule::None),
            Metric::ReachSubscribers => (Category::ReachSubscribers, KeyRule::None),
            Metric::ReachViral => (Category::ReachViral, KeyRule::None),
            Metric::ReachAds => (Category::ReachAds, KeyRule::None),
        };
        MetricSpec { category, key }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| DataError::UnknownMetric(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MetricKey – caller-supplied sub-dimension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKey<'a> {
    None,
    Age(&'a str),
    Gender(&'a str),
    GenderAge { gender: &'a str, age: &'a str },
    City(&'a str),
    Country(&'a str),
}

impl fmt::Display for MetricKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::None => f.write_str("<none>"),
            MetricKey::Age(k) | MetricKey::Gender(k) | MetricKey::City(k) | MetricKey::Country(k) => {
                f.write_str(k)
            }
            MetricKey::GenderAge { gender, age } => write!(f, "{gender}/{age}"),
        }
    }
}

/// Row predicate built from a validated metric + key.
struct Selector<'k> {
    category: Category,
    param1: Option<Vec<&'k str>>,
    param2: Option<&'k str>,
}

impl Selector<'_> {
    fn matches(&self, row: &Row) -> bool {
        if row.category != self.category {
            return false;
        }
        if let Some(allowed) = &self.param1 {
            match row.param1.as_deref() {
                Some(p) if allowed.contains(&p) => {}
                _ => return false,
            }
        }
        if let Some(expected) = self.param2 {
            if row.param2.as_deref() != Some(expected) {
                return false;
            }
        }
        true
    }
}

impl MetricTable {
    fn selector<'k>(&self, metric: Metric, key: MetricKey<'k>) -> Result<Selector<'k>, DataError> {
        let spec = metric.spec();
        let (param1, param2) = match (spec.key, key) {
            (KeyRule::None, MetricKey::None) => (None, None),
            (KeyRule::Label(labels), MetricKey::None) => (Some(labels.to_vec()), None),
            (KeyRule::Age, MetricKey::Age(age)) => (Some(vec![check_age(age)?]), None),
            (KeyRule::Gender, MetricKey::Gender(code)) => (Some(Gender::parse(code)?.codes().to_vec()), None),
            (KeyRule::GenderAge, MetricKey::GenderAge { gender, age }) => {
                let codes = Gender::parse(gender)?.codes().to_vec();
                (Some(codes), Some(check_age(age)?))
            }
            (KeyRule::City, MetricKey::City(city)) => {
                if !self.knows_city(city) {
                    return Err(DataError::UnknownCity(city.to_string()));
                }
                (Some(vec![city]), None)
            }
            (KeyRule::Country, MetricKey::Country(country)) => {
                if !self.knows_country(country) {
                    return Err(DataError::UnknownCountry(country.to_string()));
                }
                (Some(vec![country]), None)
            }
            (rule, key) => {
                return Err(DataError::InvalidKey {
                    key: key.to_string(),
                    allowed: format!("a {rule:?} key for {metric}"),
                })
            }
        };
        Ok(Selector {
            category: spec.category,
            param1,
            param2,
        })
    }

    /// Validate a key against `metric` without running the query.
    pub(crate) fn check_key(&self, metric: Metric, key: MetricKey<'_>) -> Result<(), DataError> {
        self.selector(metric, key).map(|_| ())
    }

    /// Values of `metric` between `start` and `end` (inclusive), in date
    /// order. Omitted bounds default to the table bounds.
    ///
    /// The key is checked before the date bounds.
    pub fn series(
        &self,
        metric: Metric,
        key: MetricKey<'_>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<f64>, DataError> {
        let selector = self.selector(metric, key)?;
        let range = self.resolve_range(start, end)?;
        Ok(self
            .rows_in(range)
            .iter()
            .filter(|row| selector.matches(row))
            .map(|row| row.value)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::RangeError;
    use crate::data::model::RawRow;

    fn table() -> MetricTable {
        MetricTable::from_rows(vec![
            RawRow::new("2020-01-01", "views", None, None, 100.0),
            RawRow::new("2020-01-02", "views", None, None, 150.0),
            RawRow::new("2020-01-03", "views", None, None, 120.0),
            RawRow::new("2020-01-01", "age", Some("18-21"), None, 5.0),
            RawRow::new("2020-01-02", "age", Some("18-21"), None, 6.0),
            RawRow::new("2020-01-02", "age", Some("21-24"), None, 9.0),
            RawRow::new("2020-01-01", "gender", Some("Ж"), None, 30.0),
            RawRow::new("2020-01-02", "gender", Some("F"), None, 31.0),
            RawRow::new("2020-01-02", "gender", Some("М"), None, 20.0),
            RawRow::new("2020-01-02", "gender_age", Some("Ж"), Some("18-21"), 3.0),
            RawRow::new("2020-01-02", "gender_age", Some("Ж"), Some("21-24"), 4.0),
            RawRow::new("2020-01-01", "cities", Some("Moscow"), None, 10.0),
            RawRow::new("2020-01-03", "cities", Some("Moscow"), None, 12.0),
            RawRow::new("2020-01-03", "cities", Some("Kazan"), None, 2.0),
            RawRow::new("2020-01-02", "countries", Some("Russia"), None, 40.0),
            RawRow::new("2020-01-02", "sections", Some("Обсуждения"), None, 7.0),
            RawRow::new("2020-01-02", "sections", Some("Аудиозаписи"), None, 8.0),
            RawRow::new("2020-01-03", "feedback", Some("Нравится"), None, 11.0),
            RawRow::new("2020-01-03", "members", Some("Новые участники"), None, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn unkeyed_metric_in_date_order() {
        let t = table();
        assert_eq!(t.series(Metric::Views, MetricKey::None, None, None).unwrap(), vec![100.0, 150.0, 120.0]);
        assert_eq!(
            t.series(Metric::Views, MetricKey::None, Some("2020-01-02"), Some("2020-01-03")).unwrap(),
            vec![150.0, 120.0]
        );
        assert!(t.series(Metric::Reach, MetricKey::None, None, None).unwrap().is_empty());
    }

    #[test]
    fn age_key_is_validated_and_filtered() {
        let t = table();
        assert_eq!(t.series(Metric::Age, MetricKey::Age("18-21"), None, None).unwrap(), vec![5.0, 6.0]);
        assert!(matches!(
            t.series(Metric::Age, MetricKey::Age("99+"), None, None),
            Err(DataError::InvalidKey { .. })
        ));
    }

    #[test]
    fn gender_codes_match_either_spelling() {
        let t = table();
        assert_eq!(t.series(Metric::Gender, MetricKey::Gender("F"), None, None).unwrap(), vec![30.0, 31.0]);
        assert_eq!(t.series(Metric::Gender, MetricKey::Gender("Ж"), None, None).unwrap(), vec![30.0, 31.0]);
        assert_eq!(t.series(Metric::Gender, MetricKey::Gender("M"), None, None).unwrap(), vec![20.0]);
        assert!(matches!(
            t.series(Metric::Gender, MetricKey::Gender("X"), None, None),
            Err(DataError::InvalidKey { .. })
        ));
    }

    #[test]
    fn gender_age_uses_both_params() {
        let t = table();
        let key = MetricKey::GenderAge { gender: "F", age: "21-24" };
        assert_eq!(t.series(Metric::GenderAge, key, None, None).unwrap(), vec![4.0]);
        let bad_age = MetricKey::GenderAge { gender: "F", age: "0-1" };
        assert!(matches!(
            t.series(Metric::GenderAge, bad_age, None, None),
            Err(DataError::InvalidKey { .. })
        ));
    }

    #[test]
    fn city_and_country_must_be_known() {
        let t = table();
        assert_eq!(t.series(Metric::City, MetricKey::City("Moscow"), None, None).unwrap(), vec![10.0, 12.0]);
        assert!(matches!(
            t.series(Metric::City, MetricKey::City("Nowhere"), None, None),
            Err(DataError::UnknownCity(c)) if c == "Nowhere"
        ));
        assert_eq!(t.series(Metric::Country, MetricKey::Country("Russia"), None, None).unwrap(), vec![40.0]);
        assert!(matches!(
            t.series(Metric::Country, MetricKey::Country("Atlantis"), None, None),
            Err(DataError::UnknownCountry(_))
        ));
    }

    #[test]
    fn labelled_metrics_pick_their_label() {
        let t = table();
        assert_eq!(t.series(Metric::Discussions, MetricKey::None, None, None).unwrap(), vec![7.0]);
        assert_eq!(t.series(Metric::Audio, MetricKey::None, None, None).unwrap(), vec![8.0]);
        assert_eq!(t.series(Metric::Likes, MetricKey::None, None, None).unwrap(), vec![11.0]);
        assert_eq!(t.series(Metric::NewMembers, MetricKey::None, None, None).unwrap(), vec![1.0]);
        assert!(t.series(Metric::ExitedMembers, MetricKey::None, None, None).unwrap().is_empty());
    }

    #[test]
    fn mismatched_key_shape_is_rejected() {
        let t = table();
        assert!(matches!(
            t.series(Metric::Views, MetricKey::City("Moscow"), None, None),
            Err(DataError::InvalidKey { .. })
        ));
        assert!(matches!(
            t.series(Metric::City, MetricKey::None, None, None),
            Err(DataError::InvalidKey { .. })
        ));
    }

    #[test]
    fn key_is_checked_before_dates() {
        let t = table();
        assert!(matches!(
            t.series(Metric::Age, MetricKey::Age("99+"), Some("1999-01-01"), None),
            Err(DataError::InvalidKey { .. })
        ));
        assert!(matches!(
            t.series(Metric::Age, MetricKey::Age("18-21"), Some("1999-01-01"), None),
            Err(DataError::Range(RangeError::StartBeforeTableStart { .. }))
        ));
    }

    /// (metric, category tag, param1 of the first row, param1 of the
    /// second row, param2, query key)
    type Case = (Metric, &'static str, Option<&'static str>, Option<&'static str>, Option<&'static str>, MetricKey<'static>);

    const CASES: [Case; 20] = [
        (Metric::Views, "views", None, None, None, MetricKey::None),
        (Metric::Visitors, "visitors", None, None, None, MetricKey::None),
        (Metric::Age, "age", Some("30-35"), Some("30-35"), None, MetricKey::Age("30-35")),
        (Metric::Gender, "gender", Some("Ж"), Some("F"), None, MetricKey::Gender("F")),
        (
            Metric::GenderAge,
            "gender_age",
            Some("М"),
            Some("M"),
            Some("45+"),
            MetricKey::GenderAge { gender: "M", age: "45+" },
        ),
        (Metric::City, "cities", Some("Moscow"), Some("Moscow"), None, MetricKey::City("Moscow")),
        (Metric::Country, "countries", Some("Russia"), Some("Russia"), None, MetricKey::Country("Russia")),
        (Metric::Discussions, "sections", Some("Обсуждения"), Some("discussions"), None, MetricKey::None),
        (Metric::Audio, "sections", Some("Аудиозаписи"), Some("audio"), None, MetricKey::None),
        (Metric::Videos, "sections", Some("Видеозаписи"), Some("videos"), None, MetricKey::None),
        (Metric::PhotoAlbums, "sections", Some("Фотоальбомы"), Some("photo_albums"), None, MetricKey::None),
        (Metric::Likes, "feedback", Some("Нравится"), Some("likes"), None, MetricKey::None),
        (Metric::Comments, "feedback", Some("Комментарии"), Some("comments"), None, MetricKey::None),
        (Metric::ToldFriends, "feedback", Some("Рассказали друзьям"), Some("told_friends"), None, MetricKey::None),
        (Metric::NewMembers, "members", Some("Новые участники"), Some("new_members"), None, MetricKey::None),
        (Metric::ExitedMembers, "members", Some("Вышедшие участники"), Some("exited_members"), None, MetricKey::None),
        (Metric::Reach, "reach", None, None, None, MetricKey::None),
        (Metric::ReachSubscribers, "reach_subscribers", None, None, None, MetricKey::None),
        (Metric::ReachViral, "reach_viral", None, None, None, MetricKey::None),
        (Metric::ReachAds, "reach_ads", None, None, None, MetricKey::None),
    ];

    #[test]
    fn every_metric_returns_only_its_own_rows() {
        let mut rows = Vec::new();
        for (i, (_, category, first, second, param2, _)) in CASES.iter().enumerate() {
            let base = 10.0 * (i + 1) as f64;
            rows.push(RawRow::new("2020-01-02", category, *first, *param2, base));
            rows.push(RawRow::new("2020-01-03", category, *second, *param2, base + 0.5));
        }
        let t = MetricTable::from_rows(rows).unwrap();

        assert_eq!(CASES.len(), Metric::ALL.len());
        for (i, (metric, _, _, _, _, key)) in CASES.iter().enumerate() {
            assert_eq!(Metric::ALL[i], *metric);
            let base = 10.0 * (i + 1) as f64;
            assert_eq!(
                t.series(*metric, *key, None, None).unwrap(),
                vec![base, base + 0.5],
                "{metric}"
            );
        }
    }

    #[test]
    fn metric_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert!(matches!("pageviews".parse::<Metric>(), Err(DataError::UnknownMetric(_))));
    }
}
