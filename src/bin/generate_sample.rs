use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use vk_stats::data::filter::AGE_BRACKETS;

/// One line of the export, with the export's own column names.
#[derive(Serialize)]
struct ExportLine<'a> {
    #[serde(rename = "Дата")]
    date: String,
    #[serde(rename = "Критерий")]
    category: &'a str,
    #[serde(rename = "Парам. №1")]
    param1: &'a str,
    #[serde(rename = "Парам. №2")]
    param2: &'a str,
    #[serde(rename = "Значение")]
    value: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Non-negative count around `mean`, ±`spread` (fraction of mean).
    fn count(&mut self, mean: f64, spread: f64) -> f64 {
        (mean * (1.0 + spread * (2.0 * self.next_f64() - 1.0))).max(0.0).round()
    }
}

const CITIES: [&str; 3] = ["Москва", "Санкт-Петербург", "Казань"];
const COUNTRIES: [&str; 3] = ["Россия", "Беларусь", "Казахстан"];
const SECTIONS: [&str; 4] = ["Обсуждения", "Аудиозаписи", "Видеозаписи", "Фотоальбомы"];
const FEEDBACK: [&str; 3] = ["Нравится", "Комментарии", "Рассказали друзьям"];
const MEMBERS: [&str; 2] = ["Новые участники", "Вышедшие участники"];
const GENDERS: [&str; 2] = ["М", "Ж"];

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_export.csv".to_string());
    let mut rng = SimpleRng::new(42);

    let first_day = NaiveDate::from_ymd_opt(2021, 1, 1).context("invalid start date")?;
    let days = 120;
    // Visitor counts start two weeks before views, like real exports do.
    let lead_in = 14;

    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    let mut lines = 0usize;
    let mut write = |date: NaiveDate, category: &str, param1: &str, param2: &str, value: f64| -> Result<()> {
        writer.serialize(ExportLine {
            date: date.format("%Y-%m-%d").to_string(),
            category,
            param1,
            param2,
            value,
        })?;
        lines += 1;
        Ok(())
    };

    let lead_start = first_day
        .checked_sub_days(Days::new(lead_in))
        .context("date out of range")?;
    for date in lead_start.iter_days().take(lead_in as usize) {
        write(date, "visitors", "", "", rng.count(300.0, 0.3))?;
    }

    for date in first_day.iter_days().take(days) {
        // Weekends are quieter.
        let weekday = date.weekday().num_days_from_monday();
        let base = if weekday >= 5 { 700.0 } else { 1000.0 };

        let views = rng.count(base, 0.25);
        let visitors = rng.count(base * 0.35, 0.25);
        write(date, "views", "", "", views)?;
        write(date, "visitors", "", "", visitors)?;

        let shares = [0.05, 0.2, 0.22, 0.18, 0.12, 0.1, 0.08, 0.05];
        for (bracket, share) in AGE_BRACKETS.into_iter().zip(shares) {
            write(date, "age", bracket, "", rng.count(visitors * share, 0.2))?;
            for gender in GENDERS {
                write(date, "gender_age", gender, bracket, rng.count(visitors * share / 2.0, 0.3))?;
            }
        }
        write(date, "gender", "М", "", rng.count(visitors * 0.45, 0.1))?;
        write(date, "gender", "Ж", "", rng.count(visitors * 0.55, 0.1))?;

        for (city, share) in CITIES.into_iter().zip([0.4, 0.25, 0.1]) {
            write(date, "cities", city, "", rng.count(visitors * share, 0.2))?;
        }
        for (country, share) in COUNTRIES.into_iter().zip([0.8, 0.08, 0.05]) {
            write(date, "countries", country, "", rng.count(visitors * share, 0.2))?;
        }
        for section in SECTIONS {
            write(date, "sections", section, "", rng.count(views * 0.05, 0.5))?;
        }
        for (label, mean) in FEEDBACK.into_iter().zip([60.0, 12.0, 5.0]) {
            write(date, "feedback", label, "", rng.count(mean, 0.6))?;
        }
        for (label, mean) in MEMBERS.into_iter().zip([15.0, 6.0]) {
            write(date, "members", label, "", rng.count(mean, 0.6))?;
        }

        let reach = rng.count(base * 1.6, 0.2);
        write(date, "reach", "", "", reach)?;
        write(date, "reach_subscribers", "", "", rng.count(reach * 0.6, 0.1))?;
        write(date, "reach_viral", "", "", rng.count(reach * 0.3, 0.2))?;
        write(date, "reach_ads", "", "", rng.count(reach * 0.1, 0.5))?;
    }

    drop(write);
    writer.flush().context("flushing output")?;

    println!(
        "Wrote {lines} lines ({days} days from {first_day}, {lead_in} lead-in days) to {output_path}"
    );
    Ok(())
}
