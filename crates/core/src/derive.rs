//! Reference implementations of `auto_calculate` derivations.
//!
//! The consuming application computes these when a form is saved. They are reproduced here so
//! registry authors can check what a form will produce before shipping it. Missing or invalid
//! inputs never fail: the derivation is reported as [`Derived::Unavailable`] with the reason.

use crate::model::{FieldType, FormDefinition};
use crate::responses::{number_response, Responses};
use serde_json::Value;

/// Outcome of one derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Number(f64),
    Text(String),
    Unavailable(String),
}

impl std::fmt::Display for Derived {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Derived::Number(n) => write!(f, "{n}"),
            Derived::Text(t) => f.write_str(t),
            Derived::Unavailable(reason) => write!(f, "unavailable ({reason})"),
        }
    }
}

/// A named derivation result.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub name: String,
    pub value: Derived,
}

/// Runs every derivation the form declares in `auto_calculate`, in declaration order.
pub fn derive_all(form: &FormDefinition, responses: &Responses) -> Vec<Derivation> {
    form.auto_calculate()
        .iter()
        .map(|name| Derivation {
            name: name.clone(),
            value: derive(name, form, responses),
        })
        .collect()
}

/// Runs a single derivation by name.
pub fn derive(name: &str, form: &FormDefinition, responses: &Responses) -> Derived {
    let result = match name {
        "bmi" => bmi(responses).map(Derived::Number),
        "bmi_category" => bmi(responses).map(|b| Derived::Text(bmi_category(b).into())),
        "whr" => whr(responses).map(Derived::Number),
        "ibw" => ibw(responses).map(Derived::Number),
        "total_score" => total_score(form, responses).map(Derived::Number),
        "severity" => total_score(form, responses).and_then(|total| {
            severity(form.form_id.as_str(), total).map(|s| Derived::Text(s.into()))
        }),
        other => Err(format!("no derivation named '{other}'")),
    };

    result.unwrap_or_else(Derived::Unavailable)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn positive(responses: &Responses, key: &str) -> Result<f64, String> {
    match number_response(responses, key) {
        Some(v) if v > 0.0 => Ok(v),
        Some(_) => Err(format!("{key} must be positive")),
        None => Err(format!("{key} is missing or not a number")),
    }
}

/// Body-mass index from `weight_kg` and `height_cm`, two decimal places.
fn bmi(responses: &Responses) -> Result<f64, String> {
    let weight = positive(responses, "weight_kg")?;
    let height_m = positive(responses, "height_cm")? / 100.0;
    Ok(round_to(weight / (height_m * height_m), 2))
}

/// Asian-population BMI bands.
fn bmi_category(bmi: f64) -> &'static str {
    if bmi < 18.5 {
        "Underweight"
    } else if bmi < 23.0 {
        "Normal"
    } else if bmi < 25.0 {
        "Overweight"
    } else if bmi < 30.0 {
        "Obese Class I"
    } else {
        "Obese Class II"
    }
}

/// Waist-hip ratio, two decimal places.
fn whr(responses: &Responses) -> Result<f64, String> {
    let waist = positive(responses, "waist_cm")?;
    let hip = positive(responses, "hip_cm")?;
    Ok(round_to(waist / hip, 2))
}

fn is_male(responses: &Responses) -> bool {
    ["sex", "gender"].iter().any(|key| {
        matches!(responses.get(*key), Some(Value::String(s)) if s.eq_ignore_ascii_case("male"))
    })
}

/// Ideal body weight by the Devine formula, one decimal place.
///
/// Uses the female constant unless a `sex`/`gender` response says `male`.
fn ibw(responses: &Responses) -> Result<f64, String> {
    let height_in = positive(responses, "height_cm")? / 2.54;
    let base = if is_male(responses) { 50.0 } else { 45.5 };
    Ok(round_to(base + 2.3 * (height_in - 60.0), 1))
}

/// Sum of the aligned scores of every answered, scored select field.
fn total_score(form: &FormDefinition, responses: &Responses) -> Result<f64, String> {
    let mut answered = 0usize;
    let mut total = 0.0;

    for field in &form.fields {
        if field.field_type != FieldType::Select || field.scores.is_none() {
            continue;
        }
        let Some(value) = responses.get(field.key.as_str()) else {
            continue;
        };

        let index = match value {
            Value::String(s) if s.trim().is_empty() => continue,
            Value::String(s) => field.option_index(s),
            Value::Number(n) => n.as_u64().map(|i| i as usize),
            Value::Null => continue,
            _ => None,
        };

        let score = index
            .and_then(|i| field.score_at(i))
            .ok_or_else(|| format!("{} has no score for response {value}", field.key))?;
        total += score;
        answered += 1;
    }

    if answered == 0 {
        return Err("no scored responses".into());
    }
    Ok(total)
}

/// Severity band for a questionnaire total, chosen by the form's instrument.
fn severity(form_id: &str, total: f64) -> Result<&'static str, String> {
    if form_id.starts_with("phq9") {
        Ok(match total {
            t if t <= 4.0 => "Minimal Depression",
            t if t <= 9.0 => "Mild Depression",
            t if t <= 14.0 => "Moderate Depression",
            t if t <= 19.0 => "Moderately Severe Depression",
            _ => "Severe Depression",
        })
    } else if form_id.starts_with("gad7") {
        Ok(match total {
            t if t <= 4.0 => "Minimal Anxiety",
            t if t <= 9.0 => "Mild Anxiety",
            t if t <= 14.0 => "Moderate Anxiety",
            _ => "Severe Anxiety",
        })
    } else {
        Err(format!("no severity bands known for '{form_id}'"))
    }
}
