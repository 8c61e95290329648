//! Turning raw head outputs into bounded probabilities
//!
//! All arithmetic is done in f64. Values a hair outside their valid range are clamped
//! with a warning; anything further out is `ModelOutputInvalid`.

use crate::{FootballError, Result};

/// Temperature-scaled softmax with max subtraction
pub fn softmax(logits: &[f32; 3], temperature: f64) -> Result<[f64; 3]> {
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(FootballError::ModelOutputInvalid(format!(
            "result temperature must be positive, got {}",
            temperature
        )));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(FootballError::ModelOutputInvalid(format!(
            "non-finite result logits {:?}",
            logits
        )));
    }

    let scaled = logits.map(|l| l as f64 / temperature);
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = scaled.map(|s| (s - max).exp());
    let sum: f64 = exp.iter().sum();

    Ok(exp.map(|e| e / sum))
}

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Squash a logit into a probability
pub fn logit_probability(name: &str, logit: f32, temperature: f64, tolerance: f64) -> Result<f64> {
    if !logit.is_finite() {
        return Err(FootballError::ModelOutputInvalid(format!(
            "{} logit is {}",
            name, logit
        )));
    }
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(FootballError::ModelOutputInvalid(format!(
            "{} temperature must be positive, got {}",
            name, temperature
        )));
    }
    bounded_probability(name, sigmoid(logit as f64 / temperature), tolerance)
}

/// Enforce [0, 1], clamping tolerance-level excursions
pub fn bounded_probability(name: &str, p: f64, tolerance: f64) -> Result<f64> {
    if !p.is_finite() {
        return Err(FootballError::ModelOutputInvalid(format!("{} probability is {}", name, p)));
    }
    if (0.0..=1.0).contains(&p) {
        return Ok(p);
    }
    if p >= -tolerance && p <= 1.0 + tolerance {
        let clamped = p.clamp(0.0, 1.0);
        log::warn!("Clamped {} probability {} to {}", name, p, clamped);
        return Ok(clamped);
    }
    Err(FootballError::ModelOutputInvalid(format!(
        "{} probability {} outside [0, 1]",
        name, p
    )))
}

/// Enforce non-negative expected goals, clamping tolerance-level negatives
pub fn expected_goals(name: &str, value: f32, tolerance: f64) -> Result<f64> {
    let v = value as f64;
    if !v.is_finite() {
        return Err(FootballError::ModelOutputInvalid(format!(
            "{} expected goals is {}",
            name, value
        )));
    }
    if v >= 0.0 {
        return Ok(v);
    }
    if v >= -tolerance {
        log::warn!("Clamped {} expected goals {} to 0", name, v);
        return Ok(0.0);
    }
    Err(FootballError::ModelOutputInvalid(format!(
        "{} expected goals {} is negative",
        name, value
    )))
}

/// Check a three-way distribution sums to one
pub fn check_distribution(p: &[f64; 3], tolerance: f64) -> Result<()> {
    let sum: f64 = p.iter().sum();
    if p.iter().any(|v| !(0.0..=1.0).contains(v)) || (sum - 1.0).abs() > tolerance {
        return Err(FootballError::ModelOutputInvalid(format!(
            "result probabilities {:?} sum to {}",
            p, sum
        )));
    }
    Ok(())
}
