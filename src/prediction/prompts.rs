use tracing::warn;

use super::answer::{BinaryOutcomePrediction, CategoricalProbabilisticAnswer};

pub const RESEARCH_SYSTEM_PROMPT: &str = "You are a research analyst for prediction markets. \
Summarise the most relevant, recent and verifiable facts bearing on the question. \
Cite base rates where they exist. Do not give a probability.";

pub const PREDICTION_SYSTEM_PROMPT: &str = "You are a calibrated forecaster. \
Answer only with a single JSON object and nothing else.";

pub fn research_prompt(question: &str) -> String {
    format!("Research the following question:\n\n{}", question)
}

pub fn binary_prediction_prompt(question: &str, research: &str) -> String {
    format!(
        "Question: {question}\n\nResearch:\n{research}\n\n\
         Estimate the probability that the question resolves YES. Respond with JSON \
         {{\"p_yes\": <0..1>, \"confidence\": <0..1>, \"reasoning\": \"<short explanation>\"}}."
    )
}

pub fn categorical_prediction_prompt(question: &str, outcomes: &[String], research: &str) -> String {
    let listed = outcomes
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Question: {question}\n\nPossible outcomes: [{listed}]\n\nResearch:\n{research}\n\n\
         Estimate the probability of every outcome. Respond with JSON \
         {{\"probabilities\": {{\"<outcome>\": <0..1>, ...}}, \"confidence\": <0..1>, \
         \"reasoning\": \"<short explanation>\"}} using the outcome names exactly as listed."
    )
}

/// The outermost `{...}` span of a model reply, tolerating code fences and prose.
fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

pub fn parse_binary_prediction(text: &str, include_reasoning: bool) -> Option<BinaryOutcomePrediction> {
    let value = extract_json_object(text)?;
    let mut prediction: BinaryOutcomePrediction = match serde_json::from_value(value) {
        Ok(p) => p,
        Err(e) => {
            warn!("Unusable binary prediction: {}", e);
            return None;
        }
    };
    if !(0.0..=1.0).contains(&prediction.p_yes) {
        warn!("Prediction p_yes out of range: {}", prediction.p_yes);
        return None;
    }
    prediction.confidence = prediction.confidence.clamp(0.0, 1.0);
    if !include_reasoning {
        prediction.reasoning = None;
    }
    Some(prediction)
}

/// Every outcome must be present; probabilities are normalised to sum to one.
pub fn parse_categorical_prediction(
    text: &str,
    outcomes: &[String],
    include_reasoning: bool,
) -> Option<CategoricalProbabilisticAnswer> {
    let value = extract_json_object(text)?;
    let probs = value.get("probabilities")?.as_object()?;

    let mut probabilities = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let p = probs
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(outcome.trim()))
            .and_then(|(_, v)| v.as_f64());
        match p {
            Some(p) if p >= 0.0 => probabilities.push((outcome.clone(), p)),
            _ => {
                warn!("Categorical prediction is missing outcome '{}'", outcome);
                return None;
            }
        }
    }

    let total: f64 = probabilities.iter().map(|(_, p)| p).sum();
    if total <= 0.0 {
        return None;
    }
    for (_, p) in probabilities.iter_mut() {
        *p /= total;
    }

    Some(CategoricalProbabilisticAnswer {
        probabilities,
        confidence: value["confidence"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0),
        reasoning: if include_reasoning {
            value["reasoning"].as_str().map(str::to_string)
        } else {
            None
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn outcomes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parses_fenced_binary_reply() {
        let reply = "```json\n{\"p_yes\": 0.72, \"confidence\": 0.6, \"reasoning\": \"polls\"}\n```";
        let p = parse_binary_prediction(reply, true).unwrap();
        assert_relative_eq!(p.p_yes, 0.72);
        assert_eq!(p.reasoning.as_deref(), Some("polls"));

        let p = parse_binary_prediction(reply, false).unwrap();
        assert!(p.reasoning.is_none());
    }

    #[test]
    fn test_rejects_unusable_binary_replies() {
        assert!(parse_binary_prediction("I cannot say.", true).is_none());
        assert!(parse_binary_prediction("{\"p_yes\": 1.4}", true).is_none());
        assert!(parse_binary_prediction("{\"confidence\": 0.4}", true).is_none());
    }

    #[test]
    fn test_normalises_categorical_reply() {
        let reply = r#"{"probabilities": {"red": 2, "Blue": 1, "green": 1}, "confidence": 0.9}"#;
        let a = parse_categorical_prediction(reply, &outcomes(&["Red", "Blue", "Green"]), true).unwrap();
        assert_eq!(a.probabilities[0].0, "Red");
        assert_relative_eq!(a.probabilities[0].1, 0.5, epsilon = 1e-9);
        assert_relative_eq!(a.probabilities[2].1, 0.25, epsilon = 1e-9);
        assert!(a.reasoning.is_none());
    }

    #[test]
    fn test_categorical_reply_missing_outcome_is_absent() {
        let reply = r#"{"probabilities": {"Red": 0.5, "Blue": 0.5}}"#;
        assert!(parse_categorical_prediction(reply, &outcomes(&["Red", "Blue", "Green"]), true).is_none());
        let reply = r#"{"probabilities": {"Red": 0, "Blue": 0}}"#;
        assert!(parse_categorical_prediction(reply, &outcomes(&["Red", "Blue"]), true).is_none());
    }

    #[test]
    fn test_categorical_prompt_lists_outcomes() {
        let prompt = categorical_prediction_prompt("Who?", &outcomes(&["A", "B"]), "notes");
        assert!(prompt.contains("[\"A\", \"B\"]"));
        assert!(prompt.contains("notes"));
    }
}
