//! Arguments reçus et valeurs retournées par une action

use super::ActionFault;
use std::collections::HashMap;

/// Arguments texte d'une action, avec lecture typée
///
/// Une lecture typée qui échoue produit un fault 402 (`Invalid Args`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionArgs {
    values: HashMap<String, String>,
}

impl From<HashMap<String, String>> for ActionArgs {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl ActionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn required_str(&self, name: &str) -> Result<&str, ActionFault> {
        self.get(name)
            .ok_or_else(|| ActionFault::invalid_args(format!("missing argument {}", name)))
    }

    /// Chaîne optionnelle, vide si absente
    pub fn optional_str(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    pub fn required_u32(&self, name: &str) -> Result<u32, ActionFault> {
        let raw = self.required_str(name)?;
        raw.trim()
            .parse()
            .map_err(|_| ActionFault::invalid_args(format!("{}='{}' is not an unsigned integer", name, raw)))
    }

    pub fn required_i64(&self, name: &str) -> Result<i64, ActionFault> {
        let raw = self.required_str(name)?;
        raw.trim()
            .parse()
            .map_err(|_| ActionFault::invalid_args(format!("{}='{}' is not an integer", name, raw)))
    }

    /// Booléen UPnP : `1`/`true`/`yes` ou `0`/`false`/`no`
    pub fn required_bool(&self, name: &str) -> Result<bool, ActionFault> {
        let raw = self.required_str(name)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ActionFault::invalid_args(format!(
                "{}='{}' is not a boolean",
                name, raw
            ))),
        }
    }
}

/// Valeurs retournées par une action, dans l'ordre de déclaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResponse {
    values: Vec<(String, String)>,
}

impl ActionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl ToString) {
        self.values.push((name.into(), value.to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn into_values(self) -> Vec<(String, String)> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let args = ActionArgs::new()
            .with("Id", " 12 ")
            .with("Delta", "-3")
            .with("Value", "true")
            .with("Bad", "x");

        assert_eq!(args.required_u32("Id"), Ok(12));
        assert_eq!(args.required_i64("Delta"), Ok(-3));
        assert_eq!(args.required_bool("Value"), Ok(true));
        assert_eq!(args.optional_str("Missing"), "");
        assert_eq!(args.required_u32("Bad").unwrap_err().code, 402);
        assert_eq!(args.required_u32("Delta").unwrap_err().code, 402);
        assert_eq!(args.required_str("Missing").unwrap_err().code, 402);
    }

    #[test]
    fn test_response_keeps_order() {
        let response = ActionResponse::new().with("Token", 3).with("Array", "AA==");
        assert_eq!(
            response.values(),
            &[
                ("Token".to_string(), "3".to_string()),
                ("Array".to_string(), "AA==".to_string())
            ]
        );
        assert_eq!(response.get("Array"), Some("AA=="));
        assert_eq!(response.get("Nope"), None);
    }
}
