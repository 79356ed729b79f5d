use chrono::Utc;
use std::fmt;
use uuid::Uuid;

const MAX_RUN_ID_LEN: usize = 64;

/// Names one detection run and its output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            &suffix[..8]
        ))
    }

    /// Accepts ids coming back from a request; rejects anything that could leave the output root.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_RUN_ID_LEN
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_parse_back() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert_eq!(RunId::parse(a.as_str()), Some(a.clone()));
        assert_eq!(a.as_str().len(), "20261017T101500-".len() + 8);
    }

    #[test]
    fn rejects_traversal_and_junk() {
        for raw in ["", "..", "../etc", "run/1", "run id", "a.b", &"x".repeat(65)] {
            assert_eq!(RunId::parse(raw), None, "{raw:?} should be rejected");
        }
    }
}
