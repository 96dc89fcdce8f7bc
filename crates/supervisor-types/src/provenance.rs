/// The append-only `status_prov` string stored alongside a run, capped at
/// 1024 characters per DB write (`spec.md` §3 invariant 2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance(String);

const MAX_LEN: usize = 1024;

impl Provenance {
    pub fn new(initial: impl Into<String>) -> Self {
        let mut p = Self(String::new());
        p.append(&initial.into());
        p
    }

    /// Appends `entry` to the provenance, joined with `", "` the way the
    /// original Python `run['status_prov'] += f", {x}"` does, then truncates
    /// from the *front* so the most recently observed transition is always
    /// retained when the 1024-character DB column limit is hit.
    pub fn append(&mut self, entry: &str) {
        if self.0.is_empty() {
            self.0.push_str(entry);
        } else {
            self.0.push_str(", ");
            self.0.push_str(entry);
        }

        if self.0.len() > MAX_LEN {
            let drop = self.0.len() - MAX_LEN;
            self.0.drain(0..drop);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_is_monotonic_prefix() {
        let mut p = Provenance::new("New run accepted");
        let snapshot1 = p.as_str().to_string();
        p.append("staging running");
        assert!(p.as_str().starts_with(&snapshot1));
        let snapshot2 = p.as_str().to_string();
        p.append("staging complete");
        assert!(p.as_str().starts_with(&snapshot2));
    }

    #[test]
    fn truncates_from_front_at_cap() {
        let mut p = Provenance::new("x".repeat(1020));
        p.append("tail marker");
        assert!(p.as_str().len() <= MAX_LEN);
        assert!(p.as_str().ends_with("tail marker"));
    }
}
