use crate::CredentialRecord;

/// Issues collision-free credential identifiers
///
/// An id is the decimal Unix-millisecond timestamp of its creation. When two
/// ids are requested within the same millisecond (or the clock steps back),
/// the later one gets a `-N` counter suffix. Candidates that collide with an
/// id already in the list are skipped, so ids loaded from an earlier session
/// are never reissued.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_millis: i64,
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an id using the current wall clock
    pub fn generate(&mut self, existing: &[CredentialRecord]) -> String {
        self.generate_at(chrono::Utc::now().timestamp_millis(), existing)
    }

    /// Generate an id as if the current time were `now_millis`
    pub fn generate_at(&mut self, now_millis: i64, existing: &[CredentialRecord]) -> String {
        if now_millis > self.last_millis {
            self.last_millis = now_millis;
            self.counter = 0;
        } else {
            self.counter += 1;
        }

        loop {
            let candidate = if self.counter == 0 {
                self.last_millis.to_string()
            } else {
                format!("{}-{}", self.last_millis, self.counter)
            };

            if !existing.iter().any(|record| record.id == candidate) {
                return candidate;
            }

            tracing::debug!("Credential id {} already taken, bumping counter", candidate);
            self.counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> CredentialRecord {
        CredentialRecord {
            id: id.to_string(),
            email: "a@example.com".to_string(),
            password: "pw".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_plain_timestamp_for_first_id() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.generate_at(1_000, &[]), "1000");
    }

    #[test]
    fn test_same_millisecond_gets_counter_suffix() {
        let mut ids = IdGenerator::new();
        let first = ids.generate_at(1_000, &[]);
        let second = ids.generate_at(1_000, &[]);
        let third = ids.generate_at(1_000, &[]);

        assert_eq!(first, "1000");
        assert_eq!(second, "1000-1");
        assert_eq!(third, "1000-2");
    }

    #[test]
    fn test_counter_resets_when_clock_advances() {
        let mut ids = IdGenerator::new();
        ids.generate_at(1_000, &[]);
        ids.generate_at(1_000, &[]);
        assert_eq!(ids.generate_at(1_001, &[]), "1001");
    }

    #[test]
    fn test_clock_going_backwards_stays_unique() {
        let mut ids = IdGenerator::new();
        let first = ids.generate_at(2_000, &[]);
        let second = ids.generate_at(1_500, &[]);
        assert_ne!(first, second);
        assert_eq!(second, "2000-1");
    }

    #[test]
    fn test_skips_ids_already_in_list() {
        let existing = vec![record("1000"), record("1000-1")];
        let mut ids = IdGenerator::new();
        assert_eq!(ids.generate_at(1_000, &existing), "1000-2");
    }
}
